//! Shared game context and the player lifecycle.
//!
//! [`GameContext`] bundles the world, the action stash, the session registry
//! and the configuration. It is built once at startup and cloned into every
//! task that needs it; nothing in the server reaches these through globals.
//!
//! Whenever both the world and the registry change together (actor
//! registration, teardown, resolution) the world write lock is taken first
//! and held for the whole step, so readers never observe one without the
//! other.

use crate::config::ServerConfig;
use crate::sessions::{Outbound, SessionRegistry};
use crate::stash::{ActionStash, Submission};
use crate::visibility::Visibility;
use crate::world::{Skeleton, World, WorldError};
use log::{debug, info, warn};
use shared::{ClientMessage, EntityId, PlayerId, ServerMessage, SkeletonInfo};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("player {0} is not connected")]
    NotConnected(PlayerId),
    #[error("player {0} already owns a skeleton")]
    AlreadyRegistered(PlayerId),
    #[error("skeleton would start with {0} hit points")]
    DeadOnArrival(i32),
    #[error("attack power {0} is negative")]
    NegativeAttackPower(i32),
    #[error("cannot place skeleton: {0}")]
    Placement(#[from] WorldError),
}

#[derive(Debug, Clone)]
pub struct GameContext {
    pub world: Arc<RwLock<World>>,
    pub stash: Arc<ActionStash>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<ServerConfig>,
}

impl GameContext {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_world(config, World::arena())
    }

    /// Builds a context around a prepared world.
    pub fn with_world(config: ServerConfig, world: World) -> Self {
        Self {
            world: Arc::new(RwLock::new(world)),
            stash: Arc::new(ActionStash::new()),
            sessions: Arc::new(SessionRegistry::new(config.max_players)),
            config: Arc::new(config),
        }
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::new(self.config.vision_radius)
    }

    /// Admits a new player.
    ///
    /// PlayerInfo is queued on `outbound` before the session becomes visible
    /// to the tick loop, so it is always the first message the client sees.
    /// Returns `None` when the server is full.
    pub fn connect(&self, outbound: Outbound) -> Option<PlayerId> {
        let player = PlayerId::generate();

        if outbound
            .try_send(ServerMessage::PlayerInfo {
                player_guid: player.clone(),
            })
            .is_err()
        {
            return None;
        }

        if !self.sessions.add(player.clone(), outbound) {
            warn!("Rejecting player {}: server full", player);
            return None;
        }

        Some(player)
    }

    /// Places the player's skeleton on the spawn cell and binds it.
    pub async fn register_skeleton(
        &self,
        player: &PlayerId,
        info: SkeletonInfo,
    ) -> Result<EntityId, RegistrationError> {
        if info.hit_points < 1 {
            return Err(RegistrationError::DeadOnArrival(info.hit_points));
        }
        if info.attack_power < 0 {
            return Err(RegistrationError::NegativeAttackPower(info.attack_power));
        }

        let mut world = self.world.write().await;

        if !self.sessions.contains(player) {
            return Err(RegistrationError::NotConnected(player.clone()));
        }
        if self.sessions.actor_of(player).is_some() {
            return Err(RegistrationError::AlreadyRegistered(player.clone()));
        }

        let spawn = self.config.spawn_position();
        let skeleton = Skeleton::from_info(player.clone(), info);
        let name = skeleton.name.clone();
        let id = world.spawn_skeleton(skeleton, spawn)?;

        if !self.sessions.bind_actor(player, id) {
            world.remove_skeleton(id);
            return Err(RegistrationError::AlreadyRegistered(player.clone()));
        }

        info!(
            "Skeleton {} ({}) of player {} placed at ({}, {})",
            id, name, player, spawn.x, spawn.y
        );
        Ok(id)
    }

    /// Removes the player's session and, if it still has one, its skeleton.
    /// Safe to call more than once.
    pub async fn teardown(&self, player: &PlayerId) {
        let mut world = self.world.write().await;
        if let Some(actor) = self.sessions.remove(player) {
            if world.remove_skeleton(actor).is_some() {
                info!("Removed skeleton {} of player {}", actor, player);
            }
        }
    }

    /// Decodes and dispatches one text frame from `player`.
    ///
    /// Decode failures and rejected registrations are logged against that
    /// player only.
    pub async fn handle_client_text(&self, player: &PlayerId, text: &str) {
        let message = match ClientMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Undecodable message from {}: {}", player, e);
                return;
            }
        };

        match message {
            ClientMessage::CycleAction { player_action } => {
                match self.stash.submit(&player_action) {
                    Ok(Submission::Accepted) => debug!("Action from {} stashed", player),
                    Ok(Submission::Stale) => {}
                    Err(e) => warn!("Undecodable action from {}: {}", player, e),
                }
            }
            ClientMessage::SkeletonInfo {
                player_guid,
                skeleton,
            } => {
                if &player_guid != player {
                    warn!(
                        "Player {} sent skeleton info for {}; binding to the sender",
                        player, player_guid
                    );
                }
                if let Err(e) = self.register_skeleton(player, skeleton).await {
                    warn!("Skeleton registration for {} rejected: {}", player, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::outbound_channel;
    use crate::world::Position;
    use shared::{ActionKind, CycleId, Direction, PlayerAction};

    fn context() -> GameContext {
        GameContext::new(ServerConfig::default())
    }

    #[tokio::test]
    async fn test_connect_sends_player_info_first() {
        let ctx = context();
        let (tx, mut rx) = outbound_channel();

        let player = ctx.connect(tx).unwrap();

        assert!(ctx.sessions.contains(&player));
        match rx.recv().await.unwrap() {
            ServerMessage::PlayerInfo { player_guid } => assert_eq!(player_guid, player),
            other => panic!("Unexpected first message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_when_full() {
        let config = ServerConfig {
            max_players: 1,
            ..ServerConfig::default()
        };
        let ctx = GameContext::new(config);
        let (tx, _rx) = outbound_channel();

        assert!(ctx.connect(tx.clone()).is_some());
        assert!(ctx.connect(tx).is_none());
        assert_eq!(ctx.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_register_places_on_spawn() {
        let ctx = context();
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();

        let id = ctx
            .register_skeleton(&player, SkeletonInfo::new("bones", 10, 3))
            .await
            .unwrap();

        let world = ctx.world.read().await;
        assert_eq!(world.position_of(id), Some(Position::new(4, 4)));
        assert_eq!(world.skeleton(id).unwrap().owner, player);
        assert_eq!(ctx.sessions.actor_of(&player), Some(id));
    }

    #[tokio::test]
    async fn test_register_twice_rejected() {
        let ctx = context();
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();

        ctx.register_skeleton(&player, SkeletonInfo::new("a", 10, 3))
            .await
            .unwrap();
        let second = ctx
            .register_skeleton(&player, SkeletonInfo::new("b", 10, 3))
            .await;

        assert_eq!(second, Err(RegistrationError::AlreadyRegistered(player)));
        assert_eq!(ctx.world.read().await.skeleton_count(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_dead_and_unknown() {
        let ctx = context();
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();

        assert_eq!(
            ctx.register_skeleton(&player, SkeletonInfo::new("a", 0, 3)).await,
            Err(RegistrationError::DeadOnArrival(0))
        );

        let stranger = PlayerId::from("stranger");
        assert_eq!(
            ctx.register_skeleton(&stranger, SkeletonInfo::new("a", 10, 3)).await,
            Err(RegistrationError::NotConnected(stranger))
        );
    }

    #[tokio::test]
    async fn test_register_rejects_negative_attack_power() {
        let ctx = context();
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();

        for attack_power in [-1, i32::MIN] {
            assert_eq!(
                ctx.register_skeleton(&player, SkeletonInfo::new("a", 10, attack_power)).await,
                Err(RegistrationError::NegativeAttackPower(attack_power))
            );
        }
        assert_eq!(ctx.sessions.actor_of(&player), None);
        assert_eq!(ctx.world.read().await.skeleton_count(), 0);

        assert!(ctx
            .register_skeleton(&player, SkeletonInfo::new("a", 10, 0))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_register_on_blocked_spawn() {
        let config = ServerConfig {
            spawn_x: 0,
            spawn_y: 0,
            ..ServerConfig::default()
        };
        let ctx = GameContext::new(config);
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();

        let result = ctx
            .register_skeleton(&player, SkeletonInfo::new("a", 10, 3))
            .await;

        assert_eq!(
            result,
            Err(RegistrationError::Placement(WorldError::Impassable { x: 0, y: 0 }))
        );
        assert_eq!(ctx.sessions.actor_of(&player), None);
    }

    #[tokio::test]
    async fn test_teardown_removes_actor_and_session() {
        let ctx = context();
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();
        let id = ctx
            .register_skeleton(&player, SkeletonInfo::new("a", 10, 3))
            .await
            .unwrap();

        ctx.teardown(&player).await;
        ctx.teardown(&player).await;

        let world = ctx.world.read().await;
        assert!(world.skeleton(id).is_none());
        assert!(world.block(Position::new(4, 4)).unwrap().entities().is_empty());
        assert!(!ctx.sessions.contains(&player));
    }

    #[tokio::test]
    async fn test_handle_skeleton_info_binds_to_sender() {
        let ctx = context();
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();

        let text = ClientMessage::SkeletonInfo {
            player_guid: PlayerId::from("someone-else"),
            skeleton: SkeletonInfo::new("a", 10, 3),
        }
        .encode()
        .unwrap();
        ctx.handle_client_text(&player, &text).await;

        assert!(ctx.sessions.actor_of(&player).is_some());
        assert_eq!(ctx.sessions.actor_of(&PlayerId::from("someone-else")), None);
    }

    #[tokio::test]
    async fn test_handle_cycle_action_reaches_stash() {
        let ctx = context();
        let (tx, _rx) = outbound_channel();
        let player = ctx.connect(tx).unwrap();
        let cycle = CycleId::mint();
        ctx.stash.open_cycle(cycle.clone());

        let action = PlayerAction::new(player.clone(), cycle, ActionKind::Defense, Direction::Right);
        let text = ClientMessage::cycle_action(&action).unwrap().encode().unwrap();
        ctx.handle_client_text(&player, &text).await;
        ctx.handle_client_text(&player, "garbage").await;

        assert_eq!(ctx.stash.drain_all(), vec![action]);
    }
}
