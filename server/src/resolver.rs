//! Deterministic combat and movement resolution.
//!
//! A drained batch is applied strictly in arrival order, each action against
//! the state left behind by the ones before it. There is no reordering by
//! player, action kind or priority.
//!
//! Stance transitions:
//! - Move: `{Battle, dir}`, then step one cell if the target is passable.
//! - Attack: `{Battle, dir}`, then strike the first skeleton on the adjacent
//!   cell. A defender in `{Defense, opposite(dir)}` parries and is pushed one
//!   cell along `dir` instead of taking damage.
//! - Defense: `{Defense, dir}`, no movement.
//!
//! An action aimed outside the world fails before anything is changed,
//! stance included.
//!
//! A defender whose hit points drop below 1 is removed from the world and
//! from the actor registry before the next action is looked at.

use crate::sessions::SessionRegistry;
use crate::world::{Position, World, WorldError};
use log::{debug, info, warn};
use shared::{ActionKind, Direction, EntityId, PlayerAction, PlayerId, Stance};

/// Result of applying a single action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The player owns no live actor.
    NoActor,
    Moved { from: Position, to: Position },
    /// Move toward an impassable cell; only the stance changed.
    Blocked,
    /// Attack into a cell with no skeleton.
    Missed,
    Parried {
        defender: EntityId,
        pushed_to: Option<Position>,
    },
    Hit {
        defender: EntityId,
        remaining: i32,
    },
    Eliminated {
        defender: EntityId,
        owner: PlayerId,
    },
    Defending,
}

/// Applies a batch in order. An action that fails with a world error is
/// logged and skipped; the rest of the batch still runs.
pub fn resolve_batch(
    world: &mut World,
    sessions: &SessionRegistry,
    batch: &[PlayerAction],
) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(batch.len());

    for action in batch {
        match resolve_action(world, sessions, action) {
            Ok(outcome) => {
                debug!(
                    "{} {:?} {:?}: {:?}",
                    action.player_guid, action.player_action_type, action.direction, outcome
                );
                outcomes.push(outcome);
            }
            Err(e) => {
                warn!(
                    "Skipping {:?} from {}: {}",
                    action.player_action_type, action.player_guid, e
                );
            }
        }
    }

    outcomes
}

/// Applies one action to the current world state.
pub fn resolve_action(
    world: &mut World,
    sessions: &SessionRegistry,
    action: &PlayerAction,
) -> Result<Outcome, WorldError> {
    let Some(actor) = sessions
        .actor_of(&action.player_guid)
        .filter(|id| world.skeleton(*id).is_some())
    else {
        return Ok(Outcome::NoActor);
    };

    match action.player_action_type {
        ActionKind::Move => apply_move(world, actor, action.direction),
        ActionKind::Attack => apply_attack(world, sessions, actor, action.direction),
        ActionKind::Defense => {
            set_stance(world, actor, Stance::defense(action.direction));
            Ok(Outcome::Defending)
        }
    }
}

fn set_stance(world: &mut World, actor: EntityId, stance: Stance) {
    if let Some(skeleton) = world.skeleton_mut(actor) {
        skeleton.stance = stance;
    }
}

fn apply_move(world: &mut World, actor: EntityId, direction: Direction) -> Result<Outcome, WorldError> {
    let from = world
        .position_of(actor)
        .ok_or(WorldError::UnknownEntity(actor))?;
    let to = from.step(direction);
    world.block(to)?;

    set_stance(world, actor, Stance::battle(direction));
    if world.relocate(actor, to)? {
        Ok(Outcome::Moved { from, to })
    } else {
        Ok(Outcome::Blocked)
    }
}

fn apply_attack(
    world: &mut World,
    sessions: &SessionRegistry,
    attacker: EntityId,
    direction: Direction,
) -> Result<Outcome, WorldError> {
    let origin = world
        .position_of(attacker)
        .ok_or(WorldError::UnknownEntity(attacker))?;
    let target = origin.step(direction);
    let defender = world.block(target)?.first_skeleton();

    set_stance(world, attacker, Stance::battle(direction));
    let Some(defender) = defender else {
        return Ok(Outcome::Missed);
    };

    // Negative power never heals.
    let attack_power = world
        .skeleton(attacker)
        .map(|skeleton| skeleton.attack_power.max(0))
        .unwrap_or_default();

    let Some(defending) = world.skeleton_mut(defender) else {
        return Ok(Outcome::Missed);
    };

    if defending.stance.parries(direction) {
        let push = target.step(direction);
        let pushed_to = world.relocate(defender, push)?.then_some(push);
        return Ok(Outcome::Parried {
            defender,
            pushed_to,
        });
    }

    defending.hit_points = defending.hit_points.saturating_sub(attack_power);
    if defending.is_alive() {
        return Ok(Outcome::Hit {
            defender,
            remaining: defending.hit_points,
        });
    }

    let owner = defending.owner.clone();
    world.remove_skeleton(defender);
    sessions.release_actor(&owner);
    info!("Skeleton {} of player {} eliminated", defender, owner);

    Ok(Outcome::Eliminated { defender, owner })
}
