//! Fixed-interval cycle driver.
//!
//! Each tick mints a fresh cycle token, swaps it into the stash while taking
//! the batch collected under the previous token, announces the new token,
//! resolves the batch and finally sends every session the updated map and
//! its own actor status. Sends go through each session's bounded outbound
//! channel without waiting, so a slow peer never holds up the tick. A closed
//! or full channel marks the session for teardown at the end of the tick.

use crate::game::GameContext;
use crate::resolver::{resolve_batch, Outcome};
use log::{debug, info, warn};
use shared::{CycleId, MapRecord, PlayerId, ServerMessage};
use std::collections::HashSet;
use tokio::time::{interval, MissedTickBehavior};

/// Summary of one tick, mostly for logging and tests.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub cycle: CycleId,
    pub outcomes: Vec<Outcome>,
    /// Sessions that received the full set of tick messages.
    pub delivered: usize,
    /// Sessions torn down because a send failed.
    pub dropped: Vec<PlayerId>,
}

pub struct TickScheduler {
    context: GameContext,
}

impl TickScheduler {
    pub fn new(context: GameContext) -> Self {
        Self { context }
    }

    /// Ticks forever at the configured interval.
    pub async fn run(self) {
        let period = self.context.config.tick_interval();
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick fires immediately
        timer.tick().await;
        info!("Tick scheduler started ({}ms per cycle)", period.as_millis());

        loop {
            timer.tick().await;
            let report = self.tick().await;
            debug!(
                "Cycle {}: {} actions, {} sessions updated, {} dropped",
                report.cycle,
                report.outcomes.len(),
                report.delivered,
                report.dropped.len()
            );
        }
    }

    /// Runs a single cycle.
    pub async fn tick(&self) -> TickReport {
        let cycle = CycleId::mint();
        let batch = self.context.stash.rotate(cycle.clone());
        let mut failed = HashSet::new();

        for (player, outbound) in self.context.sessions.outbound_handles() {
            let announce = ServerMessage::CycleGuid {
                cycle_guid: cycle.clone(),
            };
            if outbound.try_send(announce).is_err() {
                failed.insert(player);
            }
        }

        let outcomes = {
            let mut world = self.context.world.write().await;
            resolve_batch(&mut world, &self.context.sessions, &batch)
        };

        let delivered = self.send_results(&mut failed).await;

        let dropped: Vec<PlayerId> = failed.into_iter().collect();
        for player in &dropped {
            warn!("Send to {} failed; tearing down session", player);
            self.context.teardown(player).await;
        }

        TickReport {
            cycle,
            outcomes,
            delivered,
            dropped,
        }
    }

    /// Sends the map and the actor status to every session not already
    /// marked as failed. Messages are built under one read lock so every
    /// session sees the same post-resolution state.
    async fn send_results(&self, failed: &mut HashSet<PlayerId>) -> usize {
        let outgoing = {
            let world = self.context.world.read().await;
            let visibility = self.context.visibility();
            let mut full_map: Option<MapRecord> = None;
            let mut outgoing = Vec::new();

            for (player, outbound) in self.context.sessions.outbound_handles() {
                if failed.contains(&player) {
                    continue;
                }

                let actor = self
                    .context
                    .sessions
                    .actor_of(&player)
                    .and_then(|id| world.skeleton(id));

                let map = match actor {
                    Some(skeleton) if self.context.config.fog_of_war => {
                        visibility.view(&world, skeleton.position())
                    }
                    _ => full_map.get_or_insert_with(|| world.snapshot()).clone(),
                };

                let status = match actor.and_then(|skeleton| world.skeleton_info(skeleton.id)) {
                    Some(skeleton) => ServerMessage::SkeletonInfo { skeleton },
                    None => ServerMessage::EndGame,
                };

                outgoing.push((player, outbound, [ServerMessage::Map { map }, status]));
            }
            outgoing
        };

        let mut delivered = 0;
        for (player, outbound, messages) in outgoing {
            if messages.into_iter().all(|message| outbound.try_send(message).is_ok()) {
                delivered += 1;
            } else {
                failed.insert(player);
            }
        }
        delivered
    }
}
