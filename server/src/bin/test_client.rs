//! Headless arena client.
//!
//! Connects, registers a skeleton as soon as the server assigns a player id,
//! then answers every cycle with one random action. Useful for load testing
//! and for watching a server from the logs.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    ActionKind, ClientMessage, Direction, PlayerAction, PlayerId, ServerMessage, SkeletonInfo,
};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Skeleton name
    #[arg(short, long, default_value = "bot")]
    name: String,

    #[arg(long, default_value_t = 10)]
    hit_points: i32,

    #[arg(long, default_value_t = 2)]
    attack_power: i32,

    /// Chance of sending nothing recognizable and defending right instead
    #[arg(long, default_value_t = 0.2)]
    idle_chance: f64,
}

/// Picks the action for one cycle. An idle cycle falls back to Defense Right.
fn choose_action(rng: &mut impl Rng, idle_chance: f64) -> (ActionKind, Direction) {
    if rng.gen_bool(idle_chance.clamp(0.0, 1.0)) {
        return (ActionKind::Defense, Direction::Right);
    }

    let kinds = [ActionKind::Move, ActionKind::Attack, ActionKind::Defense];
    let kind = kinds.choose(rng).copied().unwrap_or(ActionKind::Defense);
    let direction = Direction::ALL.choose(rng).copied().unwrap_or(Direction::Right);
    (kind, direction)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    info!("Connected to {}", args.url);
    let (mut write, mut read) = ws_stream.split();

    let mut rng = rand::thread_rng();
    let mut player: Option<PlayerId> = None;
    let mut registered = false;

    while let Some(frame) = read.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let message = match ServerMessage::decode(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Undecodable server message: {}", e);
                continue;
            }
        };

        match message {
            ServerMessage::PlayerInfo { player_guid } => {
                info!("Assigned player id {}", player_guid);
                let register = ClientMessage::SkeletonInfo {
                    player_guid: player_guid.clone(),
                    skeleton: SkeletonInfo::new(&args.name, args.hit_points, args.attack_power),
                };
                write.send(Message::Text(register.encode()?)).await?;
                player = Some(player_guid);
            }
            ServerMessage::CycleGuid { cycle_guid } => {
                let Some(player) = player.clone() else {
                    continue;
                };
                let (kind, direction) = choose_action(&mut rng, args.idle_chance);
                let action = PlayerAction::new(player, cycle_guid, kind, direction);
                write
                    .send(Message::Text(ClientMessage::cycle_action(&action)?.encode()?))
                    .await?;
            }
            ServerMessage::Map { .. } => {}
            ServerMessage::SkeletonInfo { skeleton } => {
                registered = true;
                info!(
                    "{} at ({}, {}) hp {} stance {:?} {:?}",
                    skeleton.name,
                    skeleton.xcoord,
                    skeleton.ycoord,
                    skeleton.hit_points,
                    skeleton.fight_stance.kind,
                    skeleton.fight_stance.direction
                );
            }
            ServerMessage::EndGame => {
                // Sent until the registration lands too.
                if registered {
                    info!("Skeleton eliminated, leaving");
                    break;
                }
            }
        }
    }

    let _ = write.close().await;
    Ok(())
}
