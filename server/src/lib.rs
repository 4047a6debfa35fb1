//! # Arena Server Library
//!
//! This library provides the authoritative server for the skeleton arena. It
//! owns the canonical world, collects the actions clients submit for each
//! cycle, resolves them deterministically and broadcasts the outcome to every
//! connected client.
//!
//! ## Core Responsibilities
//!
//! ### Cycle-Driven Simulation
//! Time advances in discrete cycles. A timer mints a fresh cycle token at a
//! fixed interval; clients answer with at most one action tagged with that
//! token, and the next tick applies everything collected under it. Actions
//! tagged with any other token are dropped on arrival.
//!
//! ### Deterministic Resolution
//! A cycle's batch is applied in arrival order, each action against the state
//! left behind by the previous ones. Movement, attacks, parries and
//! eliminations all happen inside that single pass.
//!
//! ### State Broadcasting
//! After resolution every session receives the map (or its own fog-of-war
//! window) followed by its actor's status, or an end-of-game notice once the
//! actor is gone.
//!
//! ## Architecture Design
//!
//! ### Explicit Shared State
//! The world, the action stash and the session registry are built once and
//! handed around inside a cloneable [`game::GameContext`]. Each of them is
//! internally synchronized; the world sits behind an async read-write lock
//! held for a whole resolution or broadcast step.
//!
//! ### Isolated Sessions
//! Each connection has a reader task and a writer task joined by a bounded
//! channel. The tick loop only pushes into that channel without waiting, so
//! a slow or dead peer cannot stall anyone else. A closed or full channel or
//! a failed socket tears down exactly that session.
//!
//! ## Module Organization
//!
//! - `config`: command-line configuration
//! - `game`: shared context, connect/register/teardown lifecycle
//! - `network`: WebSocket acceptor and per-session tasks
//! - `resolver`: movement and combat rules
//! - `scheduler`: the fixed-interval tick loop
//! - `sessions`: connected players and the actors they own
//! - `stash`: the per-cycle action buffer
//! - `visibility`: fog-of-war windows
//! - `world`: the grid, its blocks and the skeleton arena
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::scheduler::TickScheduler;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::parse_from(["server", "--port", "8080", "--tick-ms", "500"]);
//!     let server = Server::bind(config).await?;
//!
//!     tokio::spawn(TickScheduler::new(server.context()).run());
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod network;
pub mod resolver;
pub mod scheduler;
pub mod sessions;
pub mod stash;
pub mod visibility;
pub mod world;
