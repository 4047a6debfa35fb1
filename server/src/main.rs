use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use server::scheduler::TickScheduler;

/// Parses the command line, then runs the acceptor and the tick loop until
/// one of them stops or Ctrl+C is received.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    info!(
        "Starting arena server on {} ({}ms cycles, fog of war {})",
        config.bind_address(),
        config.tick_ms,
        if config.fog_of_war { "on" } else { "off" }
    );

    let server = Server::bind(config).await?;
    let scheduler = TickScheduler::new(server.context());

    let server_handle = tokio::spawn(server.run());
    let tick_handle = tokio::spawn(scheduler.run());

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Listener failed: {}", e),
                Err(e) => error!("Network task panicked: {}", e),
            }
        }
        result = tick_handle => {
            if let Err(e) = result {
                error!("Tick task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
