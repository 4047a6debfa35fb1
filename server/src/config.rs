use crate::visibility::DEFAULT_VISION_RADIUS;
use crate::world::Position;
use clap::Parser;
use std::time::Duration;

/// Command-line configuration for the arena server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Milliseconds between cycles
    #[arg(short, long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Maximum number of connected players
    #[arg(short, long, default_value_t = 32)]
    pub max_players: usize,

    /// Vision radius used for fog-of-war views
    #[arg(long, default_value_t = DEFAULT_VISION_RADIUS)]
    pub vision_radius: usize,

    /// Column new skeletons are placed on
    #[arg(long, default_value_t = 4)]
    pub spawn_x: i32,

    /// Row new skeletons are placed on
    #[arg(long, default_value_t = 4)]
    pub spawn_y: i32,

    /// Send each player its fog-of-war view instead of the whole map
    #[arg(long)]
    pub fog_of_war: bool,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn spawn_position(&self) -> Position {
        Position::new(self.spawn_x, self.spawn_y)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["server"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.spawn_position(), Position::new(4, 4));
        assert_eq!(config.vision_radius, 4);
        assert_eq!(config.max_players, 32);
        assert!(!config.fog_of_war);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::parse_from([
            "server",
            "--port",
            "0",
            "--tick-ms",
            "50",
            "--spawn-x",
            "6",
            "--fog-of-war",
        ]);
        assert_eq!(config.bind_address(), "127.0.0.1:0");
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.spawn_position(), Position::new(6, 4));
        assert!(config.fog_of_war);
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert!(ServerConfig::try_parse_from(["server", "--tick-ms", "0"]).is_err());
    }
}
