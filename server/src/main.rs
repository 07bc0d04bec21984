use clap::Parser;
use log::info;
use server::config::RelayConfig;
use server::network::Server;
use std::time::Duration;

// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, env = "CHAT_RELAY_HOST", default_value = shared::DEFAULT_HOST)]
    host: String,

    /// TCP port to listen on
    #[arg(short, long, env = "CHAT_RELAY_PORT", default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Hide peer addresses in log output
    #[arg(long, env = "CHAT_RELAY_SAFE_MODE")]
    safe_mode: bool,

    /// Minimum seconds between two messages from the same client
    #[arg(short = 'r', long, env = "CHAT_RELAY_MESSAGE_RATE", default_value_t = 1.0)]
    message_rate: f64,

    /// Seconds a banned IP stays banned
    #[arg(short, long, env = "CHAT_RELAY_BAN_DURATION", default_value_t = 600)]
    ban_duration: u64,

    /// Throttled messages in a row before a ban
    #[arg(short, long, env = "CHAT_RELAY_STRIKE_LIMIT", default_value_t = shared::DEFAULT_STRIKE_LIMIT)]
    strike_limit: u32,

    /// Outbound queue size per client, in chunks
    #[arg(long, env = "CHAT_RELAY_OUTBOUND_CAPACITY", default_value_t = 64)]
    outbound_capacity: usize,

    /// Keep clients registered when writes to them fail
    #[arg(long, env = "CHAT_RELAY_KEEP_FAILED_RECIPIENTS")]
    keep_failed_recipients: bool,
}

impl Args {
    fn into_config(self) -> Result<RelayConfig, Box<dyn std::error::Error>> {
        let message_rate = Duration::try_from_secs_f64(self.message_rate)
            .map_err(|e| format!("invalid message rate {}: {}", self.message_rate, e))?;

        Ok(RelayConfig {
            host: self.host,
            port: self.port,
            safe_mode: self.safe_mode,
            message_rate,
            ban_duration: Duration::from_secs(self.ban_duration),
            strike_limit: self.strike_limit,
            outbound_capacity: self.outbound_capacity,
            evict_on_write_failure: !self.keep_failed_recipients,
            ..RelayConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    info!(
        "Starting chat relay (rate {:?}, {} strikes, ban {:?}, safe mode {})",
        config.message_rate, config.strike_limit, config.ban_duration, config.safe_mode
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
