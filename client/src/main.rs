mod network;

use clap::Parser;
use log::info;
use network::SessionEnd;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay address to connect to
    #[arg(short = 's', long, default_value_t = shared::default_server_addr())]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let stream = network::connect(&args.server).await?;
    let stdin = BufReader::new(tokio::io::stdin());

    match network::run_session(stream, stdin, tokio::io::stdout()).await? {
        SessionEnd::ServerClosed => info!("Connection closed by server"),
        SessionEnd::InputClosed => info!("Input closed, disconnecting"),
    }

    Ok(())
}
