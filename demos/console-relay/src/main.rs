//! Console relay: joins the `drive` channel, prints every message, and
//! publishes each line typed on stdin.
//!
//! Connects to the default Voltr endpoint unless an address is given
//! as the first argument.

use tokio::io::{AsyncBufReadExt, BufReader};
use voltr::{ConnectConfig, Connection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(addr) => ConnectConfig::with_addr(addr),
        None => ConnectConfig::default(),
    };

    eprintln!("connecting to {}", config.addr);
    let conn = Connection::open(config).await?;
    if let Some(cid) = conn.client_id() {
        eprintln!("connected as {cid}");
    }

    let drive = conn.channel("drive").await?;
    drive.subscribe().await?;
    drive
        .on_message(|msg| {
            let text = String::from_utf8_lossy(&msg.payload);
            println!("Received message from {}: {}", msg.sender, text);
        })
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        if !conn.is_active() {
            tracing::warn!("session lost, exiting");
            break;
        }
        drive.publish(line).await?;
    }

    conn.close().await?;
    Ok(())
}
