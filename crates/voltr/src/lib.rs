//! Async client for the Voltr publish/subscribe protocol.
//!
//! A [`Connection`] is one TCP session with a Voltr server. It hands
//! out [`Channel`]s, which can be subscribed, published to, and
//! observed through callbacks. All per-connection state lives in a
//! single task owning the socket; handles talk to it over a command
//! channel, so everything here is `Clone + Send` and safe to share.
//!
//! ```no_run
//! use voltr::{ConnectConfig, Connection};
//!
//! # async fn run() -> Result<(), voltr::VoltrError> {
//! let conn = Connection::open(ConnectConfig::with_addr("127.0.0.1:8004")).await?;
//! let drive = conn.channel("drive").await?;
//! drive.subscribe().await?;
//! drive.on_message(|msg| println!("{}: {:?}", msg.sender, msg.payload)).await?;
//! drive.publish("left 2").await?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod config;
mod connection;
mod error;
mod events;
mod router;

pub use channel::{Channel, ChannelId, ChannelState, ChannelStatus};
pub use config::{ConnectConfig, DEFAULT_ADDR};
pub use connection::{Connection, ConnectionStatus};
pub use error::VoltrError;
pub use events::{ChannelMessage, DirectMessage, PeerEvent};
