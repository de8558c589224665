//! Connection-serving core of a small RPC transport.
//!
//! A connection opens with a JSON [`ConnOptions`](handshake::ConnOptions)
//! line naming a codec; from then on both sides exchange header+body pairs
//! through that [`Codec`]. The [`Server`] reads requests in one loop per
//! connection and answers each from its own task.
//!
//! # Examples
//!
//! ```no_run
//! use ripple_rpc::{Server, service_fn};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let add = service_fn(|_method: String, (a, b): (i64, i64)| async move { Ok(a + b) });
//!     let listener = TcpListener::bind("127.0.0.1:9999").await?;
//!     Server::new(add).accept(listener).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod handshake;
pub mod header;
pub mod io;
pub mod server;
pub mod service;

pub use client::Client;
pub use codec::Codec;
pub use error::{Error, Result};
pub use header::Header;
pub use io::{BoxIo, Io};
pub use server::Server;
pub use service::{Service, service_fn};
