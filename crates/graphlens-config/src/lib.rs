//! # graphlens configuration
//!
//! Type-safe configuration for graph connectors: which query engine a
//! connection speaks, how identifiers are rendered, and the tuning knobs of
//! the request cache, batch runner, blank-node registry and schema discovery.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graphlens_config::{init_logging, ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("connection.toml").await?;
//!     init_logging(&config.logging)?;
//!     println!("engine: {}", config.query_engine);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connection;
mod error;
mod loader;
mod logging;

pub use connection::*;
pub use error::*;
pub use loader::*;
pub use logging::*;
