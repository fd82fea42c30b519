//! Malinger
//!
//! Forwards every request to one remote host and releases the response no
//! earlier than a configured delay after the request arrived.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                   MALINGER                    │
//!                    │                                               │
//!   Client Request   │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!   ─────────────────┼─▶│   net   │──▶│  http   │──▶│   relay    │──┼──▶ Remote
//!                    │  │listener │   │ server  │   │  upstream  │  │    Host
//!                    │  └─────────┘   └─────────┘   └─────┬──────┘  │
//!                    │                                     │ buffer  │
//!                    │                                     ▼         │
//!   Client Response  │  ┌─────────┐                ┌────────────┐   │
//!   ◀────────────────┼──│response │◀───────────────│   delay    │◀──┼─── Response
//!                    │  └─────────┘  at start+delay└────────────┘   │
//!                    │                                               │
//!                    │  config · observability · lifecycle           │
//!                    └──────────────────────────────────────────────┘
//! ```

use clap::Parser;

use malinger::config::CliArgs;
use malinger::lifecycle::startup;
use malinger::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match CliArgs::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("malinger: {e}");
            std::process::exit(2);
        }
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "malinger starting");

    startup::run(config).await?;
    Ok(())
}
