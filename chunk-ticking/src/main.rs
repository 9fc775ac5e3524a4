//! # Chunk Ticking
//!
//! Runs deduplicated chunk ticking over an in-memory world at a fixed tick
//! rate until interrupted.
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    missing_docs,
    clippy::unwrap_used
)]
#![allow(
    clippy::single_call_fn,
    clippy::multiple_inherent_impl,
    clippy::shadow_unrelated,
    clippy::missing_errors_doc,
    clippy::struct_excessive_bools,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata
)]

use std::path::Path;

use anyhow::Context;
use chunk_ticking_core::TickingConfig;
use tokio::{signal, spawn};
use tokio_util::sync::CancellationToken;

use crate::host::Host;

mod host;
mod logger;
mod sandbox;

/// Where the config is read from, relative to the working directory.
const CONFIG_PATH: &str = "config/chunk_ticking.json5";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init().context("failed to install logger")?;

    let config = TickingConfig::load_or_create(Path::new(CONFIG_PATH))
        .context("failed to load chunk ticking config")?;
    log::info!(
        "Simulation distance {} ({} override(s)), {} ticks/s",
        config.default_range(),
        config.dimensions.len(),
        config.tick_rate
    );

    let cancel_token = CancellationToken::new();
    spawn({
        let cancel_token = cancel_token.clone();
        async move {
            if let Err(e) = signal::ctrl_c().await {
                log::error!("Failed to listen for ctrl-c: {e}");
                return;
            }
            log::info!("Shutting down");
            cancel_token.cancel();
        }
    });

    Host::new(&config)?.run(cancel_token).await;
    Ok(())
}
