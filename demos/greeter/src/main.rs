//! Greeter Example
//!
//! A Conduit host with two plugins linked into the binary:
//!
//! - `greeter` answers `greeter/hello` and counts greetings
//! - `logger` prints `log/*` notifications and guards the `admin` channel
//!
//! Each plugin directory under `plugins/` holds a `plugin.json` whose `entry`
//! names a module exported with `#[export_module]`.
//!
//! # Usage
//!
//! ```bash
//! cd demos/greeter
//! cargo run --package greeter -- --once
//! ```

mod greeter;
mod logger;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use conduit::prelude::*;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(about = "Conduit greeter example")]
struct Args {
    /// Configuration file (defaults to conduit.toml in the current directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// Send a few requests, then exit instead of waiting for Ctrl+C.
    #[arg(long)]
    once: bool,
}

async fn exercise(bus: &EventBus) {
    for name in ["Ada", "Grace"] {
        match bus.request(Request::new("greeter", "hello").with("name", name)).await {
            Ok(reply) => info!(%reply, "greeter/hello"),
            Err(e) => warn!(error = %e, "greeter/hello failed"),
        }
    }

    if let Ok(count) = bus.request(Request::new("greeter", "count")).await {
        info!(%count, "greeter/count");
    }

    if let Err(e) = bus.request(Request::new("admin", "plugins")).await {
        info!(error = %e, "admin/plugins without a token");
    }

    bus.notify(Notification::new("log", "debug").with("text", "nobody listens here"));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = Conduit::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let host = builder.build().await?;

    info!(plugins = ?host.plugins().names(), "Host ready");
    exercise(host.bus()).await;

    let summary = if args.once {
        host.shutdown().await
    } else {
        host.run().await?
    };
    if !summary.is_clean() {
        warn!(failed = ?summary.failed, "Some plugins failed to close");
    }

    Ok(())
}
