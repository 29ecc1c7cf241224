//! Prints `log/*` notifications, watches bus signals on the `core` channel,
//! and guards the `admin` channel with a token check.

use conduit::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    admin_token: Option<String>,
}

#[export_module("logger-main")]
fn logger() -> PluginModule {
    PluginModule::new().on_init(|ctx: PluginContext| async move {
        let settings: Settings = ctx.get_config()?;

        ctx.listen_for_notifications("log")
            .on("info", |n: &Notification| {
                info!(text = ?n.get("text"), "log/info");
            })
            .on("warn", |n: &Notification| {
                warn!(text = ?n.get("text"), "log/warn");
            });

        ctx.listen_for_all_notifications(|n: &Notification| {
            if n.is_core() {
                warn!(method = %n.method, payload = %n.to_value(), "Bus signal");
            }
        });

        let token = settings.admin_token;
        ctx.add_middleware(move |req: Request| {
            let token = token.clone();
            async move {
                if req.channel != "admin" {
                    return Disposition::pass();
                }
                let presented = req.get("token").and_then(|v| v.as_str());
                match (token.as_deref(), presented) {
                    (Some(expected), Some(given)) if expected == given => Disposition::pass(),
                    _ => Disposition::reject(json!({ "error": "forbidden" })),
                }
            }
        });

        ctx.listen_for_requests("admin")
            .on("plugins", |_req: Request| async { Ok(json!(["greeter", "logger"])) });
        Ok(())
    })
}
