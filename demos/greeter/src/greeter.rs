//! Answers `greeter/hello` and `greeter/count`, and announces every greeting
//! on `log/info`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use conduit::prelude::*;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Settings {
    greeting: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            greeting: "Hi".to_string(),
        }
    }
}

#[export_module("greeter")]
fn greeter() -> PluginModule {
    PluginModule::new()
        .on_init(|ctx: PluginContext| async move {
            let settings: Settings = ctx.get_config()?;
            let greeting: Arc<str> = Arc::from(settings.greeting);
            let served = Arc::new(AtomicU64::new(0));

            let hello = {
                let ctx = ctx.clone();
                let served = Arc::clone(&served);
                move |req: Request| {
                    let ctx = ctx.clone();
                    let greeting = Arc::clone(&greeting);
                    served.fetch_add(1, Ordering::Relaxed);
                    async move {
                        let name = req.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
                            RequestError::rejected(json!({ "error": "name is required" }))
                        })?;
                        let text = format!("{greeting}, {name}!");
                        ctx.notify(
                            Notification::new("log", "info").with("text", text.clone()),
                        );
                        Ok(json!(text))
                    }
                }
            };
            let count = move |_req: Request| {
                let served = served.load(Ordering::Relaxed);
                async move { Ok(json!(served)) }
            };

            ctx.listen_for_requests("greeter")
                .on("hello", hello)
                .on("count", count);
            Ok(())
        })
        .on_close(|| async {
            tracing::info!("greeter closed");
            Ok(())
        })
}
