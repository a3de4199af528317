//! Minimal flight test: load a module binary, connect, log status events.

use anyhow::Result;
use shadowlet::{BinarySpawner, ChannelEvent, ConnectProfile, ModuleController};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let program = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: test-flight <module-binary>"))?;

    let mut controller = ModuleController::new();

    let _ = controller.on("status", |event: &ChannelEvent| {
        if let Some(body) = event.as_data() {
            tracing::info!(status = %body, "Module status");
        }
    });
    let _ = controller.on("crash", |_: &ChannelEvent| {
        tracing::error!("Module crashed");
    });

    controller.load(&BinarySpawner::new(program))?;

    let profile = ConnectProfile::new("127.0.0.1", 8388, 1080, "aes-256-cfb", "1234");
    controller
        .connect(
            &profile,
            Some(Box::new(|payload| {
                tracing::info!(%payload, "Connect acknowledged");
            })),
        )
        .await?;

    tokio::signal::ctrl_c().await?;
    controller.unload().await;
    Ok(())
}
