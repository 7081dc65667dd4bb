//! Demo: a host serving the `backend` object to a renderer in the same process

use std::sync::Arc;

use serde_json::json;
use taqyon_bridge::backend::Backend;
use taqyon_bridge::{transport, BridgeConfig, Host, Renderer, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let config = BridgeConfig::load()?;
    taqyon_bridge::init_tracing(&config)?;

    tracing::info!("Starting Taqyon bridge demo");

    let host = Arc::new(Host::new());
    let backend = host.register(Backend::NAME, Backend::new)?;

    let (host_end, renderer_end) = transport::duplex(config.duplex_buffer);
    let (host_tx, host_rx) = host_end.into_parts();
    let serving = host.clone();
    let server = tokio::spawn(async move { serving.run(host_tx, host_rx).await });

    let (renderer_tx, renderer_rx) = renderer_end.into_parts();
    let renderer = Renderer::connect(renderer_tx, renderer_rx, &config).await?;
    let proxy = renderer.object(Backend::NAME)?;

    tracing::info!("Frontend sees message: {:?}", proxy.property("message"));

    proxy.on_property_changed("count", |value| tracing::info!("count -> {}", value));
    proxy.on_signal("messageChanged", |args| tracing::info!("messageChanged {:?}", args));
    proxy.on_signal("sendToFrontend", |args| tracing::info!("sendToFrontend {:?}", args));

    proxy.call("incrementCount", vec![]).await?;
    proxy.call("sendToBackend", vec![json!("Hello from the frontend")]).await?;
    backend.set_message("Updated by the host")?;

    if let Err(e) = proxy.call("explode", vec![]).await {
        tracing::info!("Rejected call surfaced as {}: {}", e.code(), e);
    }

    tracing::info!(
        "Final count: host {}, frontend {:?}",
        backend.count(),
        proxy.property("count")
    );

    renderer.close().await;
    match server.await {
        Ok(result) => result?,
        Err(e) => tracing::error!("Host task failed: {}", e),
    }

    Ok(())
}
