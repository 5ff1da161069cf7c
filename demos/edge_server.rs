//! A storefront edge with two stand-in renderers.
//!
//! The gate decides per request which pipeline renders the page; the
//! fallback handler reads that decision and answers as one renderer or the
//! other. Pipeline selections are logged from the event channel.
//!
//! ```sh
//! RUST_ENV=dev RUST_LOG=edge_gate=debug,info cargo run --example edge_server
//! curl -i http://127.0.0.1:3000/dashboard
//! ```

use axum::{extract::Request, http::StatusCode, response::Html, routing::get};
use edge_gate::{Config, FluentRouter, Pipeline, PipelineSelectionEvent, Result, RolloutDecision};
use tokio::sync::mpsc;

async fn render(request: Request) -> std::result::Result<Html<String>, StatusCode> {
    // Excluded paths never get a decision; this demo has no assets to serve.
    let Some(decision) = request.extensions().get::<RolloutDecision>().copied() else {
        return Err(StatusCode::NOT_FOUND);
    };
    let path = request.uri().path();
    Ok(match decision.pipeline {
        Pipeline::New => Html(format!(
            "<main data-pipeline=\"new\"><h1>{path}</h1><p>Rendered by the new pipeline.</p></main>"
        )),
        Pipeline::Legacy => Html(format!(
            "<div class=\"legacy\"><h1>{path}</h1><p>Rendered by the legacy pipeline ({}).</p></div>",
            decision.reason
        )),
    })
}

async fn log_selections(mut events: mpsc::Receiver<PipelineSelectionEvent>) {
    while let Some(event) = events.recv().await {
        tracing::info!(
            path = %event.path,
            route_group = event.route_group.as_deref().unwrap_or("-"),
            pipeline = %event.pipeline,
            reason = %event.reason,
            authenticated = event.authenticated,
            "Pipeline selected"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::default().with_env_overrides();
    config.setup_tracing();

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(log_selections(rx));

    FluentRouter::without_state(config)?
        .with_pipeline_event_channel(tx)
        .route("/api/ping", get(|| async { "pong" }))
        .fallback(render)
        .setup_middleware()
        .await?
        .start()
        .await
}
