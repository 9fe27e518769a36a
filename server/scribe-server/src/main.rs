use std::env;

use anyhow::{Context, Result};
use clap::Parser;
use inference_service::{InferenceConfig, InferenceService};
use tracing::{info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use scribe_server::{create_app, ScribeServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let config = ServerConfig::parse();

    init_tracing(config.verbose);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting ScribeCare server");

    let inference = InferenceService::from_config(InferenceConfig::from_env())
        .context("Failed to build inference clients")?;
    let status = inference.status();
    if !status.speech_to_text && !status.template_transcripts {
        warn!("No speech-to-text endpoint configured; uploads will be stored as failed transcripts");
    }
    info!(
        speech_to_text = status.speech_to_text,
        text_generation = status.text_generation,
        translation = status.translation,
        text_to_speech = status.text_to_speech,
        "Inference endpoints"
    );

    let bind_addr = format!("{}:{}", config.host, config.port);
    let upload_dir = config.upload_dir.clone();
    let server = ScribeServer::new(config, inference).await?;
    info!(
        store = server.db.backend_name(),
        upload_dir = %upload_dir.display(),
        mode = ?server.settings.note_generation_mode,
        "Server state ready"
    );

    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!("ScribeCare running on http://{bind_addr}");
    info!("Health check available at: http://{bind_addr}/health");
    info!("API docs available at: http://{bind_addr}/docs");

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    // Human-readable output unless SCRIBE_ENV says otherwise
    let is_development =
        env::var("SCRIBE_ENV").unwrap_or_else(|_| "development".to_string()) == "development";

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "scribe_server={level},inference_service={level},database_layer={level},tower_http=info,sqlx=warn"
        )
        .into()
    });

    if is_development {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .init();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}
