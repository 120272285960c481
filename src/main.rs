//! Krishi Mitra web server

use krishi_mitra::app;
use krishi_mitra::config::AppConfig;
use krishi_mitra::core::assistant::OpenRouterAssistant;
use krishi_mitra::core::mailer::SmtpMailer;
use krishi_mitra::core::speech::GoogleSpeechSynthesizer;
use krishi_mitra::infrastructure::database::DatabaseConnection;

use anyhow::anyhow;
use di::Injectable;
use log::info;
use tokio::runtime::{Builder, Runtime};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    config.ensure_directories()?;

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task(config))
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
    let mut services = app::services(config.clone());
    services
        .add(OpenRouterAssistant::singleton())
        .add(GoogleSpeechSynthesizer::singleton())
        .add(SmtpMailer::singleton());
    let provider = services
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))?;

    provider
        .get_required::<DatabaseConnection>()
        .migrate()
        .await?;

    if config.assistant.api_key.is_none() {
        info!("OPENROUTER_API_KEY is not set, replies will be canned notices");
    }

    let app = app::router(provider, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");
    Ok(())
}
