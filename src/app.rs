//! Service registration and router assembly shared by `main` and the tests.

use crate::api;
use crate::config::AppConfig;
use crate::core::orchestrator::ChatOrchestrator;
use crate::core::services::{DbAccountService, DbWebSessionService};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::repositories::{
    DbAccountRepository, DbChatRepository, DbWebSessionRepository,
};
use axum::Router;
use di::{Injectable, Ref, ServiceCollection, ServiceProvider, singleton_as_self};
use di_axum::RouterServiceProviderExtensions;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

/// Registers everything except the external collaborators
/// (`ReplyGenerator`, `SpeechSynthesizer`, `Mailer`), which the caller adds.
pub fn services(config: AppConfig) -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services
        .add(singleton_as_self::<AppConfig>().from(move |_| Ref::new(config.clone())))
        .add(DatabaseConnection::singleton())
        .add(DbAccountRepository::scoped())
        .add(DbChatRepository::scoped())
        .add(DbWebSessionRepository::scoped())
        .add(DbAccountService::scoped())
        .add(DbWebSessionService::scoped())
        .add(ChatOrchestrator::scoped());
    services
}

pub fn router(provider: ServiceProvider, config: &AppConfig) -> Router {
    Router::new()
        .merge(api::accounts::router())
        .merge(api::chat::router())
        .nest_service(
            "/uploads",
            ServiceBuilder::new().service(ServeDir::new(&config.uploads_dir)),
        )
        .nest_service(
            "/voices",
            ServiceBuilder::new().service(ServeDir::new(&config.voices_dir)),
        )
        .with_provider(provider)
}
