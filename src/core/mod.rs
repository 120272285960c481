pub mod assistant;
pub mod credentials;
pub mod language;
pub mod mailer;
pub mod orchestrator;
pub mod services;
pub mod speech;
pub mod traits;
