//! Krishi Mitra: farming advice chat with speech replies - library exports for testing

pub mod api;
pub mod app;
pub mod config;
pub mod core;
pub mod infrastructure;
