//! autoshot - scheduled screenshot capture, made configurable.
//!
//! This crate is the core of the application: the persisted collections of
//! capture targets (screens and regions), the versioned store that survives
//! schema upgrades, and the execution engine that runs one capture pass per
//! scheduling tick. The windowed UI, the tray shell, the macro engine, and the
//! pixel grabber are external collaborators behind the traits in [`capture`]
//! and [`macros`].

pub mod capture;
pub mod config;
pub mod engine;
pub mod macros;
pub mod store;
pub mod targets;
pub mod triggers;
pub mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for binaries embedding the engine.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoshot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
