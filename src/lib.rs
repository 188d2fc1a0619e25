pub mod adapters;
pub mod api;
pub mod client;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod domain;
pub mod utils;

pub use adapters::{ArtifactRegistry, LocalStorage};
pub use api::{router, AppState};
pub use config::{ClientConfig, DashboardArgs, ServerArgs, Settings};
pub use dashboard::{dashboard_router, DashboardState};
pub use core::engine::CleaningEngine;
pub use utils::error::{CleanError, Result};
