pub mod config;
pub mod models;
pub mod service;
pub mod telemetry;

pub use config::{LogFormat, ServiceConfig};
pub use service::{
    AppState, build_router, create_app, create_app_state, spawn_session_sweeper,
};
