pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

pub use api::create_app_router;
pub use error::{AppError, Result};
pub use state::AppState;
