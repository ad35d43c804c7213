pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use error::{AppError, AppResult};
pub use services::{ContextResolver, DailyPlanner, EngineSettings, OutfitEngine};
