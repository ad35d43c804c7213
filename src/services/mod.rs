pub mod candidates;
pub mod context;
pub mod gap_analysis;
pub mod planner;
pub mod prompt;
pub mod providers;
pub mod recommendations;
pub mod rules;
pub mod scoring;
pub mod tables;

pub use context::{ContextResolver, ResolvedContext};
pub use planner::DailyPlanner;
pub use recommendations::{EngineSettings, OutfitEngine};
