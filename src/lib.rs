pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

mod app;

pub use app::run;
pub use application::toolkit::Toolkit;
pub use application::use_cases::ingestion::ImportRequest;
pub use domain::error::{AppError, Result};
pub use domain::tool_results::ToolResponse;
pub use infrastructure::config::AppConfig;
