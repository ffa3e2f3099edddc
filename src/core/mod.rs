pub mod config;
pub mod error;
pub mod types;

pub use config::{AiConfig, AiLevel};
pub use error::{AiError, Result};
