pub mod apis;
pub mod common;
pub mod config;
pub mod logging;
pub mod pipeline;

pub use common::error::{PipelineError, Result};
