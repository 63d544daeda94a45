pub mod collection;
pub mod error;
pub mod http;
pub mod logger;
pub mod runner;
pub mod script;
pub mod utils;
pub mod variable;

// Re-export commonly used types
pub use error::{Result, RunnerError};
pub use runner::{RunOutcome, Runner};
