pub mod pipeline;
pub mod reporter;
pub mod types;

pub use pipeline::Runner;
pub use reporter::RunReporter;
pub use types::{RunOutcome, RunSummary};
