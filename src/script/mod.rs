pub mod blocklist;
pub mod sandbox;
pub mod types;

pub use sandbox::{SandboxLimits, ScriptContext, ScriptSandbox};
pub use types::{LogEntry, LogLevel, ScriptError, ScriptOutcome, ScriptStage, TestResult};
