pub mod config;
pub mod interpolator;
pub mod resolver;
pub mod store;
pub mod types;

pub use config::{ConfigError, ConfigLoader, RunnerConfig};
pub use interpolator::{apply_params, interpolate};
pub use resolver::VariableResolver;
pub use store::VariableStore;
pub use types::VariableMap;
