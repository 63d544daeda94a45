pub mod auth;
pub mod body;
pub mod environment;
pub mod item;

pub use auth::{ApiKeyPlacement, Auth};
pub use body::{FileEntry, FormField, MultipartField, MultipartKind, RawKind, RequestBody};
pub use environment::{EnvVariable, Environment};
pub use item::{Header, ItemVariable, Param, ParamKind, RequestItem, Scripts};
