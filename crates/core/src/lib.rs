pub mod backend;
pub mod config;
pub mod error;
pub mod path;
pub mod store;

pub use backend::Backend;
pub use config::{Selection, StorageConfig};
pub use error::{PathKind, StorageError};
