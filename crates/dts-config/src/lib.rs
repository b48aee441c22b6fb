//! Server configuration: environment-driven `ServerConfig`, storage paths,
//! and the CKG retention sweep.

pub mod config;
pub mod gc;
pub mod paths;

pub use config::{ServerConfig, Transport};
pub use gc::sweep_stale_ckg_databases;
pub use paths::{APP_NAME, ckg_dir, default_storage_dir};
