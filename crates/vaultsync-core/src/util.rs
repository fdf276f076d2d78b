//! Common utility functions.

pub mod data;
pub mod fs;

// Re-export commonly used items
pub use data::{deep_merge, struct_to_map};
pub use fs::{list_subdirs, read_config_dir, ConfigFile, ConfigFormat};
