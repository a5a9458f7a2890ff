//! Library interface for the custodian CLI

pub mod jsonnet;
pub mod module_commands;
pub mod settings;

pub use module_commands::{ModCommand, ModuleManager, ROOT_MODULE_ID};
pub use settings::{default_cache_dir, Settings, ENV_MODULE_CACHE};
