pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, load_config, load_config_from_str, resolve_config, validate_config,
};
pub use schema::{Config, ProcessingMode};
