// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod settings;

pub use loader::{
    apply_env_overrides, default_config_path, load_config, load_config_from, save_config,
    save_registry, ENV_ACCOUNT, ENV_NODE_URL, ENV_REGISTRY,
};
pub use settings::{Config, ConfirmationConfig, NetworkConfig, NodeConfig};
