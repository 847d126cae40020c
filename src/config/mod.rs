pub mod loader;
pub mod schema;
pub mod settings;

pub use loader::{CONF_LOCATION_ENV, DEFAULT_CONF_LOCATION, FileFormat, resolve_config_path};
pub use schema::{DefaultsSection, PolicyFile};
pub use settings::{Settings, connection_from_env, process_env};
