mod loader;
mod parser;

pub use loader::{init_config, template_config, ConfigLoader};
pub use parser::{parse_config, RawConfig, RawSchemaSection, SyncConfig};
