pub mod settings;

pub use settings::{AppConfig, Settings, StorageConfig};
