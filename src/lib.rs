pub mod config;
pub mod domain;
pub mod notify;
pub mod services;
pub mod stores;
pub mod utils;

pub use config::Settings;
pub use services::{BranchService, ConversationService, ServiceError};
