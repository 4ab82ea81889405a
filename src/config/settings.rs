use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: StorageConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub state_dir: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root_branch_name: String,
    pub max_branches_per_conversation: usize,
    pub max_branch_depth: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            storage: StorageConfig {
                state_dir: env::var("BRANCH_STATE_DIR")
                    .unwrap_or_else(|_| ".chat-branching".to_string()),
            },
            app: AppConfig {
                root_branch_name: env::var("ROOT_BRANCH_NAME")
                    .unwrap_or_else(|_| "main".to_string()),
                max_branches_per_conversation: env::var("MAX_BRANCHES_PER_CONVERSATION")
                    .unwrap_or_else(|_| "64".to_string())
                    .parse()
                    .unwrap_or(64),
                max_branch_depth: env::var("MAX_BRANCH_DEPTH")
                    .unwrap_or_else(|_| "32".to_string())
                    .parse()
                    .unwrap_or(32),
            },
        }
    }
}
