pub mod tree_utils;

pub use tree_utils::{child_ids, fork_prefix, normalize_name, path_to_root};
