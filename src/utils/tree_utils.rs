use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::Branch;

/// Trim a user-supplied branch name; None when nothing is left.
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Prefix of `message_ids` up to and including `fork_point`, if present.
pub fn fork_prefix(message_ids: &[Uuid], fork_point: Uuid) -> Option<Vec<Uuid>> {
    message_ids
        .iter()
        .position(|id| *id == fork_point)
        .map(|idx| message_ids[..=idx].to_vec())
}

/// Walk parent pointers from `start` up to the root. Returns the visited
/// branch ids, `start` first, or None when a parent is missing or the walk
/// revisits a branch.
pub fn path_to_root(branches: &HashMap<Uuid, Branch>, start: Uuid) -> Option<Vec<Uuid>> {
    let mut path = Vec::new();
    let mut current = start;

    loop {
        if path.contains(&current) {
            return None;
        }

        let branch = branches.get(&current)?;
        path.push(current);

        match branch.parent_branch_id {
            Some(parent) => current = parent,
            None => return Some(path),
        }
    }
}

/// Ids of the direct children of `parent`.
pub fn child_ids(branches: &HashMap<Uuid, Branch>, parent: Uuid) -> Vec<Uuid> {
    branches
        .values()
        .filter(|b| b.parent_branch_id == Some(parent))
        .map(|b| b.branch_id)
        .collect()
}
