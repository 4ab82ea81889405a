use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::{Branch, ConversationBranchMetadata, ConversationBranchState};
use crate::stores::{BranchStateStore, MessageStore, StoreError};
use crate::utils::{child_ids, fork_prefix, normalize_name, path_to_root};

use super::error::{Result, ServiceError};

/// One conversation's branch forest plus its active-branch pointer.
#[derive(Debug, Clone)]
struct ConversationTree {
    metadata: ConversationBranchMetadata,
    branches: HashMap<Uuid, Branch>,
}

impl ConversationTree {
    fn to_state(&self) -> ConversationBranchState {
        let mut branches: Vec<Branch> = self.branches.values().cloned().collect();
        branches.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.branch_id.cmp(&b.branch_id))
        });
        ConversationBranchState {
            metadata: self.metadata.clone(),
            branches,
        }
    }

    fn from_state(state: ConversationBranchState) -> Self {
        ConversationTree {
            metadata: state.metadata,
            branches: state
                .branches
                .into_iter()
                .map(|b| (b.branch_id, b))
                .collect(),
        }
    }
}

/// Owns the per-conversation branch forests and the active-branch pointers.
///
/// Each conversation lives in its own map entry, so the entry guard doubles
/// as the per-conversation mutual-exclusion scope: precondition checks and
/// the mutation they protect happen under one guard, and unrelated
/// conversations never contend. Mutations either fully succeed or leave the
/// tree untouched.
pub struct BranchService {
    message_store: Arc<dyn MessageStore>,
    trees: DashMap<Uuid, ConversationTree>,
    // branch id -> owning conversation id
    branch_index: DashMap<Uuid, Uuid>,
    app_config: AppConfig,
}

impl BranchService {
    pub fn new(message_store: Arc<dyn MessageStore>, app_config: AppConfig) -> Self {
        Self {
            message_store,
            trees: DashMap::new(),
            branch_index: DashMap::new(),
            app_config,
        }
    }

    /// Fork the active branch at `from_message_id`.
    ///
    /// The first fork of a conversation materializes the implicit root
    /// branch from the message store's creation-ordered ids. The new branch
    /// gets a snapshot copy of the parent's messages up to and including the
    /// fork point, and the active pointer stays where it was.
    pub async fn create_branch(
        &self,
        conversation_id: Uuid,
        name: &str,
        from_message_id: Uuid,
        description: Option<String>,
    ) -> Result<Branch> {
        let name = normalize_name(name).ok_or(ServiceError::InvalidName)?;

        // Fetch before taking the tree entry so the await point sits outside
        // the per-conversation scope.
        let fetched_ids = if self.trees.contains_key(&conversation_id) {
            None
        } else {
            Some(self.message_store.list_message_ids(conversation_id).await?)
        };

        let mut materialized_root = None;
        let result = {
            let mut tree = self.trees.entry(conversation_id).or_insert_with(|| {
                let root = Branch::new_root(
                    conversation_id,
                    self.app_config.root_branch_name.clone(),
                    fetched_ids.unwrap_or_default(),
                );
                materialized_root = Some(root.branch_id);
                let metadata = ConversationBranchMetadata {
                    conversation_id,
                    root_branch_id: root.branch_id,
                    active_branch_id: root.branch_id,
                };
                let mut branches = HashMap::new();
                branches.insert(root.branch_id, root);
                ConversationTree { metadata, branches }
            });
            self.fork_from_active(&mut tree, name, from_message_id, description)
        };

        match result {
            Ok(branch) => {
                if let Some(root_id) = materialized_root {
                    self.branch_index.insert(root_id, conversation_id);
                    tracing::info!(%conversation_id, %root_id, "materialized root branch");
                }
                self.branch_index.insert(branch.branch_id, conversation_id);
                tracing::info!(
                    %conversation_id,
                    branch_id = %branch.branch_id,
                    name = %branch.name,
                    "created branch"
                );
                Ok(branch)
            }
            Err(err) => {
                // A failed first fork leaves the conversation unforked.
                if materialized_root.is_some() {
                    self.trees.remove(&conversation_id);
                }
                Err(err)
            }
        }
    }

    fn fork_from_active(
        &self,
        tree: &mut ConversationTree,
        name: String,
        from_message_id: Uuid,
        description: Option<String>,
    ) -> Result<Branch> {
        if tree.branches.len() >= self.app_config.max_branches_per_conversation {
            return Err(ServiceError::LimitExceeded(format!(
                "conversation already has {} branches",
                tree.branches.len()
            )));
        }

        let active_id = tree.metadata.active_branch_id;
        let active = tree
            .branches
            .get(&active_id)
            .ok_or(ServiceError::UnknownBranch(active_id))?;

        let depth = path_to_root(&tree.branches, active_id)
            .map(|path| path.len())
            .unwrap_or(0);
        if depth >= self.app_config.max_branch_depth {
            return Err(ServiceError::LimitExceeded(format!(
                "branch depth {} reached the maximum of {}",
                depth, self.app_config.max_branch_depth
            )));
        }

        let message_ids = fork_prefix(&active.message_ids, from_message_id)
            .ok_or(ServiceError::UnknownForkPoint(from_message_id))?;

        let branch = Branch::new_child(active, name, description, from_message_id, message_ids);
        tree.branches.insert(branch.branch_id, branch.clone());

        Ok(branch)
    }

    /// Point the chat view at another branch. Idempotent when the branch is
    /// already active; a failed switch leaves the previous pointer in place.
    pub fn switch_branch(&self, conversation_id: Uuid, branch_id: Uuid) -> Result<()> {
        let mut tree = self
            .trees
            .get_mut(&conversation_id)
            .ok_or(ServiceError::UnknownBranch(branch_id))?;

        if !tree.branches.contains_key(&branch_id) {
            return Err(ServiceError::UnknownBranch(branch_id));
        }

        if tree.metadata.active_branch_id != branch_id {
            tree.metadata.active_branch_id = branch_id;
            tracing::debug!(%conversation_id, %branch_id, "switched active branch");
        }

        Ok(())
    }

    /// Update a branch's label. No structural effect; names need not be
    /// unique within a conversation.
    pub fn rename_branch(&self, branch_id: Uuid, new_name: &str) -> Result<()> {
        let name = normalize_name(new_name).ok_or(ServiceError::InvalidName)?;

        let conversation_id = self
            .branch_index
            .get(&branch_id)
            .map(|entry| *entry.value())
            .ok_or(ServiceError::UnknownBranch(branch_id))?;

        let mut tree = self
            .trees
            .get_mut(&conversation_id)
            .ok_or(ServiceError::UnknownBranch(branch_id))?;

        let branch = tree
            .branches
            .get_mut(&branch_id)
            .ok_or(ServiceError::UnknownBranch(branch_id))?;
        branch.name = name;

        Ok(())
    }

    /// Remove a branch node. The root and the active branch are protected;
    /// children of the deleted branch are re-parented to its own parent.
    /// Message content is untouched, it stays shared by reference.
    pub fn delete_branch(&self, conversation_id: Uuid, branch_id: Uuid) -> Result<()> {
        let mut tree = self
            .trees
            .get_mut(&conversation_id)
            .ok_or(ServiceError::UnknownBranch(branch_id))?;

        let branch = tree
            .branches
            .get(&branch_id)
            .ok_or(ServiceError::UnknownBranch(branch_id))?;

        if branch_id == tree.metadata.root_branch_id {
            return Err(ServiceError::CannotDeleteRoot);
        }
        if branch_id == tree.metadata.active_branch_id {
            return Err(ServiceError::CannotDeleteActiveBranch);
        }

        let parent_id = branch.parent_branch_id;
        for child_id in child_ids(&tree.branches, branch_id) {
            if let Some(child) = tree.branches.get_mut(&child_id) {
                child.parent_branch_id = parent_id;
            }
        }
        tree.branches.remove(&branch_id);
        drop(tree);

        self.branch_index.remove(&branch_id);
        tracing::info!(%conversation_id, %branch_id, "deleted branch");

        Ok(())
    }

    /// Flat listing of every branch in the conversation, in a stable order
    /// (creation time, then id). Empty if the conversation was never forked.
    pub fn get_branch_tree(&self, conversation_id: Uuid) -> Vec<Branch> {
        match self.trees.get(&conversation_id) {
            Some(tree) => tree.to_state().branches,
            None => Vec::new(),
        }
    }

    pub fn get_branch(&self, conversation_id: Uuid, branch_id: Uuid) -> Option<Branch> {
        self.trees
            .get(&conversation_id)
            .and_then(|tree| tree.branches.get(&branch_id).cloned())
    }

    pub fn metadata(&self, conversation_id: Uuid) -> Option<ConversationBranchMetadata> {
        self.trees
            .get(&conversation_id)
            .map(|tree| tree.metadata.clone())
    }

    pub fn active_branch_id(&self, conversation_id: Uuid) -> Option<Uuid> {
        self.trees
            .get(&conversation_id)
            .map(|tree| tree.metadata.active_branch_id)
    }

    /// The message ids the chat view should render, in order. None when the
    /// conversation has never been forked.
    pub fn active_branch_message_ids(&self, conversation_id: Uuid) -> Option<Vec<Uuid>> {
        self.trees.get(&conversation_id).and_then(|tree| {
            tree.branches
                .get(&tree.metadata.active_branch_id)
                .map(|branch| branch.message_ids.clone())
        })
    }

    /// Append a newly created message to the active branch's line. A no-op
    /// for unforked conversations and for ids the branch already holds.
    pub fn record_message(&self, conversation_id: Uuid, message_id: Uuid) {
        if let Some(mut tree) = self.trees.get_mut(&conversation_id) {
            let active_id = tree.metadata.active_branch_id;
            if let Some(branch) = tree.branches.get_mut(&active_id) {
                if !branch.contains_message(message_id) {
                    branch.message_ids.push(message_id);
                }
            }
        }
    }

    /// Drop all branch state for a conversation. Called when the owning
    /// conversation is deleted.
    pub fn remove_conversation(&self, conversation_id: Uuid) {
        if let Some((_, tree)) = self.trees.remove(&conversation_id) {
            for branch_id in tree.branches.keys() {
                self.branch_index.remove(branch_id);
            }
            tracing::info!(%conversation_id, "removed branch state");
        }
    }

    /// Consistent snapshot of the conversation's branch state, if forked.
    pub fn snapshot(&self, conversation_id: Uuid) -> Option<ConversationBranchState> {
        self.trees
            .get(&conversation_id)
            .map(|tree| tree.to_state())
    }

    /// Write the conversation's branch state through the blob store. A no-op
    /// for unforked conversations.
    pub async fn persist(
        &self,
        conversation_id: Uuid,
        store: &dyn BranchStateStore,
    ) -> Result<()> {
        if let Some(state) = self.snapshot(conversation_id) {
            store.save_state(&state).await?;
        }
        Ok(())
    }

    /// Load a previously persisted branch state. Returns false when the
    /// store has no blob for the conversation. The snapshot is validated
    /// before it replaces anything in memory.
    pub async fn restore(
        &self,
        conversation_id: Uuid,
        store: &dyn BranchStateStore,
    ) -> Result<bool> {
        let Some(state) = store.load_state(conversation_id).await? else {
            return Ok(false);
        };
        self.install_state(state)?;
        Ok(true)
    }

    fn install_state(&self, state: ConversationBranchState) -> Result<()> {
        let conversation_id = state.metadata.conversation_id;
        let tree = ConversationTree::from_state(state);

        let roots: Vec<&Branch> = tree.branches.values().filter(|b| b.is_root()).collect();
        if roots.len() != 1 || roots[0].branch_id != tree.metadata.root_branch_id {
            return Err(StoreError::InvalidData(
                "branch state does not have a single matching root".to_string(),
            )
            .into());
        }
        if !tree.branches.contains_key(&tree.metadata.active_branch_id) {
            return Err(StoreError::InvalidData(
                "active branch is not part of the branch state".to_string(),
            )
            .into());
        }
        for branch in tree.branches.values() {
            if branch.conversation_id != conversation_id {
                return Err(StoreError::InvalidData(format!(
                    "branch {} belongs to another conversation",
                    branch.branch_id
                ))
                .into());
            }
            if path_to_root(&tree.branches, branch.branch_id).is_none() {
                return Err(StoreError::InvalidData(format!(
                    "branch {} does not reach the root",
                    branch.branch_id
                ))
                .into());
            }
        }

        // Replace any previous in-memory state for this conversation.
        if let Some((_, old)) = self.trees.remove(&conversation_id) {
            for branch_id in old.branches.keys() {
                self.branch_index.remove(branch_id);
            }
        }
        for branch_id in tree.branches.keys() {
            self.branch_index.insert(*branch_id, conversation_id);
        }
        self.trees.insert(conversation_id, tree);
        tracing::info!(%conversation_id, "restored branch state");

        Ok(())
    }
}
