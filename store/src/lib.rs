//! Forest-structured persistent store of messages.
//!
//! A dialog is reconstructed by walking `parent_id` edges from any message
//! to its root, then reversing. See the trait docs on [`ConversationStore`]
//! for the full contract.

mod error;
mod mem_store;
mod message;
mod sqlite_store;

pub use error::StoreError;
pub use mem_store::MemStore;
pub use message::{
    subagent_label, Block, BlockType, Dialog, Message, MessageId, Modality, Role,
};
pub use sqlite_store::SqliteStore;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Options for [`ConversationStore::list_messages`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Cap on the number of messages returned; `None` means unbounded.
    pub limit: Option<usize>,
}

/// Forest-structured store of messages keyed by opaque, store-assigned ids.
///
/// # Contract
///
/// - IDs are assigned by the store, never by callers, and are unique within
///   the store.
/// - [`save_dialog`](ConversationStore::save_dialog) is atomic per call: a
///   canceled save leaves either the whole chain or a strict prefix
///   consistent with parent edges — never an orphan.
/// - [`list_messages`](ConversationStore::list_messages) yields messages in
///   descending `created_at` order (ties broken by descending id, since ids
///   are monotonic); ordering is stable under insertions at the tail.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persists a linear chain. Each message's `parent_id` is set to the
    /// previously saved message's id (the first message's `parent_id` is
    /// whatever was set on it, typically `None` for a new root or an
    /// explicit continue-id for a fork). Returns each saved message with
    /// its assigned id, in save order.
    ///
    /// `cancel`, if given, is checked before each message is saved; once
    /// signaled, saving stops and the messages saved so far (a strict
    /// prefix, consistent with parent edges) are returned rather than an
    /// error, since a canceled save is not itself a failure.
    async fn save_dialog(
        &self,
        messages: Vec<Message>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Message>, StoreError>;

    /// Single-message variant of `save_dialog`.
    async fn save_message(
        &self,
        message: Message,
        parent_id: Option<MessageId>,
        label: &str,
    ) -> Result<Message, StoreError>;

    /// Walks parent edges from `id` to the root, returning messages in
    /// root-to-`id` order. Errors if `id` does not exist.
    async fn get_dialog_for_message(&self, id: MessageId) -> Result<Dialog, StoreError>;

    /// All messages in descending `created_at` order.
    async fn list_messages(&self, opts: ListOptions) -> Result<Vec<Message>, StoreError>;

    /// Whether `id` has at least one child edge.
    async fn has_children_by_id(&self, id: MessageId) -> Result<bool, StoreError>;

    /// Deletes a leaf message. Errors if `id` has children.
    async fn delete_message(&self, id: MessageId) -> Result<(), StoreError>;

    /// Deletes `id` and its entire descendant subtree in one transaction.
    async fn delete_message_recursive(&self, id: MessageId) -> Result<(), StoreError>;
}

/// Scans `list_messages` in descending order and returns the id of the
/// first message whose role is `Assistant` or `ToolResult` — the parent a
/// new user message should attach to when the caller did not supply an
/// explicit continue-id and did not request a new conversation.
///
/// Returns `Ok(None)` if no such message exists, meaning a fresh
/// conversation should be started.
pub async fn auto_continue_parent(
    store: &dyn ConversationStore,
) -> Result<Option<MessageId>, StoreError> {
    let messages = store.list_messages(ListOptions::default()).await?;
    Ok(messages
        .into_iter()
        .find(|m| matches!(m.role, Role::Assistant | Role::ToolResult))
        .and_then(|m| m.id))
}
