//! In-process store, same semantics as the SQLite-backed store. Used by
//! tests and anywhere persistence is undesired (note: `--incognito` skips
//! the store entirely rather than routing through `MemStore`).

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    Block, ConversationStore, Dialog, ListOptions, Message, MessageId, Role, StoreError,
};

struct Row {
    message: Message,
}

/// In-memory `ConversationStore`, backed by a `tokio::sync::Mutex<Vec<Row>>`.
#[derive(Default)]
pub struct MemStore {
    rows: Mutex<Vec<Row>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn next_id(&self) -> MessageId {
        let rows = self.rows.lock().await;
        MessageId(rows.len() as i64 + 1)
    }
}

#[async_trait]
impl ConversationStore for MemStore {
    async fn save_dialog(
        &self,
        messages: Vec<Message>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Message>, StoreError> {
        let mut saved = Vec::with_capacity(messages.len());
        let mut prev_id: Option<MessageId> = None;
        for (i, mut msg) in messages.into_iter().enumerate() {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    break;
                }
            }
            if i > 0 {
                msg.parent_id = prev_id;
            }
            let id = self.next_id().await;
            msg.id = Some(id);
            prev_id = Some(id);
            self.rows.lock().await.push(Row { message: msg.clone() });
            saved.push(msg);
        }
        Ok(saved)
    }

    async fn save_message(
        &self,
        mut message: Message,
        parent_id: Option<MessageId>,
        label: &str,
    ) -> Result<Message, StoreError> {
        message.parent_id = parent_id;
        message.label = label.to_string();
        let id = self.next_id().await;
        message.id = Some(id);
        self.rows.lock().await.push(Row { message: message.clone() });
        Ok(message)
    }

    async fn get_dialog_for_message(&self, id: MessageId) -> Result<Dialog, StoreError> {
        let rows = self.rows.lock().await;
        let by_id = |needle: MessageId| rows.iter().find(|r| r.message.id == Some(needle));
        let mut chain = Vec::new();
        let mut current = by_id(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        loop {
            chain.push(current.message.clone());
            match current.message.parent_id {
                Some(pid) => {
                    current = by_id(pid).ok_or_else(|| StoreError::NotFound(pid.to_string()))?;
                }
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    async fn list_messages(&self, opts: ListOptions) -> Result<Vec<Message>, StoreError> {
        let rows = self.rows.lock().await;
        let mut messages: Vec<Message> = rows.iter().map(|r| r.message.clone()).collect();
        messages.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = opts.limit {
            messages.truncate(limit);
        }
        Ok(messages)
    }

    async fn has_children_by_id(&self, id: MessageId) -> Result<bool, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().any(|r| r.message.parent_id == Some(id)))
    }

    async fn delete_message(&self, id: MessageId) -> Result<(), StoreError> {
        if self.has_children_by_id(id).await? {
            return Err(StoreError::HasChildren(id.to_string()));
        }
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|r| r.message.id != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_message_recursive(&self, id: MessageId) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        let mut to_delete = vec![id];
        let mut frontier = vec![id];
        while let Some(cur) = frontier.pop() {
            let children: Vec<MessageId> = rows
                .iter()
                .filter(|r| r.message.parent_id == Some(cur))
                .filter_map(|r| r.message.id)
                .collect();
            frontier.extend(children.iter().copied());
            to_delete.extend(children);
        }
        let before = rows.len();
        rows.retain(|r| !to_delete.contains(&r.message.id.unwrap_or(MessageId(-1))));
        if rows.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Convenience: a simple two-message user/assistant pair, for tests.
pub fn demo_pair(user_text: &str, assistant_text: &str) -> (Message, Message) {
    (
        Message::new(Role::User, vec![Block::text(user_text)]),
        Message::new(Role::Assistant, vec![Block::text(assistant_text)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_dialog_chains_parent_ids() {
        let store = MemStore::new();
        let (u, a) = demo_pair("hi", "hello");
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].parent_id, saved[0].id);
    }

    #[tokio::test]
    async fn get_dialog_for_message_reconstructs_root_to_leaf() {
        let store = MemStore::new();
        let (u, a) = demo_pair("hi", "hello");
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        let dialog = store.get_dialog_for_message(saved[1].id.unwrap()).await.unwrap();
        assert_eq!(dialog.len(), 2);
        assert_eq!(dialog[0].role, Role::User);
        assert_eq!(dialog[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn get_dialog_for_missing_id_errors() {
        let store = MemStore::new();
        let err = store.get_dialog_for_message(MessageId(999)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_message_refuses_when_children_exist() {
        let store = MemStore::new();
        let (u, a) = demo_pair("hi", "hello");
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        let err = store.delete_message(saved[0].id.unwrap()).await.unwrap_err();
        assert!(matches!(err, StoreError::HasChildren(_)));
    }

    #[tokio::test]
    async fn delete_message_recursive_removes_whole_subtree() {
        let store = MemStore::new();
        let (u, a) = demo_pair("hi", "hello");
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        store
            .delete_message_recursive(saved[0].id.unwrap())
            .await
            .unwrap();
        let remaining = store.list_messages(ListOptions::default()).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn cancel_token_stops_save_leaving_a_prefix() {
        let store = MemStore::new();
        let token = CancellationToken::new();
        token.cancel();
        let (u, a) = demo_pair("hi", "hello");
        let saved = store.save_dialog(vec![u, a], Some(&token)).await.unwrap();
        assert!(saved.is_empty());
        let remaining = store.list_messages(ListOptions::default()).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn list_messages_descending_order() {
        let store = MemStore::new();
        let (u, a) = demo_pair("hi", "hello");
        store.save_dialog(vec![u, a], None).await.unwrap();
        let listed = store.list_messages(ListOptions::default()).await.unwrap();
        assert_eq!(listed[0].role, Role::Assistant);
        assert_eq!(listed[1].role, Role::User);
    }
}
