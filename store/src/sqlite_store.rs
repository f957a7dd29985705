//! SQLite-backed `ConversationStore`. Persistent across process restarts,
//! one file at the configured `db_path` (default `.cpeconvo/store.sqlite3`).
//!
//! Each call opens its own connection and runs on `spawn_blocking`; rusqlite
//! `Connection` is not `Send` across await points, and opening per-call keeps
//! the store free of a held lock that could deadlock a canceled save.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tokio_util::sync::CancellationToken;

use crate::{
    Block, ConversationStore, Dialog, ListOptions, Message, MessageId, Role, StoreError,
};

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::ToolResult => "tool_result",
    }
}

fn str_to_role(s: &str) -> Result<Role, StoreError> {
    match s {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        "tool_result" => Ok(Role::ToolResult),
        other => Err(StoreError::Storage(format!("unknown role {other}"))),
    }
}

fn row_to_message(
    id: i64,
    parent_id: Option<i64>,
    role: String,
    blocks_json: String,
    created_at: String,
    label: String,
) -> Result<Message, StoreError> {
    let blocks: Vec<Block> = serde_json::from_str(&blocks_json)
        .map_err(|e| StoreError::Storage(format!("corrupt blocks for message {id}: {e}")))?;
    let created_at: DateTime<Utc> = created_at
        .parse()
        .map_err(|e| StoreError::Storage(format!("corrupt timestamp for message {id}: {e}")))?;
    Ok(Message {
        id: Some(MessageId(id)),
        parent_id: parent_id.map(MessageId),
        role: str_to_role(&role)?,
        blocks,
        created_at,
        label,
    })
}

/// Persistent `ConversationStore` backed by a SQLite file.
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if absent) the database at `path` and ensures the
    /// schema exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
            }
        }
        let conn = Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER,
                role TEXT NOT NULL,
                blocks TEXT NOT NULL,
                created_at TEXT NOT NULL,
                label TEXT NOT NULL DEFAULT ''
            )
            "#,
            [],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS messages_parent_id_idx ON messages(parent_id)",
            [],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(Self { db_path })
    }

    fn insert(
        conn: &Connection,
        parent_id: Option<MessageId>,
        role: Role,
        blocks_json: &str,
        created_at: &str,
        label: &str,
    ) -> Result<i64, StoreError> {
        conn.execute(
            "INSERT INTO messages (parent_id, role, blocks, created_at, label)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                parent_id.map(|id| id.0),
                role_to_str(role),
                blocks_json,
                created_at,
                label,
            ],
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn save_dialog(
        &self,
        messages: Vec<Message>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Message>, StoreError> {
        let db_path = self.db_path.clone();
        let cancel = cancel.cloned();
        tokio::task::spawn_blocking(move || {
            let mut conn =
                Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let tx = conn.transaction().map_err(|e| StoreError::Storage(e.to_string()))?;
            let mut saved = Vec::with_capacity(messages.len());
            let mut prev_id: Option<MessageId> = None;
            for (i, mut msg) in messages.into_iter().enumerate() {
                if let Some(token) = &cancel {
                    if token.is_cancelled() {
                        break;
                    }
                }
                if i > 0 {
                    msg.parent_id = prev_id;
                }
                let blocks_json = serde_json::to_string(&msg.blocks)
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                let created_at = msg.created_at.to_rfc3339();
                let id = Self::insert(
                    &tx,
                    msg.parent_id,
                    msg.role,
                    &blocks_json,
                    &created_at,
                    &msg.label,
                )?;
                msg.id = Some(MessageId(id));
                prev_id = Some(MessageId(id));
                saved.push(msg);
            }
            tx.commit().map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(saved)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn save_message(
        &self,
        mut message: Message,
        parent_id: Option<MessageId>,
        label: &str,
    ) -> Result<Message, StoreError> {
        message.parent_id = parent_id;
        message.label = label.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn =
                Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let blocks_json = serde_json::to_string(&message.blocks)
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let created_at = message.created_at.to_rfc3339();
            let id = Self::insert(
                &conn,
                message.parent_id,
                message.role,
                &blocks_json,
                &created_at,
                &message.label,
            )?;
            message.id = Some(MessageId(id));
            Ok(message)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn get_dialog_for_message(&self, id: MessageId) -> Result<Dialog, StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn =
                Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let mut chain = Vec::new();
            let mut current_id = Some(id);
            while let Some(cur) = current_id {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, parent_id, role, blocks, created_at, label
                         FROM messages WHERE id = ?1",
                    )
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                let message = stmt
                    .query_row(params![cur.0], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Option<i64>>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })
                    .map_err(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => {
                            StoreError::NotFound(cur.to_string())
                        }
                        other => StoreError::Storage(other.to_string()),
                    })?;
                let (row_id, parent_id, role, blocks_json, created_at, label) = message;
                let msg = row_to_message(row_id, parent_id, role, blocks_json, created_at, label)?;
                current_id = msg.parent_id;
                chain.push(msg);
            }
            chain.reverse();
            Ok(chain)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn list_messages(&self, opts: ListOptions) -> Result<Vec<Message>, StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn =
                Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let sql = match opts.limit {
                Some(_) => {
                    "SELECT id, parent_id, role, blocks, created_at, label FROM messages
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                }
                None => {
                    "SELECT id, parent_id, role, blocks, created_at, label FROM messages
                     ORDER BY created_at DESC, id DESC"
                }
            };
            let mut stmt = conn.prepare(sql).map_err(|e| StoreError::Storage(e.to_string()))?;
            let mapper = |row: &rusqlite::Row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            };
            let rows: Vec<_> = if let Some(limit) = opts.limit {
                stmt.query_map(params![limit as i64], mapper)
                    .map_err(|e| StoreError::Storage(e.to_string()))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| StoreError::Storage(e.to_string()))?
            } else {
                stmt.query_map([], mapper)
                    .map_err(|e| StoreError::Storage(e.to_string()))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| StoreError::Storage(e.to_string()))?
            };
            rows.into_iter()
                .map(|(id, parent_id, role, blocks_json, created_at, label)| {
                    row_to_message(id, parent_id, role, blocks_json, created_at, label)
                })
                .collect()
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn has_children_by_id(&self, id: MessageId) -> Result<bool, StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn =
                Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE parent_id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(count > 0)
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn delete_message(&self, id: MessageId) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn =
                Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let children: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE parent_id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            if children > 0 {
                return Err(StoreError::HasChildren(id.to_string()));
            }
            let affected = conn
                .execute("DELETE FROM messages WHERE id = ?1", params![id.0])
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            if affected == 0 {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }

    async fn delete_message_recursive(&self, id: MessageId) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn =
                Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
            let tx = conn.transaction().map_err(|e| StoreError::Storage(e.to_string()))?;

            let exists: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            if exists == 0 {
                return Err(StoreError::NotFound(id.to_string()));
            }

            let mut to_delete = vec![id.0];
            let mut frontier = vec![id.0];
            while let Some(cur) = frontier.pop() {
                let mut stmt = tx
                    .prepare("SELECT id FROM messages WHERE parent_id = ?1")
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                let children: Vec<i64> = stmt
                    .query_map(params![cur], |row| row.get(0))
                    .map_err(|e| StoreError::Storage(e.to_string()))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                frontier.extend(children.iter().copied());
                to_delete.extend(children);
            }

            for message_id in &to_delete {
                tx.execute("DELETE FROM messages WHERE id = ?1", params![message_id])
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
            }
            tx.commit().map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn temp_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        (SqliteStore::new(path).unwrap(), dir)
    }

    fn demo_pair() -> (Message, Message) {
        (
            Message::new(Role::User, vec![Block::text("hi")]),
            Message::new(Role::Assistant, vec![Block::text("hello")]),
        )
    }

    #[tokio::test]
    async fn save_dialog_persists_and_chains_parents() {
        let (store, _dir) = temp_store();
        let (u, a) = demo_pair();
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].parent_id, saved[0].id);
    }

    #[tokio::test]
    async fn reopening_the_same_path_sees_prior_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        {
            let store = SqliteStore::new(&path).unwrap();
            let (u, a) = demo_pair();
            store.save_dialog(vec![u, a], None).await.unwrap();
        }
        let reopened = SqliteStore::new(&path).unwrap();
        let listed = reopened.list_messages(ListOptions::default()).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn get_dialog_for_message_walks_to_root() {
        let (store, _dir) = temp_store();
        let (u, a) = demo_pair();
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        let dialog = store
            .get_dialog_for_message(saved[1].id.unwrap())
            .await
            .unwrap();
        assert_eq!(dialog.len(), 2);
        assert_eq!(dialog[0].role, Role::User);
        assert_eq!(dialog[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn delete_leaf_succeeds_delete_parent_with_children_fails() {
        let (store, _dir) = temp_store();
        let (u, a) = demo_pair();
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        let err = store
            .delete_message(saved[0].id.unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::HasChildren(_)));
        store.delete_message(saved[1].id.unwrap()).await.unwrap();
        store.delete_message(saved[0].id.unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn delete_recursive_removes_whole_subtree() {
        let (store, _dir) = temp_store();
        let (u, a) = demo_pair();
        let saved = store.save_dialog(vec![u, a], None).await.unwrap();
        store
            .delete_message_recursive(saved[0].id.unwrap())
            .await
            .unwrap();
        let remaining = store.list_messages(ListOptions::default()).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn canceled_save_leaves_only_a_prefix() {
        let (store, _dir) = temp_store();
        let token = CancellationToken::new();
        token.cancel();
        let (u, a) = demo_pair();
        let saved = store.save_dialog(vec![u, a], Some(&token)).await.unwrap();
        assert!(saved.is_empty());
        let listed = store.list_messages(ListOptions::default()).await.unwrap();
        assert!(listed.is_empty());
    }
}
