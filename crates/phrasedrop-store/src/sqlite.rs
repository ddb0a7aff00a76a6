//! SQLite-backed store — phrase pool, consumption ledger, recipients.
//!
//! The consumption ledger is append-only: one row per (recipient, phrase)
//! pair, written exactly once at delivery commit time. The composite primary
//! key is what makes "delivered twice" a constraint violation rather than a
//! silent bug.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use phrasedrop_core::error::{PhrasedropError, Result};
use phrasedrop_core::traits::{RecipientDirectory, Store};
use phrasedrop_core::types::{ChatId, Phrase, Recipient, Role};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| PhrasedropError::Store(format!("DB open: {e}")))?;
        tracing::info!("Using database {}", path.display());
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PhrasedropError::Store(format!("DB open: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS recipients (
                id TEXT PRIMARY KEY,
                chat_id INTEGER NOT NULL UNIQUE,
                is_admin INTEGER NOT NULL DEFAULT 0,
                subscribed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS phrases (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS consumptions (
                recipient_id TEXT NOT NULL REFERENCES recipients(id),
                phrase_id TEXT NOT NULL REFERENCES phrases(id),
                PRIMARY KEY (recipient_id, phrase_id)
            );
            ",
        )
        .map_err(|e| PhrasedropError::Store(format!("Migration: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PhrasedropError::Store(format!("connection lock poisoned: {e}")))
    }

    // ─── Recipient management ──────────────────────────────────

    /// Register the chat if absent; returns the stored row either way.
    pub fn ensure_recipient(&self, chat_id: ChatId) -> Result<Recipient> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO recipients (id, chat_id) VALUES (?1, ?2)",
            rusqlite::params![Uuid::new_v4().to_string(), chat_id],
        )
        .map_err(|e| PhrasedropError::Store(format!("Insert recipient: {e}")))?;
        Self::recipient_by_chat(&conn, chat_id)?.ok_or_else(|| {
            PhrasedropError::Store(format!("recipient {chat_id} vanished after insert"))
        })
    }

    pub fn get_recipient(&self, chat_id: ChatId) -> Result<Option<Recipient>> {
        let conn = self.lock()?;
        Self::recipient_by_chat(&conn, chat_id)
    }

    pub fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, chat_id, is_admin, subscribed FROM recipients ORDER BY chat_id")
            .map_err(|e| PhrasedropError::Store(format!("List recipients: {e}")))?;
        let rows = stmt
            .query_map([], Self::row_to_recipient)
            .map_err(|e| PhrasedropError::Store(format!("List recipients: {e}")))?;
        collect_rows(rows)
    }

    /// Grant or revoke a capability on a known recipient.
    pub fn set_role(&self, chat_id: ChatId, role: Role, state: bool) -> Result<()> {
        let sql = match role {
            Role::Admin => "UPDATE recipients SET is_admin = ?1 WHERE chat_id = ?2",
            Role::Subscriber => "UPDATE recipients SET subscribed = ?1 WHERE chat_id = ?2",
        };
        let updated = self
            .lock()?
            .execute(sql, rusqlite::params![state as i32, chat_id])
            .map_err(|e| PhrasedropError::Store(format!("Set role: {e}")))?;
        if updated == 0 {
            return Err(PhrasedropError::Store(format!(
                "unknown recipient chat {chat_id}"
            )));
        }
        Ok(())
    }

    fn recipient_by_chat(conn: &Connection, chat_id: ChatId) -> Result<Option<Recipient>> {
        conn.query_row(
            "SELECT id, chat_id, is_admin, subscribed FROM recipients WHERE chat_id = ?1",
            [chat_id],
            Self::row_to_recipient,
        )
        .optional()
        .map_err(|e| PhrasedropError::Store(format!("Get recipient: {e}")))?
        .transpose()
    }

    fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Recipient>> {
        let id: String = row.get(0)?;
        let chat_id: ChatId = row.get(1)?;
        let is_admin: bool = row.get::<_, i32>(2)? != 0;
        let subscribed: bool = row.get::<_, i32>(3)? != 0;
        Ok(parse_uuid(&id).map(|id| Recipient {
            id,
            chat_id,
            is_admin,
            subscribed,
        }))
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| PhrasedropError::Store(format!("corrupt id '{raw}': {e}")))
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<Result<T>>>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| PhrasedropError::Store(format!("Row read: {e}")))??);
    }
    Ok(out)
}

#[async_trait]
impl Store for SqliteStore {
    async fn all_phrases(&self) -> Result<Vec<Phrase>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, text FROM phrases")
            .map_err(|e| PhrasedropError::Store(format!("List phrases: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let text: String = row.get(1)?;
                Ok(parse_uuid(&id).map(|id| Phrase { id, text }))
            })
            .map_err(|e| PhrasedropError::Store(format!("List phrases: {e}")))?;
        collect_rows(rows)
    }

    async fn unconsumed_for(&self, recipient: Uuid) -> Result<Vec<Uuid>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id FROM phrases
                 WHERE id NOT IN (SELECT phrase_id FROM consumptions WHERE recipient_id = ?1)",
            )
            .map_err(|e| PhrasedropError::Store(format!("Unconsumed query: {e}")))?;
        let rows = stmt
            .query_map([recipient.to_string()], |row| {
                let id: String = row.get(0)?;
                Ok(parse_uuid(&id))
            })
            .map_err(|e| PhrasedropError::Store(format!("Unconsumed query: {e}")))?;
        collect_rows(rows)
    }

    async fn record_consumption(&self, pairs: &[(Uuid, Uuid)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| PhrasedropError::Commit(e.to_string()))?;
        for (recipient, phrase) in pairs {
            tx.execute(
                "INSERT INTO consumptions (recipient_id, phrase_id) VALUES (?1, ?2)",
                rusqlite::params![recipient.to_string(), phrase.to_string()],
            )
            .map_err(|e| PhrasedropError::Commit(e.to_string()))?;
        }
        tx.commit().map_err(|e| PhrasedropError::Commit(e.to_string()))
    }

    async fn add_phrases_if_absent(&self, texts: &[String]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| PhrasedropError::Store(format!("Add phrases: {e}")))?;
        let mut inserted = 0;
        for text in texts {
            inserted += tx
                .execute(
                    "INSERT OR IGNORE INTO phrases (id, text) VALUES (?1, ?2)",
                    rusqlite::params![Uuid::new_v4().to_string(), text],
                )
                .map_err(|e| PhrasedropError::Store(format!("Add phrases: {e}")))?;
        }
        tx.commit()
            .map_err(|e| PhrasedropError::Store(format!("Add phrases: {e}")))?;
        tracing::debug!("💾 Inserted {inserted} of {} phrases", texts.len());
        Ok(inserted)
    }
}

#[async_trait]
impl RecipientDirectory for SqliteStore {
    async fn list_eligible(&self) -> Result<Vec<(Uuid, ChatId)>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, chat_id FROM recipients WHERE subscribed = 1")
            .map_err(|e| PhrasedropError::Store(format!("List eligible: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let chat_id: ChatId = row.get(1)?;
                Ok(parse_uuid(&id).map(|id| (id, chat_id)))
            })
            .map_err(|e| PhrasedropError::Store(format!("List eligible: {e}")))?;
        collect_rows(rows)
    }

    async fn admin_chats(&self) -> Result<Vec<ChatId>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT chat_id FROM recipients WHERE is_admin = 1")
            .map_err(|e| PhrasedropError::Store(format!("List admins: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, ChatId>(0))
            .map_err(|e| PhrasedropError::Store(format!("List admins: {e}")))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| PhrasedropError::Store(format!("Row read: {e}")))?);
        }
        Ok(out)
    }
}
