//! Chat records: one row per conversation, created on first contact and
//! updated on every interaction.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

use super::db::Store;
use crate::error::{AppError, AppResult};

/// Status given to a chat the first time it is seen.
pub const DEFAULT_STATUS: &str = "stage";

/// A conversation and the catalog selection made in it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    /// Telegram chat ID
    pub chat_id: i64,
    /// Telegram username, if the user has one
    pub username: Option<String>,
    pub first_name: Option<String>,
    /// Free-form conversation status (the navigation step)
    pub status: String,
    pub stage_id: Option<i64>,
    pub term_id: Option<i64>,
    pub grade_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub option_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Tri-state change for a nullable column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Leave the stored value as is
    #[default]
    Keep,
    /// Store NULL
    Clear,
    /// Store the given value
    Set(i64),
}

impl FieldUpdate {
    fn as_value(self) -> Option<Value> {
        match self {
            FieldUpdate::Keep => None,
            FieldUpdate::Clear => Some(Value::Null),
            FieldUpdate::Set(v) => Some(Value::Integer(v)),
        }
    }
}

impl From<Option<i64>> for FieldUpdate {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldUpdate::Clear, FieldUpdate::Set)
    }
}

/// Partial chat record for [`Store::upsert_chat`].
///
/// Absent fields keep their stored value; `last_seen` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub status: Option<String>,
    pub stage_id: FieldUpdate,
    pub term_id: FieldUpdate,
    pub grade_id: FieldUpdate,
    pub subject_id: FieldUpdate,
    pub option_id: FieldUpdate,
}

impl ChatUpdate {
    /// Update that only moves the chat to `status`.
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    /// Also record the user's Telegram profile.
    pub fn with_profile(mut self, username: Option<String>, first_name: Option<String>) -> Self {
        self.username = username;
        self.first_name = first_name;
        self
    }

    /// Also drop every selection.
    pub fn clear_selection(mut self) -> Self {
        self.stage_id = FieldUpdate::Clear;
        self.term_id = FieldUpdate::Clear;
        self.grade_id = FieldUpdate::Clear;
        self.subject_id = FieldUpdate::Clear;
        self.option_id = FieldUpdate::Clear;
        self
    }

    fn assignments(&self) -> (Vec<&'static str>, Vec<Value>) {
        let mut columns = Vec::new();
        let mut values = Vec::new();

        let texts = [
            ("username = ?", &self.username),
            ("first_name = ?", &self.first_name),
            ("status = ?", &self.status),
        ];
        for (column, value) in texts {
            if let Some(v) = value {
                columns.push(column);
                values.push(Value::Text(v.clone()));
            }
        }

        let ids = [
            ("stage_id = ?", self.stage_id),
            ("term_id = ?", self.term_id),
            ("grade_id = ?", self.grade_id),
            ("subject_id = ?", self.subject_id),
            ("option_id = ?", self.option_id),
        ];
        for (column, update) in ids {
            if let Some(v) = update.as_value() {
                columns.push(column);
                values.push(v);
            }
        }

        (columns, values)
    }
}

const SELECT_CHAT: &str = "SELECT chat_id, username, first_name, status, stage_id, term_id, grade_id, subject_id, option_id, created_at, last_seen FROM chats WHERE chat_id = ?1";

impl Store {
    /// Returns the record for `chat_id`, or `None` if the chat was never seen.
    ///
    /// Never creates a record.
    pub fn get_chat(&self, chat_id: i64) -> AppResult<Option<ChatRecord>> {
        let conn = self.conn()?;
        Ok(select_chat(&conn, chat_id)?)
    }

    /// Inserts or updates the record for `chat_id` and returns it as stored.
    ///
    /// The insert, the field changes and the read-back run in one
    /// `BEGIN IMMEDIATE` transaction, so concurrent upserts of the same chat
    /// are applied one after another and never leave a half-written row.
    ///
    /// # Errors
    ///
    /// `AppError::StorageWrite` if the transaction does not commit; nothing is
    /// written in that case.
    pub fn upsert_chat(&self, chat_id: i64, fields: &ChatUpdate) -> AppResult<ChatRecord> {
        let mut conn = self.conn()?;
        write_chat(&mut conn, chat_id, fields).map_err(|source| {
            log::error!("Failed to upsert chat {}: {}", chat_id, source);
            AppError::StorageWrite { chat_id, source }
        })
    }

    /// Number of chats ever seen.
    pub fn chat_count(&self) -> AppResult<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))?)
    }
}

fn write_chat(conn: &mut Connection, chat_id: i64, fields: &ChatUpdate) -> rusqlite::Result<ChatRecord> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    tx.execute(
        "INSERT INTO chats (chat_id, status, created_at, last_seen) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(chat_id) DO UPDATE SET last_seen = excluded.last_seen",
        params![chat_id, DEFAULT_STATUS, now],
    )?;

    let (columns, mut values) = fields.assignments();
    if !columns.is_empty() {
        let sql = format!("UPDATE chats SET {} WHERE chat_id = ?", columns.join(", "));
        values.push(Value::Integer(chat_id));
        tx.execute(&sql, params_from_iter(values))?;
    }

    let record = select_chat(&tx, chat_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    tx.commit()?;
    Ok(record)
}

fn select_chat(conn: &Connection, chat_id: i64) -> rusqlite::Result<Option<ChatRecord>> {
    conn.query_row(SELECT_CHAT, params![chat_id], row_to_chat).optional()
}

fn row_to_chat(row: &Row<'_>) -> rusqlite::Result<ChatRecord> {
    Ok(ChatRecord {
        chat_id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        status: row.get(3)?,
        stage_id: row.get(4)?,
        term_id: row.get(5)?,
        grade_id: row.get(6)?,
        subject_id: row.get(7)?,
        option_id: row.get(8)?,
        created_at: timestamp(row, 9)?,
        last_seen: timestamp(row, 10)?,
    })
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
