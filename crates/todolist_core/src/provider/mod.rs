//! Content-provider style façade over the `todo_items` table.
//!
//! # Responsibility
//! - Translate content addresses plus optional filters into SQL statements.
//! - Broadcast a change notification after every successful mutation.
//!
//! # Invariants
//! - A single-row address is merged into the filter as `id = {id}`, AND-ed
//!   with any caller filter, for query, update and delete alike.
//! - Unconditional deletes run with the always-true filter `1`.
//! - Inserts either yield the new row's address or fail; there is no
//!   "row zero" fallback.

pub mod address;
mod notify;
mod values;

pub use address::ContentAddress;
pub use notify::{ChangeNotifier, ChannelObserver, ContentObserver, ObserverId};
pub use values::ContentValues;

use crate::db::{open_db, open_db_in_memory, DbError, KEY_ID, KEY_TASK, TABLE_NAME};
use crossbeam::channel::Receiver;
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

const KNOWN_COLUMNS: &[&str] = &[KEY_ID, KEY_TASK];

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised by provider operations.
#[derive(Debug)]
pub enum ProviderError {
    /// The URI matches neither the collection nor the single-row pattern,
    /// or names a shape the operation does not accept.
    UnsupportedAddress(String),
    /// Storage assigned no id, so no row address can be produced.
    InsertFailed(String),
    UnknownColumn(String),
    /// Attempted to write the storage-assigned id.
    ImmutableColumn(String),
    EmptyValues,
    Db(DbError),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedAddress(uri) => write!(f, "unsupported URI: {uri}"),
            Self::InsertFailed(reason) => write!(f, "insert produced no row: {reason}"),
            Self::UnknownColumn(column) => write!(f, "unknown column `{column}`"),
            Self::ImmutableColumn(column) => write!(f, "column `{column}` cannot be written"),
            Self::EmptyValues => write!(f, "no values to write"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ProviderError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ProviderError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Optional SQL filter with positional (`?`) arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub clause: Option<String>,
    pub args: Vec<Value>,
}

impl Selection {
    /// No filter: every row addressed by the URI.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(clause: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            clause: Some(clause.into()),
            args,
        }
    }
}

/// Arguments of a provider query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Columns to return; `None` (or empty) returns all columns.
    pub projection: Option<Vec<String>>,
    pub selection: Selection,
    /// Raw `ORDER BY` expression.
    pub sort_order: Option<String>,
}

impl QueryRequest {
    pub fn all() -> Self {
        Self::default()
    }
}

/// Rows returned by a query, in the order SQLite produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<ContentValues>,
}

impl ResultSet {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn rows(&self) -> &[ContentValues] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// SQLite-backed to-do provider.
///
/// Owns its connection; share it across threads through `Arc`.
pub struct TodoProvider {
    conn: Mutex<Connection>,
    notifier: ChangeNotifier,
}

impl TodoProvider {
    /// Wraps a connection whose schema is already applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> ProviderResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> ProviderResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Closes the underlying connection, surfacing any close error.
    pub fn close(self) -> ProviderResult<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, err)| ProviderError::from(err))
    }

    pub fn register_observer(&self, observer: Arc<dyn ContentObserver>) -> ObserverId {
        self.notifier.register(observer)
    }

    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.notifier.unregister(id)
    }

    /// Registers a channel observer and hands back its receiving end.
    pub fn subscribe(&self) -> (ObserverId, Receiver<ContentAddress>) {
        let (observer, receiver) = ChannelObserver::new();
        (self.register_observer(Arc::new(observer)), receiver)
    }

    /// Returns the MIME type for a content URI.
    pub fn get_type(&self, uri: &str) -> ProviderResult<&'static str> {
        Ok(ContentAddress::parse(uri)?.content_type())
    }

    pub fn query(&self, uri: &str, request: &QueryRequest) -> ProviderResult<ResultSet> {
        let address = ContentAddress::parse(uri)?;
        let columns = resolve_projection(request.projection.as_deref())?;

        let mut sql = format!("SELECT {} FROM {TABLE_NAME}", columns.join(", "));
        if let Some(filter) = merge_selection(address, request.selection.clause.as_deref()) {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        if let Some(order) = request
            .sort_order
            .as_deref()
            .map(str::trim)
            .filter(|order| !order.is_empty())
        {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(request.selection.args.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut values = ContentValues::new();
                for (index, column) in columns.iter().enumerate() {
                    values.put(column.clone(), row.get::<_, Value>(index)?);
                }
                out.push(values);
            }
            Ok(out)
        })?;

        debug!(
            "event=provider_query module=provider status=ok uri={address} rows={}",
            rows.len()
        );
        Ok(ResultSet { columns, rows })
    }

    /// Inserts one row and returns its full content URI.
    pub fn insert(&self, uri: &str, values: &ContentValues) -> ProviderResult<String> {
        let address = ContentAddress::parse(uri)?;
        if address != ContentAddress::Collection {
            return Err(ProviderError::UnsupportedAddress(uri.to_string()));
        }
        validate_values(values)?;
        if values.is_empty() {
            return Err(ProviderError::InsertFailed("no values".to_string()));
        }

        let columns = values.keys().collect::<Vec<_>>();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {TABLE_NAME} ({}) VALUES ({placeholders});",
            columns.join(", ")
        );

        let id = self
            .with_conn(|conn| {
                conn.execute(&sql, params_from_iter(values.iter().map(|(_, value)| value)))?;
                Ok(conn.last_insert_rowid())
            })
            .map_err(|err| {
                warn!("event=provider_insert module=provider status=error error={err}");
                ProviderError::InsertFailed(err.to_string())
            })?;

        let inserted = ContentAddress::with_appended_id(id);
        debug!("event=provider_insert module=provider status=ok uri={inserted}");
        self.notifier.notify_change(&inserted);
        Ok(inserted.to_uri())
    }

    /// Updates rows matching the address and filter; returns the row count.
    pub fn update(
        &self,
        uri: &str,
        values: &ContentValues,
        selection: &Selection,
    ) -> ProviderResult<usize> {
        let address = ContentAddress::parse(uri)?;
        validate_values(values)?;
        if values.is_empty() {
            return Err(ProviderError::EmptyValues);
        }

        let assignments = values
            .keys()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {TABLE_NAME} SET {assignments}");
        if let Some(filter) = merge_selection(address, selection.clause.as_deref()) {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        let bind = values
            .iter()
            .map(|(_, value)| value)
            .chain(selection.args.iter());
        let count = self.with_conn(|conn| conn.execute(&sql, params_from_iter(bind)))?;

        debug!("event=provider_update module=provider status=ok uri={address} count={count}");
        self.notifier.notify_change(&address);
        Ok(count)
    }

    /// Deletes rows matching the address and filter; returns the row count.
    pub fn delete(&self, uri: &str, selection: &Selection) -> ProviderResult<usize> {
        let address = ContentAddress::parse(uri)?;
        let filter = merge_selection(address, selection.clause.as_deref())
            .unwrap_or_else(|| "1".to_string());
        let sql = format!("DELETE FROM {TABLE_NAME} WHERE {filter}");

        let count =
            self.with_conn(|conn| conn.execute(&sql, params_from_iter(selection.args.iter())))?;

        debug!("event=provider_delete module=provider status=ok uri={address} count={count}");
        self.notifier.notify_change(&address);
        Ok(count)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> ProviderResult<T> {
        // A panic while holding the lock cannot leave a statement half-applied.
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&*conn)?)
    }
}

fn resolve_projection(projection: Option<&[String]>) -> ProviderResult<Vec<String>> {
    match projection {
        Some(columns) if !columns.is_empty() => {
            for column in columns {
                if !KNOWN_COLUMNS.contains(&column.as_str()) {
                    return Err(ProviderError::UnknownColumn(column.clone()));
                }
            }
            Ok(columns.to_vec())
        }
        _ => Ok(KNOWN_COLUMNS.iter().map(|column| column.to_string()).collect()),
    }
}

fn validate_values(values: &ContentValues) -> ProviderResult<()> {
    for column in values.keys() {
        if column == KEY_ID {
            return Err(ProviderError::ImmutableColumn(column.to_string()));
        }
        if !KNOWN_COLUMNS.contains(&column) {
            return Err(ProviderError::UnknownColumn(column.to_string()));
        }
    }
    Ok(())
}

fn merge_selection(address: ContentAddress, clause: Option<&str>) -> Option<String> {
    let clause = clause.map(str::trim).filter(|clause| !clause.is_empty());
    match (address, clause) {
        (ContentAddress::Collection, clause) => clause.map(str::to_string),
        (ContentAddress::Item(id), None) => Some(format!("{KEY_ID} = {id}")),
        (ContentAddress::Item(id), Some(clause)) => {
            Some(format!("{KEY_ID} = {id} AND ({clause})"))
        }
    }
}
