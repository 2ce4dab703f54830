//! [`SqliteInventory`], the SQLite implementation of [`Inventory`].

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};

use super::schema::{ADDED_COLUMNS, SCHEMA};
use super::{
    ConnectivityStatus, Inventory, InventoryTx, NewSession, Result, SessionId, SessionRecord,
    SessionUpdate,
};
use crate::error::InventoryError;

const COLUMNS: &str = "id, neighbor_address, remote_as, local_as, local_address, description, \
                       device_identifier, device_vendor, connectivity, session_state, last_updated";

/// How long a transaction waits for another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Inventory backed by a single SQLite file.
///
/// Transactions are opened `IMMEDIATE`, so the write lock is taken before
/// the first lookup and a find-then-write sequence cannot interleave with
/// another writer. Cloning is cheap; clones share the connection thread.
#[derive(Clone)]
pub struct SqliteInventory {
    conn: tokio_rusqlite::Connection,
}

impl SqliteInventory {
    /// Open (or create) an inventory at `path`, upgrading older tables.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let inventory = Self { conn };
        inventory.init_schema().await?;
        Ok(inventory)
    }

    /// Open an in-memory inventory, useful for testing.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let inventory = Self { conn };
        inventory.init_schema().await?;
        Ok(inventory)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn.execute_batch(SCHEMA)?;
                ensure_columns(conn)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

/// Add columns that databases from earlier releases lack.
fn ensure_columns(conn: &Connection) -> rusqlite::Result<()> {
    let existing: HashSet<String> = {
        let mut stmt = conn.prepare("PRAGMA table_info(bgp_sessions)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<_>>()?;
        names
    };

    for (name, definition) in ADDED_COLUMNS {
        if !existing.contains(*name) {
            info!("adding missing column '{}' to bgp_sessions", name);
            conn.execute_batch(&format!(
                "ALTER TABLE bgp_sessions ADD COLUMN {} {}",
                name, definition
            ))?;
        }
    }
    Ok(())
}

impl Inventory for SqliteInventory {
    async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn InventoryTx) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        // Dropping the transaction without commit rolls it back
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let outcome = f(&mut SqliteTx { conn: &tx });
                if outcome.is_ok() {
                    tx.commit()?;
                }
                Ok(outcome)
            })
            .await?;
        outcome
    }
}

struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl InventoryTx for SqliteTx<'_> {
    fn find_by_neighbor_address(&mut self, neighbor_address: &str) -> Result<Option<SessionRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM bgp_sessions WHERE neighbor_address = ?1", COLUMNS),
                params![neighbor_address],
                RawSession::from_row,
            )
            .optional()?;
        raw.map(RawSession::into_record).transpose()
    }

    fn insert(&mut self, session: &NewSession) -> Result<SessionId> {
        self.conn
            .execute(
                "INSERT INTO bgp_sessions (
                   neighbor_address, remote_as, local_as, local_address, description,
                   device_identifier, device_vendor, connectivity, session_state, last_updated
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    session.neighbor_address,
                    session.remote_as,
                    session.local_as,
                    session.local_address,
                    session.description,
                    session.device_identifier,
                    session.device_vendor,
                    session.connectivity.as_str(),
                    session.session_state,
                    encode_dt(session.last_updated),
                ],
            )
            .map_err(|e| conflict_or_database(e, &session.neighbor_address))?;
        Ok(SessionId(self.conn.last_insert_rowid()))
    }

    fn update(&mut self, id: SessionId, update: &SessionUpdate) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE bgp_sessions SET
               remote_as = ?1, local_as = ?2, local_address = ?3, device_identifier = ?4,
               device_vendor = ?5, connectivity = ?6, session_state = ?7, last_updated = ?8
             WHERE id = ?9",
            params![
                update.remote_as,
                update.local_as,
                update.local_address,
                update.device_identifier,
                update.device_vendor,
                update.connectivity.as_str(),
                update.session_state,
                encode_dt(update.last_updated),
                id.0,
            ],
        )?;
        if changed == 0 {
            return Err(InventoryError::NotFound(id));
        }
        Ok(())
    }

    fn delete(&mut self, id: SessionId) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM bgp_sessions WHERE id = ?1", params![id.0])?;
        Ok(changed > 0)
    }

    fn list_all(&mut self) -> Result<Vec<SessionRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM bgp_sessions ORDER BY id", COLUMNS))?;
        let raws = stmt
            .query_map([], RawSession::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawSession::into_record).collect()
    }

    fn list_device_identifiers(&mut self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT device_identifier FROM bgp_sessions ORDER BY device_identifier",
        )?;
        let devices = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(devices)
    }
}

fn conflict_or_database(error: rusqlite::Error, neighbor_address: &str) -> InventoryError {
    match error {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            InventoryError::Conflict {
                neighbor_address: neighbor_address.to_string(),
            }
        }
        other => InventoryError::Database(other),
    }
}

fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| InventoryError::Corrupt(format!("last_updated '{}': {}", s, e)))
}

/// A row as stored, before text columns are decoded.
struct RawSession {
    id: i64,
    neighbor_address: String,
    remote_as: u32,
    local_as: u32,
    local_address: String,
    description: String,
    device_identifier: String,
    device_vendor: String,
    connectivity: String,
    session_state: String,
    last_updated: String,
}

impl RawSession {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            neighbor_address: row.get(1)?,
            remote_as: row.get(2)?,
            local_as: row.get(3)?,
            local_address: row.get(4)?,
            description: row.get(5)?,
            device_identifier: row.get(6)?,
            device_vendor: row.get(7)?,
            connectivity: row.get(8)?,
            session_state: row.get(9)?,
            last_updated: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<SessionRecord> {
        Ok(SessionRecord {
            id: SessionId(self.id),
            connectivity: self.connectivity.parse::<ConnectivityStatus>()?,
            last_updated: decode_dt(&self.last_updated)?,
            neighbor_address: self.neighbor_address,
            remote_as: self.remote_as,
            local_as: self.local_as,
            local_address: self.local_address,
            description: self.description,
            device_identifier: self.device_identifier,
            device_vendor: self.device_vendor,
            session_state: self.session_state,
        })
    }
}
