//! SQLite-backed decision cache.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    Decision, DecisionCacheEntry, DecisionDocument, DecisionStats, DecisionStore,
    DecisionStoreError,
};

/// Row as stored: (searchee_name, guid, decision, info_hash, first_seen, last_seen).
type RawRow = (String, String, String, Option<String>, i64, i64);

/// SQLite-backed decision cache.
///
/// One connection behind a mutex: all writers are serialised, and every
/// mutation is committed in its own transaction before returning.
pub struct SqliteDecisionStore {
    conn: Mutex<Connection>,
}

impl SqliteDecisionStore {
    /// Open (or create) the decision database at `path`.
    pub fn open(path: &Path) -> Result<Self, DecisionStoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, DecisionStoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Close the underlying connection, surfacing any final I/O error.
    pub fn close(self) -> Result<(), DecisionStoreError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| DecisionStoreError::Internal("decision store lock poisoned".to_string()))?;
        conn.close().map_err(|(_, e)| e.into())
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DecisionStoreError> {
        conn.execute_batch(
            r#"
            -- Last decision per (searchee, candidate guid); timestamps are epoch ms
            CREATE TABLE IF NOT EXISTS decisions (
                searchee_name TEXT NOT NULL,
                guid TEXT NOT NULL,
                decision TEXT NOT NULL,
                info_hash TEXT,
                first_seen INTEGER NOT NULL,
                last_seen INTEGER NOT NULL,
                PRIMARY KEY (searchee_name, guid)
            );

            CREATE INDEX IF NOT EXISTS idx_decisions_info_hash ON decisions(info_hash);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DecisionStoreError> {
        self.conn
            .lock()
            .map_err(|_| DecisionStoreError::Internal("decision store lock poisoned".to_string()))
    }

    fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn raw_to_entry(raw: RawRow) -> Result<(String, String, DecisionCacheEntry), DecisionStoreError> {
        let (searchee, guid, decision, info_hash, first_seen, last_seen) = raw;
        let entry = DecisionCacheEntry {
            decision: decision.parse::<Decision>()?,
            first_seen: millis_to_datetime(first_seen)?,
            last_seen: millis_to_datetime(last_seen)?,
            info_hash,
        };
        Ok((searchee, guid, entry))
    }

    fn select_all(
        conn: &Connection,
        filter: Option<&str>,
    ) -> Result<Vec<(String, String, DecisionCacheEntry)>, DecisionStoreError> {
        let sql = "SELECT searchee_name, guid, decision, info_hash, first_seen, last_seen
                   FROM decisions WHERE (?1 IS NULL OR searchee_name = ?1)
                   ORDER BY searchee_name, guid";
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![filter], Self::row_to_raw)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(Self::raw_to_entry(row?)?);
        }
        Ok(entries)
    }
}

/// A v1 info hash: 40 hex digits.
fn is_info_hash(value: &str) -> bool {
    value.len() == 40 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, DecisionStoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DecisionStoreError::Corrupt(format!("timestamp out of range: {}", ms)))
}

impl DecisionStore for SqliteDecisionStore {
    fn get(
        &self,
        searchee: &str,
        guid: &str,
    ) -> Result<Option<DecisionCacheEntry>, DecisionStoreError> {
        let conn = self.lock()?;

        let raw = conn
            .query_row(
                "SELECT searchee_name, guid, decision, info_hash, first_seen, last_seen
                 FROM decisions WHERE searchee_name = ? AND guid = ?",
                params![searchee, guid],
                Self::row_to_raw,
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(Self::raw_to_entry(raw)?.2)),
            None => Ok(None),
        }
    }

    fn put(
        &self,
        searchee: &str,
        guid: &str,
        entry: &DecisionCacheEntry,
    ) -> Result<(), DecisionStoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // first_seen is only written on insert
        tx.execute(
            "INSERT INTO decisions (searchee_name, guid, decision, info_hash, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(searchee_name, guid) DO UPDATE SET
                decision = excluded.decision,
                info_hash = COALESCE(excluded.info_hash, decisions.info_hash),
                last_seen = MAX(excluded.last_seen, decisions.first_seen)",
            params![
                searchee,
                guid,
                entry.decision.as_str(),
                &entry.info_hash,
                entry.first_seen.timestamp_millis(),
                entry.last_seen.timestamp_millis(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn entries_for(
        &self,
        searchee: &str,
    ) -> Result<BTreeMap<String, DecisionCacheEntry>, DecisionStoreError> {
        let conn = self.lock()?;
        Ok(Self::select_all(&conn, Some(searchee))?
            .into_iter()
            .map(|(_, guid, entry)| (guid, entry))
            .collect())
    }

    fn export(&self) -> Result<DecisionDocument, DecisionStoreError> {
        let conn = self.lock()?;
        let mut document = DecisionDocument::new();
        for (searchee, guid, entry) in Self::select_all(&conn, None)? {
            document.entry(searchee).or_default().insert(guid, entry);
        }
        Ok(document)
    }

    fn import(&self, document: &DecisionDocument) -> Result<u64, DecisionStoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut added = 0u64;

        for (searchee, entries) in document {
            for (guid, entry) in entries {
                if entry.decision == Decision::Match && entry.info_hash.is_none() {
                    return Err(DecisionStoreError::Corrupt(format!(
                        "MATCH entry without info hash: {} / {}",
                        searchee, guid
                    )));
                }
                if let Some(hash) = entry.info_hash.as_deref().filter(|h| !is_info_hash(h)) {
                    return Err(DecisionStoreError::Corrupt(format!(
                        "invalid info hash {:?}: {} / {}",
                        hash, searchee, guid
                    )));
                }
                let last_seen = entry.last_seen.max(entry.first_seen);
                added += tx.execute(
                    "INSERT OR IGNORE INTO decisions
                        (searchee_name, guid, decision, info_hash, first_seen, last_seen)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        searchee,
                        guid,
                        entry.decision.as_str(),
                        entry.info_hash.as_ref().map(|h| h.to_lowercase()),
                        entry.first_seen.timestamp_millis(),
                        last_seen.timestamp_millis(),
                    ],
                )? as u64;
            }
        }

        tx.commit()?;
        Ok(added)
    }

    fn stats(&self) -> Result<DecisionStats, DecisionStoreError> {
        let conn = self.lock()?;

        let (total_entries, searchees): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT searchee_name) FROM decisions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt =
            conn.prepare("SELECT decision, COUNT(*) FROM decisions GROUP BY decision")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut by_decision = BTreeMap::new();
        for row in rows {
            let (decision, count) = row?;
            by_decision.insert(decision, count as u64);
        }

        Ok(DecisionStats {
            total_entries: total_entries as u64,
            searchees: searchees as u64,
            by_decision,
        })
    }
}
