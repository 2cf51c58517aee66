//! SQLite fulfillment ledger: commit-once bookkeeping keyed by claim id.
//!
//! A fulfillment backend records its effect here before acting; a retried
//! commit for the same claim id comes back as [RecordOutcome::Duplicate]
//! with the previously stored outcome, so the effect is applied exactly
//! once downstream. Rows are acknowledged when the claim's result has been
//! delivered; unacknowledged rows survive a crash and are swept at startup.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use claims_engine::AccountId;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("ledger lock poisoned")]
    Poisoned,
}

/// Outcome of a record attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First commit for this claim id; the effect should be applied.
    Applied,
    /// A commit for this claim id already exists; re-report its outcome
    /// instead of re-applying the effect.
    Duplicate(String),
}

/// One committed fulfillment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub claim_id: String,
    pub account_id: AccountId,
    pub kind: String,
    pub outcome_json: String,
    pub acknowledged: bool,
}

#[derive(Clone)]
pub struct FulfillmentLedger {
    conn: Arc<Mutex<Connection>>,
}

impl FulfillmentLedger {
    pub fn open(db_path: &str) -> Result<Self, LedgerError> {
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, LedgerError> {
        let this = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        this.ensure_schema()?;
        Ok(this)
    }

    fn ensure_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS fulfillment_ledger (
              claim_id TEXT PRIMARY KEY,
              account_id INTEGER NOT NULL,
              kind TEXT NOT NULL,
              outcome_json TEXT NOT NULL,
              acknowledged INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// Records the commit for `claim_id` once. A second call with the same
    /// id leaves the stored row untouched and returns its outcome.
    pub fn record(
        &self,
        claim_id: &str,
        account_id: AccountId,
        kind: &str,
        outcome_json: &str,
    ) -> Result<RecordOutcome, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO fulfillment_ledger
             (claim_id, account_id, kind, outcome_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![claim_id, account_id as i64, kind, outcome_json],
        )?;
        if inserted == 1 {
            return Ok(RecordOutcome::Applied);
        }
        let prior: String = conn.query_row(
            "SELECT outcome_json FROM fulfillment_ledger WHERE claim_id = ?1",
            params![claim_id],
            |row| row.get(0),
        )?;
        Ok(RecordOutcome::Duplicate(prior))
    }

    /// Marks a commit as acknowledged (its result reached the caller).
    pub fn acknowledge(&self, claim_id: &str) -> Result<(), LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        conn.execute(
            "UPDATE fulfillment_ledger SET acknowledged = 1 WHERE claim_id = ?1",
            params![claim_id],
        )?;
        Ok(())
    }

    pub fn get(&self, claim_id: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let entry = conn
            .query_row(
                "SELECT claim_id, account_id, kind, outcome_json, acknowledged
                 FROM fulfillment_ledger WHERE claim_id = ?1",
                params![claim_id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Commits whose result never reached the caller (crash between commit
    /// and notification).
    pub fn unacknowledged(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT claim_id, account_id, kind, outcome_json, acknowledged
             FROM fulfillment_ledger WHERE acknowledged = 0 ORDER BY claim_id",
        )?;
        let rows = stmt.query_map([], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let account_id: i64 = row.get(1)?;
    let acknowledged: i64 = row.get(4)?;
    Ok(LedgerEntry {
        claim_id: row.get(0)?,
        account_id: account_id as AccountId,
        kind: row.get(2)?,
        outcome_json: row.get(3)?,
        acknowledged: acknowledged != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_applies_second_is_duplicate() {
        let ledger = FulfillmentLedger::in_memory().unwrap();
        let outcome = ledger
            .record("claim-000001", 1, "rename", r#"{"committed":true}"#)
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Applied);

        let outcome = ledger
            .record("claim-000001", 1, "rename", r#"{"committed":false}"#)
            .unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Duplicate(r#"{"committed":true}"#.to_string())
        );
    }

    #[test]
    fn acknowledge_clears_the_row_from_the_sweep() {
        let ledger = FulfillmentLedger::in_memory().unwrap();
        ledger
            .record("claim-000001", 1, "rename", r#"{"committed":true}"#)
            .unwrap();
        ledger
            .record("claim-000002", 2, "slot", r#"{"committed":true}"#)
            .unwrap();
        ledger.acknowledge("claim-000001").unwrap();

        let pending = ledger.unacknowledged().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].claim_id, "claim-000002");
        assert!(!pending[0].acknowledged);
    }

    #[test]
    fn get_returns_the_stored_entry() {
        let ledger = FulfillmentLedger::in_memory().unwrap();
        ledger
            .record("claim-000003", 9, "respec", r#"{"committed":true}"#)
            .unwrap();
        let entry = ledger.get("claim-000003").unwrap().expect("entry exists");
        assert_eq!(entry.account_id, 9);
        assert_eq!(entry.kind, "respec");
        assert!(ledger.get("claim-999999").unwrap().is_none());
    }

    #[test]
    fn ledger_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();

        {
            let ledger = FulfillmentLedger::open(path).unwrap();
            ledger
                .record("claim-000001", 1, "rename", r#"{"committed":true}"#)
                .unwrap();
        }

        let reopened = FulfillmentLedger::open(path).unwrap();
        assert_eq!(reopened.unacknowledged().unwrap().len(), 1);
    }
}
