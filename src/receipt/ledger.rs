use std::path::Path;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Receipt, ReceiptId, FEE_CURRENCY, FEE_PENCE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: String,
    pub issued_at: String,
    pub amount_pence: i64,
    pub currency: String,
    pub signature_sha256: String,
    pub path: String,
}

/// SQLite copy of every issued receipt.
pub struct ReceiptLedger {
    conn: Connection,
}

impl ReceiptLedger {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS receipts (
                id TEXT PRIMARY KEY,
                issued_at TEXT NOT NULL,
                amount_pence INTEGER NOT NULL,
                currency TEXT NOT NULL,
                signature_sha256 TEXT NOT NULL,
                path TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn record(&mut self, receipt: &Receipt, path: &Path) -> Result<()> {
        self.conn.execute(
            "INSERT INTO receipts (id, issued_at, amount_pence, currency, signature_sha256, path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                receipt.id.as_str(),
                receipt.issued_at.to_rfc3339(),
                FEE_PENCE,
                FEE_CURRENCY,
                receipt.signature.digest(),
                path.to_string_lossy(),
            ],
        )?;
        Ok(())
    }

    pub fn remove(&mut self, id: &ReceiptId) -> Result<()> {
        self.conn.execute("DELETE FROM receipts WHERE id = ?1", params![id.as_str()])?;
        Ok(())
    }

    pub fn contains(&self, id: &ReceiptId) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM receipts WHERE id = ?1", params![id.as_str()], |r| r.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get(&self, id: &ReceiptId) -> Result<Option<LedgerEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, issued_at, amount_pence, currency, signature_sha256, path
                 FROM receipts WHERE id = ?1",
                params![id.as_str()],
                |r| {
                    Ok(LedgerEntry {
                        id: r.get(0)?,
                        issued_at: r.get(1)?,
                        amount_pence: r.get(2)?,
                        currency: r.get(3)?,
                        signature_sha256: r.get(4)?,
                        path: r.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM receipts", [], |r| r.get(0))?;
        Ok(n as u64)
    }
}
