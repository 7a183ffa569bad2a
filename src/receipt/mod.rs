//! Bid receipts: id generation, PDF rendering and the ledger copy.

pub mod ledger;
pub mod pdf;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use rand::Rng;
use serde::Serialize;

use crate::bid::signature::Signature;
use crate::logging::{error, info, obj, v_str, Domain};
use ledger::ReceiptLedger;

pub const FEE_PENCE: i64 = 50_000;
pub const FEE_CURRENCY: &str = "GBP";
pub const FEE_LINE: &str = "Amount Paid: £500.00 GBP (Bid Ratification Fee)";
const ID_UPPER: u32 = 10_000_000;
const ID_ATTEMPTS: usize = 8;

/// `BS-<n>` with `n` in `0..10_000_000`, no zero padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReceiptId(String);

impl ReceiptId {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(format!("BS-{}", rng.gen_range(0..ID_UPPER)))
    }

    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("BS-")?;
        let well_formed = (1..=7).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
        well_formed.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("BidSmith_Receipt_{}.pdf", self.0)
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Receipt {
    pub id: ReceiptId,
    pub issued_at: DateTime<Local>,
    pub signature: Signature,
}

impl Receipt {
    pub fn new(id: ReceiptId, signature: Signature) -> Self {
        Self {
            id,
            issued_at: Local::now(),
            signature,
        }
    }

    /// Day-first local timestamp, e.g. `19/10/2026, 14:03:07`.
    pub fn date_line(&self) -> String {
        format!("Date: {}", self.issued_at.format("%d/%m/%Y, %H:%M:%S"))
    }
}

/// Writes receipt PDFs into a directory and records each one in the ledger.
pub struct ReceiptIssuer {
    dir: PathBuf,
    ledger: Mutex<ReceiptLedger>,
}

impl ReceiptIssuer {
    pub fn new(dir: impl Into<PathBuf>, ledger: ReceiptLedger) -> Self {
        Self {
            dir: dir.into(),
            ledger: Mutex::new(ledger),
        }
    }

    pub fn open(dir: &Path, ledger_path: &Path) -> Result<Self> {
        let mut ledger = ReceiptLedger::open(ledger_path)?;
        ledger.init()?;
        Ok(Self::new(dir, ledger))
    }

    /// Draws an id not yet present in the ledger or on disk.
    pub fn next_id<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ReceiptId> {
        let ledger = self.ledger.lock().map_err(|_| anyhow!("ledger lock poisoned"))?;
        for _ in 0..ID_ATTEMPTS {
            let id = ReceiptId::generate(rng);
            if !ledger.contains(&id)? && !self.dir.join(id.file_name()).exists() {
                return Ok(id);
            }
        }
        Err(anyhow!("no free receipt id after {} attempts", ID_ATTEMPTS))
    }

    /// Claims the id in the ledger, then moves the rendered PDF into place.
    /// A failed write drops the ledger row again; an existing file is never replaced.
    pub fn issue(&self, receipt: &Receipt) -> Result<PathBuf> {
        let path = self.dir.join(receipt.id.file_name());
        if path.exists() {
            return Err(anyhow!("receipt file {} already exists", path.display()));
        }
        let bytes = pdf::render_receipt(receipt);

        let mut ledger = self.ledger.lock().map_err(|_| anyhow!("ledger lock poisoned"))?;
        ledger
            .record(receipt, &path)
            .with_context(|| format!("recording {}", receipt.id))?;

        if let Err(e) = self.write_pdf(&receipt.id, &path, &bytes) {
            if let Err(undo) = ledger.remove(&receipt.id) {
                error(
                    Domain::Receipt,
                    "receipt.undo_failed",
                    obj(&[("receipt_id", v_str(receipt.id.as_str())), ("msg", v_str(&undo.to_string()))]),
                );
            }
            return Err(e);
        }
        drop(ledger);

        info(
            Domain::Receipt,
            "receipt.issued",
            obj(&[
                ("receipt_id", v_str(receipt.id.as_str())),
                ("path", v_str(&path.to_string_lossy())),
                ("bytes", serde_json::json!(bytes.len())),
            ]),
        );
        Ok(path)
    }

    fn write_pdf(&self, id: &ReceiptId, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating receipt dir {}", self.dir.display()))?;
        let tmp = self.dir.join(format!(".{}.tmp", id.file_name()));
        let written = fs::write(&tmp, bytes)
            .with_context(|| format!("writing {}", tmp.display()))
            .and_then(|_| {
                if path.exists() {
                    return Err(anyhow!("receipt file {} already exists", path.display()));
                }
                fs::rename(&tmp, path).with_context(|| format!("moving {} into place", path.display()))
            });
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }

    pub fn ledger_count(&self) -> Result<u64> {
        self.ledger
            .lock()
            .map_err(|_| anyhow!("ledger lock poisoned"))?
            .count()
    }
}
