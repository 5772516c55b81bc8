//! Append-only, hash-chained ledger of published audit hashes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CovenantError;
use crate::CovenantResult;

/// `prev_hash` of the first entry.
pub const GENESIS: &str = "GENESIS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 1-based, contiguous
    pub sequence: u64,
    pub prev_hash: String,
    pub loan_id: String,
    pub month: String,
    pub audit_hash: String,
    pub recorded_at: DateTime<Utc>,
    pub entry_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries loaded from storage. Call `verify` before trusting them.
    pub fn from_entries(entries: Vec<AuditEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, loan_id: &str, month: &str, audit_hash: &str) -> &AuditEntry {
        self.append_at(loan_id, month, audit_hash, Utc::now())
    }

    pub fn append_at(
        &mut self,
        loan_id: &str,
        month: &str,
        audit_hash: &str,
        recorded_at: DateTime<Utc>,
    ) -> &AuditEntry {
        let mut entry = AuditEntry {
            sequence: self.entries.len() as u64 + 1,
            prev_hash: self.head().to_string(),
            loan_id: loan_id.to_string(),
            month: month.to_string(),
            audit_hash: audit_hash.to_string(),
            recorded_at,
            entry_hash: String::new(),
        };
        entry.entry_hash = entry_hash(&entry);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Hash of the newest entry, or `GENESIS` when empty.
    pub fn head(&self) -> &str {
        self.entries
            .last()
            .map(|e| e.entry_hash.as_str())
            .unwrap_or(GENESIS)
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check links, entry digests and sequence numbers from genesis onward.
    pub fn verify(&self) -> CovenantResult<()> {
        let mut prev_hash = GENESIS;
        for (i, entry) in self.entries.iter().enumerate() {
            let expected_seq = i as u64 + 1;
            if entry.sequence != expected_seq {
                return Err(CovenantError::AuditChainBroken {
                    sequence: entry.sequence,
                    reason: format!("expected sequence {expected_seq}"),
                });
            }
            if entry.prev_hash != prev_hash {
                return Err(CovenantError::AuditChainBroken {
                    sequence: entry.sequence,
                    reason: format!(
                        "prev_hash '{}' does not link to '{}'",
                        entry.prev_hash, prev_hash
                    ),
                });
            }
            let calculated = entry_hash(entry);
            if entry.entry_hash != calculated {
                return Err(CovenantError::AuditChainBroken {
                    sequence: entry.sequence,
                    reason: "entry content does not match its hash".into(),
                });
            }
            prev_hash = entry.entry_hash.as_str();
        }
        Ok(())
    }
}

/// SHA-256 over every field except `entry_hash`, unit-separated.
pub fn entry_hash(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.sequence.to_le_bytes());
    for part in [
        entry.prev_hash.as_str(),
        entry.loan_id.as_str(),
        entry.month.as_str(),
        entry.audit_hash.as_str(),
    ] {
        hasher.update(b"\x1f");
        hasher.update(part.as_bytes());
    }
    hasher.update(b"\x1f");
    hasher.update(entry.recorded_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}
