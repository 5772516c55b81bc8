//! Capabilities the monitor consumes, and in-process implementations of each.
//!
//! Deployments swap these for database, queue or shared-cache backed
//! versions; the engine never sees anything but the traits.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::audit::{AuditEntry, AuditTrail};
use crate::error::CovenantError;
use crate::risk::RiskTier;
use crate::simulation::{LoanContext, SimulationResult};
use crate::types::*;
use crate::CovenantResult;

// ---------------------------------------------------------------------------
// Domain records
// ---------------------------------------------------------------------------

/// A facility as the loan book knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: String,
    pub borrower_name: String,
    pub facility_amount: Money,
    #[serde(default)]
    pub terms: LoanTerms,
    /// Reported EBITDA, oldest first
    #[serde(default)]
    pub ebitda_history: Vec<Money>,
}

impl From<LoanRecord> for LoanContext {
    fn from(record: LoanRecord) -> Self {
        Self {
            terms: record.terms,
            ebitda_history: record.ebitda_history,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachType {
    FinancialCovenant,
    EsgTarget,
    HighDefaultRisk,
}

/// Raised when a loan's compliance flips to false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachNotice {
    pub loan_id: String,
    pub month: String,
    pub breaches: Vec<BreachType>,
    pub new_interest_rate: Decimal,
    pub audit_hash: String,
    pub message: String,
}

impl BreachNotice {
    pub fn from_result(loan_id: &str, month: &str, result: &SimulationResult) -> Self {
        let mut breaches = Vec::new();
        if !result.covenants.financial_covenant_met {
            breaches.push(BreachType::FinancialCovenant);
        }
        if !result.covenants.esg_target_met {
            breaches.push(BreachType::EsgTarget);
        }
        if result.risk_tier == RiskTier::High {
            breaches.push(BreachType::HighDefaultRisk);
        }
        Self {
            loan_id: loan_id.to_string(),
            month: month.to_string(),
            breaches,
            new_interest_rate: result.new_interest_rate,
            audit_hash: result.audit_hash.clone(),
            message: result.message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Loan terms lookup. Failures must surface as `UpstreamUnavailable` or
/// `UnknownLoan`, never as default terms.
pub trait LoanTermsSource: Send + Sync {
    fn loan(&self, loan_id: &str) -> CovenantResult<LoanRecord>;
}

/// Persists simulation results for later audit.
pub trait AuditSink: Send + Sync {
    fn record(&self, loan_id: &str, month: &str, result: &SimulationResult) -> CovenantResult<()>;
}

pub trait BreachNotifier: Send + Sync {
    fn notify(&self, notice: &BreachNotice) -> CovenantResult<()>;
}

pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> bool;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InMemoryLoanBook {
    loans: HashMap<String, LoanRecord>,
}

impl InMemoryLoanBook {
    pub fn new(records: impl IntoIterator<Item = LoanRecord>) -> Self {
        Self {
            loans: records
                .into_iter()
                .map(|r| (r.loan_id.clone(), r))
                .collect(),
        }
    }

    pub fn insert(&mut self, record: LoanRecord) {
        self.loans.insert(record.loan_id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }
}

impl LoanTermsSource for InMemoryLoanBook {
    fn loan(&self, loan_id: &str) -> CovenantResult<LoanRecord> {
        self.loans
            .get(loan_id)
            .cloned()
            .ok_or_else(|| CovenantError::UnknownLoan(loan_id.to_string()))
    }
}

/// Audit sink that chains every published hash into an `AuditTrail`.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    trail: Mutex<AuditTrail>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.trail.lock().entries().to_vec()
    }

    pub fn head(&self) -> String {
        self.trail.lock().head().to_string()
    }

    pub fn verify(&self) -> CovenantResult<()> {
        self.trail.lock().verify()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, loan_id: &str, month: &str, result: &SimulationResult) -> CovenantResult<()> {
        self.trail.lock().append(loan_id, month, &result.audit_hash);
        Ok(())
    }
}

/// Notifier that keeps notices for a later delivery pass.
#[derive(Debug, Default)]
pub struct NotificationOutbox {
    notices: Mutex<Vec<BreachNotice>>,
}

impl NotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<BreachNotice> {
        self.notices.lock().clone()
    }

    /// Take every pending notice, leaving the outbox empty.
    pub fn drain(&self) -> Vec<BreachNotice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl BreachNotifier for NotificationOutbox {
    fn notify(&self, notice: &BreachNotice) -> CovenantResult<()> {
        self.notices.lock().push(notice.clone());
        Ok(())
    }
}

/// Allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn allow(&self, _key: &str) -> bool {
        true
    }
}
