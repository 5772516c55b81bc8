//! Reproducible SHA-256 digests over a simulation's inputs and outputs.
//!
//! The digest is taken over a canonical text rendering rather than over JSON
//! so that field order and decimal formatting are fixed independently of any
//! serializer: `4.50` and `4.5` hash identically, and a verifier in another
//! language only has to reproduce `canonical_form`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::time::Instant;

use crate::error::CovenantError;
use crate::types::*;
use crate::CovenantResult;

/// First line of every canonical form. Bump when the layout changes.
pub const AUDIT_SCHEMA: &str = "covenant-audit/1";

/// Everything a simulation consumed and the figures it published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub financial: MonthlyFinancials,
    pub esg: EsgMetrics,
    pub terms: LoanTerms,
    /// Prior periods, oldest first, excluding the current one
    #[serde(default)]
    pub ebitda_history: Vec<Money>,
    pub final_rate: Percent,
    pub risk_score: Decimal,
    pub is_compliant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditVerificationInput {
    pub record: AuditRecord,
    pub audit_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditVerification {
    pub expected: String,
    pub computed: String,
    pub matches: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The exact text that is hashed: one `key=value` line per field, in fixed
/// order, with normalized decimals and `null` for absent options.
pub fn canonical_form(record: &AuditRecord) -> String {
    let mut c = Canonical::default();
    c.line("schema", AUDIT_SCHEMA);

    let f = &record.financial;
    c.decimal("financial.revenue", f.revenue);
    c.decimal("financial.ebitda", f.ebitda);
    c.decimal("financial.debt", f.debt);
    c.decimal("financial.cash_reserves", f.cash_reserves);

    c.decimal("esg.carbon_emissions", record.esg.carbon_emissions);
    c.opt_decimal("esg.diversity_score", record.esg.diversity_score);

    let t = &record.terms;
    c.decimal("terms.base_rate", t.base_rate);
    c.decimal("terms.base_margin", t.base_margin);
    let cov = &t.covenants;
    c.decimal("covenants.max_leverage_ratio", cov.max_leverage_ratio);
    c.decimal("covenants.esg_target", cov.esg_target);
    c.decimal("covenants.sustainability_discount", cov.sustainability_discount);
    c.decimal("covenants.sustainability_penalty", cov.sustainability_penalty);
    c.decimal("covenants.default_risk_premium", cov.default_risk_premium);

    c.line("ebitda_history.len", record.ebitda_history.len());
    for (i, v) in record.ebitda_history.iter().enumerate() {
        c.decimal(&format!("ebitda_history[{i}]"), *v);
    }

    c.decimal("result.final_rate", record.final_rate);
    c.decimal("result.risk_score", record.risk_score);
    c.line("result.is_compliant", record.is_compliant);

    c.buf
}

/// Lowercase hex SHA-256 of `canonical_form`.
pub fn audit_hash(record: &AuditRecord) -> String {
    hex::encode(Sha256::digest(canonical_form(record).as_bytes()))
}

/// Recompute the digest and compare it with a previously published one.
pub fn verify_audit_hash(record: &AuditRecord, expected: &str) -> bool {
    audit_hash(record).eq_ignore_ascii_case(expected.trim())
}

/// Envelope form of `verify_audit_hash` for third-party verification.
pub fn verify_audit(
    input: &AuditVerificationInput,
) -> CovenantResult<ComputationOutput<AuditVerification>> {
    let start = Instant::now();

    let expected = input.audit_hash.trim().to_ascii_lowercase();
    if expected.len() != 64 || !expected.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CovenantError::invalid(
            "audit_hash",
            "Expected a 64-character hex SHA-256 digest.",
        ));
    }

    let computed = audit_hash(&input.record);
    let matches = computed == expected;
    let mut warnings = Vec::new();
    if !matches {
        warnings.push(
            "Digest mismatch: the record differs from the one that was originally hashed.".into(),
        );
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "schema": AUDIT_SCHEMA,
        "digest": "sha256(canonical_form)",
    });

    Ok(with_metadata(
        "Audit Hash Verification",
        &assumptions,
        warnings,
        elapsed,
        AuditVerification {
            expected,
            computed,
            matches,
        },
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Canonical {
    buf: String,
}

impl Canonical {
    fn line(&mut self, key: &str, value: impl Display) {
        self.buf.push_str(key);
        self.buf.push('=');
        self.buf.push_str(&value.to_string());
        self.buf.push('\n');
    }

    fn decimal(&mut self, key: &str, value: Decimal) {
        self.line(key, value.normalize());
    }

    fn opt_decimal(&mut self, key: &str, value: Option<Decimal>) {
        match value {
            Some(v) => self.decimal(key, v),
            None => self.line(key, "null"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
