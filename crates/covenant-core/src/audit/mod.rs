pub mod hash;
pub mod trail;

pub use hash::{
    audit_hash, canonical_form, verify_audit, verify_audit_hash, AuditRecord, AuditVerification,
    AuditVerificationInput,
};
pub use trail::{AuditEntry, AuditTrail, GENESIS};
