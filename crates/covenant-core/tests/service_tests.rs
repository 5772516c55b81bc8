#![cfg(feature = "service")]

use covenant_core::service::*;
use covenant_core::simulation::{CalculateRateRequest, SimulationResult};
use covenant_core::{CovenantError, CovenantResult, EsgMetrics, LoanTerms, MonthlyFinancials};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

// ===========================================================================
// Fixtures
// ===========================================================================

struct Harness {
    monitor: CovenantMonitor,
    audit: Arc<InMemoryAuditLog>,
    outbox: Arc<NotificationOutbox>,
}

fn ecocorp() -> LoanRecord {
    LoanRecord {
        loan_id: "ECO-001".into(),
        borrower_name: "EcoCorp Industries".into(),
        facility_amount: dec!(50_000_000),
        terms: LoanTerms::default(),
        ebitda_history: vec![dec!(34_000_000), dec!(34_500_000)],
    }
}

fn harness(limiter: Arc<dyn RateLimiter>) -> Harness {
    let audit = Arc::new(InMemoryAuditLog::new());
    let outbox = Arc::new(NotificationOutbox::new());
    let monitor = CovenantMonitor::new(
        Arc::new(InMemoryLoanBook::new(vec![ecocorp()])),
        audit.clone(),
        outbox.clone(),
        limiter,
    );
    Harness {
        monitor,
        audit,
        outbox,
    }
}

fn submission(month: &str, debt: Decimal, carbon: Decimal) -> CalculateRateRequest {
    CalculateRateRequest {
        financial: MonthlyFinancials {
            revenue: dec!(125_000_000),
            ebitda: dec!(35_000_000),
            debt,
            cash_reserves: dec!(15_000_000),
        },
        esg: EsgMetrics {
            carbon_emissions: carbon,
            diversity_score: None,
        },
        month: month.into(),
        ebitda_history: vec![],
    }
}

struct DownstreamOutage;

impl LoanTermsSource for DownstreamOutage {
    fn loan(&self, _loan_id: &str) -> CovenantResult<LoanRecord> {
        Err(CovenantError::UpstreamUnavailable {
            service: "loan-book".into(),
            reason: "connection refused".into(),
        })
    }
}

impl AuditSink for DownstreamOutage {
    fn record(&self, _: &str, _: &str, _: &SimulationResult) -> CovenantResult<()> {
        Err(CovenantError::UpstreamUnavailable {
            service: "audit-store".into(),
            reason: "timeout".into(),
        })
    }
}

impl BreachNotifier for DownstreamOutage {
    fn notify(&self, _: &BreachNotice) -> CovenantResult<()> {
        Err(CovenantError::UpstreamUnavailable {
            service: "mailer".into(),
            reason: "timeout".into(),
        })
    }
}

// ===========================================================================
// Monitor flow
// ===========================================================================

#[test]
fn test_compliant_period_is_recorded_without_notice() {
    let h = harness(Arc::new(Unlimited));
    let r = h
        .monitor
        .evaluate("client-a", "ECO-001", &submission("January", dec!(120_000_000), dec!(180)))
        .unwrap();
    assert!(r.is_compliant);
    assert_eq!(r.new_interest_rate, dec!(6.40));

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].loan_id, "ECO-001");
    assert_eq!(entries[0].month, "January");
    assert_eq!(entries[0].audit_hash, r.audit_hash);
    assert!(h.outbox.notices().is_empty());
    assert_eq!(h.monitor.last_compliance("ECO-001"), Some(true));
}

#[test]
fn test_notice_raised_only_when_compliance_flips() {
    let h = harness(Arc::new(Unlimited));
    let m = &h.monitor;
    m.evaluate("c", "ECO-001", &submission("January", dec!(120_000_000), dec!(180)))
        .unwrap();
    m.evaluate("c", "ECO-001", &submission("February", dec!(150_000_000), dec!(180)))
        .unwrap();
    m.evaluate("c", "ECO-001", &submission("March", dec!(150_000_000), dec!(250)))
        .unwrap();

    let notices = h.outbox.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].month, "February");
    assert_eq!(notices[0].breaches, vec![BreachType::FinancialCovenant]);

    // back to compliant, then breach again
    m.evaluate("c", "ECO-001", &submission("April", dec!(120_000_000), dec!(180)))
        .unwrap();
    m.evaluate("c", "ECO-001", &submission("May", dec!(120_000_000), dec!(250)))
        .unwrap();
    let notices = h.outbox.notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[1].breaches, vec![BreachType::EsgTarget]);

    assert_eq!(h.audit.entries().len(), 5);
    assert!(h.audit.verify().is_ok());
}

#[test]
fn test_first_evaluation_in_breach_notifies() {
    let h = harness(Arc::new(Unlimited));
    h.monitor
        .evaluate("c", "ECO-001", &submission("January", dec!(150_000_000), dec!(180)))
        .unwrap();
    assert_eq!(h.outbox.notices().len(), 1);
}

#[test]
fn test_stored_history_used_when_request_has_none() {
    let h = harness(Arc::new(Unlimited));
    let from_book = h
        .monitor
        .evaluate("c", "ECO-001", &submission("January", dec!(120_000_000), dec!(180)))
        .unwrap();

    let mut req = submission("January", dec!(120_000_000), dec!(180));
    req.ebitda_history = vec![dec!(34_000_000), dec!(34_500_000)];
    let explicit = h.monitor.evaluate("c", "ECO-001", &req).unwrap();
    assert_eq!(from_book.audit_hash, explicit.audit_hash);

    req.ebitda_history = vec![dec!(20_000_000)];
    let other = h.monitor.evaluate("c", "ECO-001", &req).unwrap();
    assert_ne!(from_book.audit_hash, other.audit_hash);
}

#[test]
fn test_loan_without_any_history_is_rejected() {
    let audit = Arc::new(InMemoryAuditLog::new());
    let mut fresh = ecocorp();
    fresh.loan_id = "NEW-001".into();
    fresh.ebitda_history.clear();
    let monitor = CovenantMonitor::new(
        Arc::new(InMemoryLoanBook::new(vec![fresh])),
        audit.clone(),
        Arc::new(NotificationOutbox::new()),
        Arc::new(Unlimited),
    );
    let err = monitor
        .evaluate("c", "NEW-001", &submission("January", dec!(120_000_000), dec!(180)))
        .unwrap_err();
    assert!(matches!(err, CovenantError::InvalidInput { ref field, .. } if field == "ebitda_history"));
    assert!(audit.entries().is_empty());
    assert_eq!(monitor.last_compliance("NEW-001"), None);
}

#[test]
fn test_unknown_loan_surfaces() {
    let h = harness(Arc::new(Unlimited));
    let err = h
        .monitor
        .evaluate("c", "ECO-404", &submission("January", dec!(1), dec!(1)))
        .unwrap_err();
    assert!(matches!(err, CovenantError::UnknownLoan(ref id) if id == "ECO-404"));
    assert!(h.audit.entries().is_empty());
}

#[test]
fn test_upstream_failure_is_not_defaulted() {
    let outage = Arc::new(DownstreamOutage);
    let monitor = CovenantMonitor::new(
        outage.clone(),
        Arc::new(InMemoryAuditLog::new()),
        Arc::new(NotificationOutbox::new()),
        Arc::new(Unlimited),
    );
    let err = monitor
        .evaluate("c", "ECO-001", &submission("January", dec!(1), dec!(1)))
        .unwrap_err();
    assert!(matches!(err, CovenantError::UpstreamUnavailable { .. }));
    assert!(!err.is_client_error());
}

#[test]
fn test_sink_and_notifier_failures_keep_result() {
    let outage = Arc::new(DownstreamOutage);
    let monitor = CovenantMonitor::new(
        Arc::new(InMemoryLoanBook::new(vec![ecocorp()])),
        outage.clone(),
        outage,
        Arc::new(Unlimited),
    );
    let r = monitor
        .evaluate("c", "ECO-001", &submission("January", dec!(150_000_000), dec!(180)))
        .unwrap();
    assert!(!r.is_compliant);
    assert_eq!(monitor.last_compliance("ECO-001"), Some(false));
}

#[test]
fn test_rate_limit_rejects_before_lookup() {
    let h = harness(Arc::new(FixedWindowLimiter::new(2, Duration::from_secs(60))));
    let req = submission("January", dec!(120_000_000), dec!(180));
    assert!(h.monitor.evaluate("client-a", "ECO-001", &req).is_ok());
    assert!(h.monitor.evaluate("client-a", "ECO-001", &req).is_ok());
    let err = h.monitor.evaluate("client-a", "ECO-001", &req).unwrap_err();
    assert!(matches!(err, CovenantError::RateLimited { ref key } if key == "client-a"));
    assert!(h.monitor.evaluate("client-b", "ECO-001", &req).is_ok());
    assert_eq!(h.audit.entries().len(), 3);
}

#[test]
fn test_monitor_is_shareable_across_threads() {
    let h = harness(Arc::new(Unlimited));
    let monitor = Arc::new(h.monitor);
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let m = monitor.clone();
            std::thread::spawn(move || {
                let req = submission(&format!("P{n}"), dec!(120_000_000), dec!(180));
                m.evaluate("client", "ECO-001", &req).unwrap().audit_hash
            })
        })
        .collect();
    let hashes: Vec<String> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    // month is not part of the digest
    assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.audit.entries().len(), 4);
    assert!(h.audit.verify().is_ok());
}
