pub mod collaborators;
pub mod monitor;
pub mod rate_limit;

pub use collaborators::{
    AuditSink, BreachNotice, BreachNotifier, BreachType, InMemoryAuditLog, InMemoryLoanBook,
    LoanRecord, LoanTermsSource, NotificationOutbox, RateLimiter, Unlimited,
};
pub use monitor::CovenantMonitor;
pub use rate_limit::{Clock, FixedWindowLimiter, ManualClock, SystemClock};
