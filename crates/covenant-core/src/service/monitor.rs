use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::collaborators::*;
use crate::error::CovenantError;
use crate::simulation::{run_simulation, CalculateRateRequest, LoanContext, SimulationResult};
use crate::CovenantResult;

/// Runs monthly submissions for booked loans through the engine and fans the
/// result out to the audit sink and breach notifier.
pub struct CovenantMonitor {
    loans: Arc<dyn LoanTermsSource>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn BreachNotifier>,
    limiter: Arc<dyn RateLimiter>,
    last_compliance: DashMap<String, bool>,
}

impl CovenantMonitor {
    pub fn new(
        loans: Arc<dyn LoanTermsSource>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn BreachNotifier>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            loans,
            audit,
            notifier,
            limiter,
            last_compliance: DashMap::new(),
        }
    }

    /// Evaluate one period for `loan_id` on behalf of `client_key`.
    ///
    /// The request's EBITDA history wins; the loan book's stored history is
    /// used only when the request carries none, and a loan with neither is
    /// rejected. Audit and notification failures are logged and do not
    /// discard the computed result.
    pub fn evaluate(
        &self,
        client_key: &str,
        loan_id: &str,
        request: &CalculateRateRequest,
    ) -> CovenantResult<SimulationResult> {
        if !self.limiter.allow(client_key) {
            warn!(client = client_key, "request rate limited");
            return Err(CovenantError::RateLimited {
                key: client_key.to_string(),
            });
        }

        let loan = LoanContext::from(self.loans.loan(loan_id)?);
        let input = loan.simulation_input(request)?;
        let result = run_simulation(&input)?;

        info!(
            loan_id,
            month = %request.month,
            new_interest_rate = %result.new_interest_rate,
            risk_score = %result.risk_score,
            is_compliant = result.is_compliant,
            "period evaluated"
        );

        if let Err(e) = self.audit.record(loan_id, &request.month, &result) {
            warn!(loan_id, error = %e, "audit sink rejected result");
        }

        let previous = self
            .last_compliance
            .insert(loan_id.to_string(), result.is_compliant);
        if !result.is_compliant && previous != Some(false) {
            let notice = BreachNotice::from_result(loan_id, &request.month, &result);
            match self.notifier.notify(&notice) {
                Ok(()) => info!(loan_id, breaches = ?notice.breaches, "breach notice raised"),
                Err(e) => warn!(loan_id, error = %e, "breach notification failed"),
            }
        }

        Ok(result)
    }

    /// Last known compliance flag, if the loan has been evaluated.
    pub fn last_compliance(&self, loan_id: &str) -> Option<bool> {
        self.last_compliance.get(loan_id).map(|v| *v)
    }
}
