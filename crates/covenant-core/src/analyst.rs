//! Canned answers to borrower questions about their loan.
//!
//! A keyword lookup over the question, filled from the latest simulation and
//! the loan's own coefficients. No model is involved.

use serde::{Deserialize, Serialize};

use crate::risk::scorer::{HIGH_RISK_THRESHOLD, MODERATE_RISK_THRESHOLD};
use crate::simulation::SimulationResult;
use crate::types::{round_half_away, LoanTerms};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalystContext {
    #[serde(default)]
    pub terms: LoanTerms,
    /// Latest simulation, if the borrower has run one
    #[serde(default)]
    pub result: Option<SimulationResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Rate,
    Risk,
    Esg,
    Compliance,
    Improve,
    Help,
}

fn topic(question: &str) -> Topic {
    let q = question.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| q.contains(w));
    if has(&["rate", "interest"]) {
        Topic::Rate
    } else if has(&["risk"]) {
        Topic::Risk
    } else if has(&["esg", "carbon", "sustainability"]) {
        Topic::Esg
    } else if has(&["compliance", "covenant", "breach"]) {
        Topic::Compliance
    } else if has(&["improve", "lower", "reduce", "better"]) {
        Topic::Improve
    } else {
        Topic::Help
    }
}

/// Answer `question` from the supplied context.
pub fn answer(question: &str, ctx: &AnalystContext) -> String {
    let t = &ctx.terms;
    let c = &t.covenants;
    match topic(question) {
        Topic::Rate => match &ctx.result {
            Some(r) => format!(
                "Your current interest rate is {:.2}%. It is built from the base rate ({}%) plus \
                 the margin ({}%), then adjusted for ESG performance and covenant compliance. \
                 To lower it: meet the ESG target (-{}%), keep leverage below {}x, and keep the \
                 risk score below {}.",
                r.new_interest_rate,
                t.base_rate.normalize(),
                t.base_margin.normalize(),
                c.sustainability_discount.normalize(),
                c.max_leverage_ratio.normalize(),
                MODERATE_RISK_THRESHOLD,
            ),
            None => format!(
                "The interest rate follows your financial health and ESG performance. Meeting \
                 the ESG target reduces it by {}%, missing it adds {}%, and a financial \
                 covenant breach adds a {}% default risk premium.",
                c.sustainability_discount.normalize(),
                c.sustainability_penalty.normalize(),
                c.default_risk_premium.normalize(),
            ),
        },
        Topic::Risk => match &ctx.result {
            Some(r) => {
                let outlook = if r.risk_score < MODERATE_RISK_THRESHOLD {
                    "a low"
                } else if r.risk_score < HIGH_RISK_THRESHOLD {
                    "a moderate"
                } else {
                    "an elevated"
                };
                format!(
                    "Your current risk score is {:.1}/100, from the volatility of your EBITDA, \
                     your cash buffer and the latest EBITDA trend. Below {} is low risk, {} to \
                     {} is moderate and {} or above is high. Your score implies {} default \
                     probability ({}).",
                    r.risk_score,
                    MODERATE_RISK_THRESHOLD,
                    MODERATE_RISK_THRESHOLD,
                    HIGH_RISK_THRESHOLD,
                    HIGH_RISK_THRESHOLD,
                    outlook,
                    r.breakdown.probability_of_default.normalize(),
                )
            }
            None => "Risk scores measure how much your EBITDA fluctuates, credit your cash \
                     reserves and penalize a sharp latest decline. Steadier EBITDA and more \
                     cash mean a lower score."
                .to_string(),
        },
        Topic::Esg => {
            let mut s = format!(
                "The carbon emissions target is {} tons. Staying below it reduces your rate by \
                 {}%; missing it adds {}%.",
                c.esg_target.normalize(),
                c.sustainability_discount.normalize(),
                c.sustainability_penalty.normalize(),
            );
            if let Some(r) = &ctx.result {
                let side = if r.covenants.esg_target_met {
                    "below"
                } else {
                    "not below"
                };
                s.push_str(&format!(
                    " Your current emissions are {} tons, {} the target.",
                    r.covenants.carbon_emissions.normalize(),
                    side
                ));
            }
            s
        }
        Topic::Compliance => {
            let mut s = format!(
                "Compliance is tested on two fronts: leverage (debt / EBITDA) must stay below \
                 {}x and carbon emissions must stay below {} tons.",
                c.max_leverage_ratio.normalize(),
                c.esg_target.normalize(),
            );
            if let Some(r) = &ctx.result {
                s.push_str(&format!(
                    " Yours are {}x and {} tons.",
                    round_half_away(r.covenants.leverage_ratio, 2),
                    r.covenants.carbon_emissions.normalize(),
                ));
                s.push_str(if r.is_compliant {
                    " You are currently compliant."
                } else {
                    " You have compliance issues that need attention."
                });
            }
            s
        }
        Topic::Improve => format!(
            "To improve your loan terms: 1) bring carbon emissions below {} tons to earn the \
             {}% ESG discount, 2) keep debt / EBITDA below {}x, 3) grow EBITDA steadily to \
             cut volatility and the risk score, 4) hold cash reserves as a buffer.",
            c.esg_target.normalize(),
            c.sustainability_discount.normalize(),
            c.max_leverage_ratio.normalize(),
        ),
        Topic::Help => "I can explain your interest rate, risk score, ESG target, compliance \
                        status, or how to improve your loan terms. Try \"How do I lower my \
                        rate?\" or \"What's my risk score?\""
            .to_string(),
    }
}
