use covenant_core::pricing::{apply_ratchet, RateStatus};
use covenant_core::risk::{score_risk, RiskInput};
use covenant_core::simulation::{run_simulation, SimulationInput};
use covenant_core::{EsgMetrics, LoanTerms, MonthlyFinancials};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn money(max: i64) -> impl Strategy<Value = Decimal> {
    (0..=max).prop_map(Decimal::from)
}

fn positive_money(max: i64) -> impl Strategy<Value = Decimal> {
    (1..=max).prop_map(Decimal::from)
}

fn simulation_input() -> impl Strategy<Value = SimulationInput> {
    (
        money(500_000_000),
        positive_money(100_000_000),
        money(800_000_000),
        money(50_000_000),
        (0i64..=40_000).prop_map(|c| Decimal::new(c, 2)),
        prop::collection::vec(money(100_000_000), 0..12),
    )
        .prop_map(|(revenue, ebitda, debt, cash_reserves, carbon, history)| SimulationInput {
            financial: MonthlyFinancials {
                revenue,
                ebitda,
                debt,
                cash_reserves,
            },
            esg: EsgMetrics {
                carbon_emissions: carbon,
                diversity_score: None,
            },
            month: "P".into(),
            ebitda_history: history,
            terms: LoanTerms::default(),
        })
}

proptest! {
    #[test]
    fn risk_score_and_pd_are_bounded(
        values in prop::collection::vec(positive_money(1_000_000_000), 1..24),
        cash in prop::option::of(money(1_000_000_000)),
    ) {
        let out = score_risk(&RiskInput { ebitda_values: values, cash_reserves: cash }).unwrap();
        let r = out.result;
        prop_assert!(r.risk_score >= Decimal::ZERO && r.risk_score <= Decimal::ONE_HUNDRED);
        prop_assert!(r.probability_of_default >= Decimal::ZERO);
        prop_assert!(r.probability_of_default <= Decimal::ONE);
    }

    #[test]
    fn more_cash_never_raises_risk(
        values in prop::collection::vec(positive_money(1_000_000), 2..12),
        cash in money(1_000_000),
        extra in money(1_000_000),
    ) {
        let low = score_risk(&RiskInput { ebitda_values: values.clone(), cash_reserves: Some(cash) }).unwrap();
        let high = score_risk(&RiskInput { ebitda_values: values, cash_reserves: Some(cash + extra) }).unwrap();
        prop_assert!(high.result.risk_score <= low.result.risk_score);
    }

    #[test]
    fn ratchet_breakdown_has_exactly_one_esg_line(esg in any::<bool>(), fin in any::<bool>()) {
        let r = apply_ratchet(esg, fin, &LoanTerms::default()).unwrap();
        let b = &r.breakdown;
        prop_assert!(b.sustainability_discount.is_some() != b.sustainability_penalty.is_some());
        prop_assert_eq!(b.sustainability_discount.is_some(), esg);
        prop_assert_eq!(b.default_risk_premium.is_some(), !fin);
        if !fin {
            prop_assert_eq!(r.status, RateStatus::Breach);
        }
    }

    #[test]
    fn simulation_is_deterministic(input in simulation_input()) {
        let a = run_simulation(&input).unwrap();
        let b = run_simulation(&input).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn crossing_the_esg_target_swaps_discount_for_penalty(input in simulation_input()) {
        let target = input.terms.covenants.esg_target;

        let mut below = input.clone();
        below.esg.carbon_emissions = target - Decimal::ONE;
        let mut above = input;
        above.esg.carbon_emissions = target + Decimal::ONE;

        let below = run_simulation(&below).unwrap();
        let above = run_simulation(&above).unwrap();
        prop_assert!(below.covenants.esg_target_met);
        prop_assert!(!above.covenants.esg_target_met);
        prop_assert!(below.rate_breakdown.sustainability_discount.is_some());
        prop_assert!(below.rate_breakdown.sustainability_penalty.is_none());
        prop_assert!(above.rate_breakdown.sustainability_penalty.is_some());
        prop_assert!(above.rate_breakdown.sustainability_discount.is_none());
    }

    #[test]
    fn any_debt_change_flips_the_hash(input in simulation_input(), bump in 1i64..1_000_000) {
        let mut changed = input.clone();
        changed.financial.debt += Decimal::from(bump);
        let a = run_simulation(&input).unwrap();
        let b = run_simulation(&changed).unwrap();
        prop_assert_ne!(a.audit_hash, b.audit_hash);
    }
}
