/// tranches and compounding - principal variations on a declining balance loan
use loan_schedule_rs::chrono::NaiveDate;
use loan_schedule_rs::{
    generate_schedule, AmortizationMethod, Charge, ChargeCalculation, ChargeTiming, CompoundingConfig,
    CompoundingMethod, InterestCalculationPeriodMethod, LoanSchedulePeriod, LoanTerms, MonetaryCurrency, Money,
    PeriodFrequency, Rate,
};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    Ok(NaiveDate::from_ymd_opt(y, m, d).ok_or("bad date")?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let usd = MonetaryCurrency::usd();

    let terms = LoanTerms::builder()
        .principal(Money::from_major(usd, 50_000))
        .annual_interest_rate(Rate::from_percentage(dec!(18)))
        .interest_calculation_period_method(InterestCalculationPeriodMethod::Daily)
        .amortization_method(AmortizationMethod::EqualInstallments)
        .repayments(12, 1, PeriodFrequency::Months)
        .expected_disbursement_date(date(2024, 1, 1)?)
        .disbursement_tranche(date(2024, 3, 10)?, Money::from_major(usd, 25_000))
        .prepayment(date(2024, 7, 20)?, Money::from_major(usd, 10_000))
        .compounding(CompoundingConfig {
            method: CompoundingMethod::InterestAndFee,
            frequency: PeriodFrequency::Weeks,
            every: 1,
        })
        .build()?;

    let charges = vec![
        Charge::fee(
            "arrangement",
            ChargeTiming::Disbursement,
            ChargeCalculation::PercentOfAmount(dec!(1.5)),
        ),
        Charge::fee(
            "valuation",
            ChargeTiming::SpecifiedDueDate(date(2024, 2, 12)?),
            ChargeCalculation::Flat(Money::from_major(usd, 300)),
        ),
    ];

    let schedule = generate_schedule(&terms, &charges)?;

    for row in &schedule.periods {
        match row {
            LoanSchedulePeriod::Disbursement(d) => println!(
                "    {}  disbursed {:>10}  charges {:>8}",
                d.disbursement_date, d.principal_disbursed, d.charges_due_at_disbursement
            ),
            LoanSchedulePeriod::Repayment(r) => println!(
                "{:>2}  {}  principal {:>10}  interest {:>8}  fees {:>6}  balance {:>10}",
                r.period_number, r.due_date, r.principal_due, r.interest_due, r.fee_charges_due, r.outstanding_balance
            ),
        }
    }
    println!("disbursed {}", schedule.total_principal_disbursed);
    println!("prepaid {}", schedule.total_principal_prepaid);
    println!("interest {}", schedule.total_interest_charged);

    Ok(())
}
