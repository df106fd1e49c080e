/// quick start - minimal example to get started
use loan_schedule_rs::chrono::NaiveDate;
use loan_schedule_rs::{
    generate_schedule, AmortizationMethod, Charge, LoanTerms, MonetaryCurrency, Money, PeriodFrequency, Rate,
};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let usd = MonetaryCurrency::usd();
    let disbursed = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;

    // $100,000 at 12% over a year, level monthly installments
    let terms = LoanTerms::builder()
        .principal(Money::from_major(usd, 100_000))
        .annual_interest_rate(Rate::from_percentage(dec!(12)))
        .amortization_method(AmortizationMethod::EqualInstallments)
        .repayments(12, 1, PeriodFrequency::Months)
        .expected_disbursement_date(disbursed)
        .build()?;

    let schedule = generate_schedule::<Charge>(&terms, &[])?;

    for period in schedule.repayment_periods() {
        println!(
            "{:>2}  {}  principal {:>10}  interest {:>8}  balance {:>10}",
            period.period_number, period.due_date, period.principal_due, period.interest_due, period.outstanding_balance
        );
    }
    println!("total interest: {}", schedule.total_interest_charged);
    println!("total repayment: {}", schedule.total_repayment_expected);

    Ok(())
}
