/// grace periods - principal, interest payment and interest charging grace
use loan_schedule_rs::chrono::NaiveDate;
use loan_schedule_rs::{
    generate_schedule, AmortizationMethod, Charge, GraceSettings, InterestMethod, LoanScheduleModel, LoanTerms,
    MonetaryCurrency, Money, PeriodFrequency, Rate,
};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn print_schedule(title: &str, schedule: &LoanScheduleModel) {
    println!("{title}");
    for period in schedule.repayment_periods() {
        println!(
            "  {:>2}  {}  principal {:>9}  interest {:>7}  due {:>9}",
            period.period_number, period.due_date, period.principal_due, period.interest_due, period.total_due
        );
    }
    println!("  total interest {}\n", schedule.total_interest_charged);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let usd = MonetaryCurrency::usd();
    let disbursed = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let base = || {
        LoanTerms::builder()
            .principal(Money::from_major(usd, 12_000))
            .annual_interest_rate(Rate::from_percentage(dec!(12)))
            .repayments(6, 1, PeriodFrequency::Months)
            .expected_disbursement_date(disbursed)
    };

    // no principal for two months
    let terms = base()
        .amortization_method(AmortizationMethod::EqualInstallments)
        .principal_grace(2)
        .build()?;
    print_schedule("principal grace", &generate_schedule::<Charge>(&terms, &[])?);

    // interest deferred for two months, collected in the third
    let terms = base()
        .interest_method(InterestMethod::Flat)
        .amortization_method(AmortizationMethod::EqualPrincipal)
        .interest_payment_grace(2)
        .build()?;
    print_schedule("interest payment grace", &generate_schedule::<Charge>(&terms, &[])?);

    // interest waived for the first month, interest free days in the second
    let terms = base()
        .amortization_method(AmortizationMethod::EqualPrincipal)
        .grace(GraceSettings {
            principal: 0,
            interest_payment: 0,
            interest_charging: 1,
        })
        .interest_charged_from(NaiveDate::from_ymd_opt(2024, 2, 15).ok_or("bad date")?)
        .build()?;
    print_schedule("interest charging grace", &generate_schedule::<Charge>(&terms, &[])?);

    Ok(())
}
