/// json config - load loan terms from json and emit the schedule as json
use loan_schedule_rs::{generate_schedule, Charge, LoanScheduleGenerator, LoanTermsConfig, ScheduleSettings};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

const TERMS: &str = r#"{
    "currency": { "code": "KES", "decimal_places": 0, "in_multiples_of": 50, "rounding": "HalfEven" },
    "principal": "250000",
    "annual_nominal_interest_rate": "18",
    "interest_method": 0,
    "interest_calculation_period_method": 1,
    "amortization_method": 1,
    "number_of_repayments": 26,
    "repayment_every": 1,
    "repayment_frequency_type": 1,
    "expected_disbursement_date": "2024-03-04",
    "grace_on_principal_payment": 2,
    "interest_charged_from_date": "2024-03-06"
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let terms = serde_json::from_str::<LoanTermsConfig>(TERMS)?.into_terms()?;
    let schedule = generate_schedule::<Charge>(&terms, &[])?;
    println!("{}", serde_json::to_string_pretty(&schedule)?);

    // ignore interest-free fractions up to a third of a period
    let generator = LoanScheduleGenerator::with_settings(ScheduleSettings {
        partial_grace_threshold: dec!(0.34),
        ..ScheduleSettings::default()
    });
    let lenient = generator.generate::<Charge>(&terms, &[])?;
    if let (Some(default), Some(lenient)) = (schedule.installment(1), lenient.installment(1)) {
        println!("first interest: {} by default, {} with a higher threshold", default.interest_due, lenient.interest_due);
    }

    Ok(())
}
