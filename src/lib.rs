pub mod calendar;
pub mod charges;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod financial;
pub mod interest;
pub mod schedule;
pub mod terms;
pub mod types;

// re-export key types
pub use calendar::{PaymentPeriodsInOneYearCalculator, ScheduledDateGenerator};
pub use charges::{Charge, ChargeBasis, ChargeCalculation, ChargeId, ChargeKind, ChargeTiming, ChargeWindow, LoanCharge};
pub use config::{LoanTermsConfig, ScheduleSettings, VariationConfig};
pub use decimal::{CurrencyCode, MonetaryCurrency, Money, Rate, RoundingMode};
pub use errors::{Result, ScheduleError};
pub use events::{CompoundingLedger, PrincipalVariation, VariationLedger};
pub use interest::{
    DecliningBalanceStrategy, FlatInterestStrategy, InterestMethodStrategy, PeriodicInterestRateCalculator,
    PrincipalInterest, PrincipalVariationStrategy,
};
pub use schedule::{
    generate_schedule, DisbursementPeriod, LoanScheduleGenerator, LoanScheduleModel, LoanSchedulePeriod,
    RepaymentPeriod,
};
pub use terms::{CompoundingConfig, GraceSettings, LoanTerms, LoanTermsBuilder};
pub use types::{
    AmortizationMethod, CompoundingMethod, DaysInMonthType, DaysInYearType, InterestCalculationPeriodMethod,
    InterestMethod, PeriodFrequency,
};

// re-export external dependencies that users will need
pub use chrono;
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
