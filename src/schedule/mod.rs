pub mod generator;
pub mod model;
pub mod period;

pub use generator::{generate_schedule, LoanScheduleGenerator};
pub use model::LoanScheduleModel;
pub use period::{DisbursementPeriod, LoanSchedulePeriod, RepaymentPeriod};
