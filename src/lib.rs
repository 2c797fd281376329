pub mod amortization;
pub mod error;
pub mod repayment;

pub use amortization::{compute_payment, generate_schedule, LoanInput, Schedule, ScheduleEntry};
pub use error::{AmortizationError, Result};
pub use repayment::{format_currency, MortgageRequest, RepaymentData};
