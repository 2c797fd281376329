use crate::amortization::{LoanInput, Schedule};
use crate::error::{AmortizationError, Result};
use log::debug;
use std::io;

pub const MONTHS_PER_YEAR: u32 = 12;

/// Raw mortgage figures as a borrower enters them.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MortgageRequest {
    pub house_price: f64,
    pub deposit: f64,
    pub annual_rate_percent: f64, // annual interest rate as a percentage (i.e., 4.5, 6.0)
    pub term_years: u32,
}

impl MortgageRequest {
    pub fn new(house_price: f64, deposit: f64, annual_rate_percent: f64, term_years: u32) -> Self {
        Self {
            house_price,
            deposit,
            annual_rate_percent,
            term_years,
        }
    }

    pub fn principal(&self) -> f64 {
        self.house_price - self.deposit
    }

    pub fn periodic_rate(&self) -> f64 {
        self.annual_rate_percent / 100. / f64::from(MONTHS_PER_YEAR)
    }

    pub fn num_periods(&self) -> Result<u32> {
        self.term_years.checked_mul(MONTHS_PER_YEAR).ok_or_else(|| {
            AmortizationError::invalid(
                "term_years",
                format!("{} years is too long a term", self.term_years),
            )
        })
    }

    /// Converts the request into monthly loan terms.
    pub fn loan_input(&self) -> Result<LoanInput> {
        if self.house_price.is_finite() && self.deposit.is_finite() && self.principal() <= 0. {
            return Err(AmortizationError::invalid(
                "deposit",
                format!(
                    "deposit {} must be less than the house price {}",
                    self.deposit, self.house_price
                ),
            ));
        }
        let input = LoanInput::new(self.principal(), self.periodic_rate(), self.num_periods()?)?;
        debug!(
            "principal {}, monthly rate {}, {} payments",
            input.principal(),
            input.periodic_rate(),
            input.num_periods()
        );
        Ok(input)
    }

    pub fn schedule(&self) -> Result<Schedule> {
        self.loan_input()?.schedule()
    }
}

/// Parallel series for plotting a schedule, one element per month.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, PartialEq, Debug, Default)]
pub struct RepaymentData {
    pub labels: Vec<String>,
    pub interest_payments: Vec<f64>,
    pub principal_payments: Vec<f64>,
    pub remaining_balances: Vec<f64>,
}

impl RepaymentData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn write_csv<W: io::Write>(&self, wtr: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(wtr);
        wtr.write_record([
            "label",
            "interest_payment",
            "principal_payment",
            "remaining_balance",
        ])?;
        for i in 0..self.len() {
            wtr.write_record([
                self.labels[i].clone(),
                self.interest_payments[i].to_string(),
                self.principal_payments[i].to_string(),
                self.remaining_balances[i].to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl From<&Schedule> for RepaymentData {
    fn from(schedule: &Schedule) -> Self {
        let mut data = RepaymentData {
            labels: Vec::with_capacity(schedule.len()),
            interest_payments: Vec::with_capacity(schedule.len()),
            principal_payments: Vec::with_capacity(schedule.len()),
            remaining_balances: Vec::with_capacity(schedule.len()),
        };
        for entry in schedule {
            data.labels.push(format!("Month {}", entry.period));
            data.interest_payments.push(entry.interest_portion);
            data.principal_payments.push(entry.principal_portion);
            data.remaining_balances.push(entry.remaining_balance);
        }
        data
    }
}

pub fn round(amt: f64, dec_places: i32) -> f64 {
    if amt == 0. {
        0.
    } else {
        (amt * 10_f64.powi(dec_places)).round() / 10_f64.powi(dec_places)
    }
}

/// Formats an amount as pounds sterling, e.g. `£1,199.10`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }

    let pence = (amount.abs() * 100.).round() as u64;
    let digits = (pence / 100).to_string();
    let mut pounds = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            pounds.push(',');
        }
        pounds.push(ch);
    }

    // amounts that round to zero pence carry no sign
    let sign = if amount < 0. && pence > 0 { "-" } else { "" };
    format!("{}£{}.{:02}", sign, pounds, pence % 100)
}
