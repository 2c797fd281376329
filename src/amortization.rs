use crate::error::{AmortizationError, Result};
use log::{debug, trace};
use std::{fmt, slice};

/// Longest schedule `generate_schedule` will build; payments alone have no limit.
pub const MAX_SCHEDULE_PERIODS: u32 = 1_000_000;

/// Validated inputs for a single amortization request.
///
/// `periodic_rate` is the rate per payment period as a decimal (a 6% annual
/// rate paid monthly is `0.005`); no unit conversion happens here.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LoanInput {
    principal: f64,
    periodic_rate: f64,
    num_periods: u32,
}

impl LoanInput {
    pub fn new(principal: f64, periodic_rate: f64, num_periods: u32) -> Result<Self> {
        if !principal.is_finite() {
            return Err(AmortizationError::invalid(
                "principal",
                format!("must be finite, got {}", principal),
            ));
        }
        if principal <= 0. {
            return Err(AmortizationError::invalid(
                "principal",
                format!("must be greater than zero, got {}", principal),
            ));
        }
        if !periodic_rate.is_finite() {
            return Err(AmortizationError::invalid(
                "periodic_rate",
                format!("must be finite, got {}", periodic_rate),
            ));
        }
        if periodic_rate < 0. {
            return Err(AmortizationError::invalid(
                "periodic_rate",
                format!("must not be negative, got {}", periodic_rate),
            ));
        }
        if num_periods == 0 {
            return Err(AmortizationError::invalid(
                "num_periods",
                "must be at least one period",
            ));
        }

        Ok(Self {
            principal,
            periodic_rate,
            num_periods,
        })
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn periodic_rate(&self) -> f64 {
        self.periodic_rate
    }

    pub fn num_periods(&self) -> u32 {
        self.num_periods
    }

    /// Fixed payment that fully repays the principal over `num_periods`.
    pub fn payment(&self) -> Result<f64> {
        get_pmt_amount(self)
    }

    pub fn schedule(&self) -> Result<Schedule> {
        let payment = get_pmt_amount(self)?;
        let entries = add_scheduled_pmts(self, payment)?;
        debug!(
            "generated {} scheduled payments of {:.4} for principal {:.4}",
            entries.len(),
            payment,
            self.principal
        );
        Ok(Schedule { payment, entries })
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ScheduleEntry {
    pub period: u32,
    pub interest_portion: f64,
    pub principal_portion: f64,
    pub remaining_balance: f64,
}

impl ScheduleEntry {
    pub fn new(
        period: u32,
        interest_portion: f64,
        principal_portion: f64,
        remaining_balance: f64,
    ) -> Self {
        Self {
            period,
            interest_portion,
            principal_portion,
            remaining_balance,
        }
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "period {}, interest paid {:.4}, principal paid {:.4}, remaining balance {:.4}",
            self.period, self.interest_portion, self.principal_portion, self.remaining_balance
        )
    }
}

/// Period-by-period repayment schedule, ordered from period 1.
///
/// `remaining_balance` on each entry is the balance after that period's
/// payment has been applied.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, PartialEq, Debug)]
pub struct Schedule {
    payment: f64,
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn payment(&self) -> f64 {
        self.payment
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn iter(&self) -> slice::Iter<'_, ScheduleEntry> {
        self.entries.iter()
    }

    /// Entry for a 1-indexed period.
    pub fn get(&self, period: u32) -> Option<&ScheduleEntry> {
        let idx = usize::try_from(period).ok()?.checked_sub(1)?;
        self.entries.get(idx)
    }

    pub fn last(&self) -> Option<&ScheduleEntry> {
        self.entries.last()
    }

    pub fn total_interest(&self) -> f64 {
        self.entries.iter().map(|e| e.interest_portion).sum()
    }

    pub fn total_principal(&self) -> f64 {
        self.entries.iter().map(|e| e.principal_portion).sum()
    }

    pub fn total_paid(&self) -> f64 {
        self.total_interest() + self.total_principal()
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a ScheduleEntry;
    type IntoIter = slice::Iter<'a, ScheduleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub fn compute_payment(principal: f64, periodic_rate: f64, num_periods: u32) -> Result<f64> {
    LoanInput::new(principal, periodic_rate, num_periods)?.payment()
}

pub fn generate_schedule(principal: f64, periodic_rate: f64, num_periods: u32) -> Result<Schedule> {
    LoanInput::new(principal, periodic_rate, num_periods)?.schedule()
}

fn get_pmt_amount(input: &LoanInput) -> Result<f64> {
    let r = input.periodic_rate;
    let n = f64::from(input.num_periods);

    // (1 + r)^n - 1, kept accurate for small rates
    let growth = if r == 0. { 0. } else { (n * r.ln_1p()).exp_m1() };
    if !growth.is_finite() {
        return Err(AmortizationError::NumericOverflow(format!(
            "(1 + {})^{} is not representable",
            r, input.num_periods
        )));
    }

    // growth underflows to zero only for rates too small to accrue any interest
    let pmt = if growth == 0. {
        input.principal / n
    } else {
        input.principal * r * (growth + 1.) / growth
    };
    trace!("periodic rate {}, periods {}, payment {}", r, input.num_periods, pmt);

    if !pmt.is_finite() || pmt <= 0. {
        return Err(AmortizationError::NumericOverflow(format!(
            "payment for principal {} over {} periods at rate {} is {}",
            input.principal, input.num_periods, r, pmt
        )));
    }
    Ok(pmt)
}

fn add_scheduled_pmts(input: &LoanInput, payment: f64) -> Result<Vec<ScheduleEntry>> {
    let unallocatable = || {
        AmortizationError::NumericOverflow(format!(
            "schedule of {} periods cannot be allocated",
            input.num_periods
        ))
    };
    if input.num_periods > MAX_SCHEDULE_PERIODS {
        return Err(unallocatable());
    }
    let mut sched_pmt = Vec::new();
    sched_pmt
        .try_reserve_exact(input.num_periods as usize)
        .map_err(|_| unallocatable())?;
    let mut balance = input.principal;

    for period in 1..=input.num_periods {
        let interest = balance * input.periodic_rate;
        let principal_paid = payment - interest;
        balance -= principal_paid;
        trace!(
            "period {}, interest {}, principal {}, end bal {}",
            period,
            interest,
            principal_paid,
            balance
        );

        sched_pmt.push(ScheduleEntry::new(period, interest, principal_paid, balance));
    }
    Ok(sched_pmt)
}

#[cfg(test)]
mod tests {
    use super::{
        compute_payment, generate_schedule, LoanInput, ScheduleEntry, MAX_SCHEDULE_PERIODS,
    };
    use crate::error::AmortizationError;
    use approx::{assert_relative_eq, relative_eq};
    use test_log::test;

    fn round_cents(amt: f64) -> f64 {
        (amt * 100.).round() / 100.
    }

    #[test]
    fn test_thirty_year_payment() {
        let payment = compute_payment(200000., 0.005, 360).unwrap();
        assert_eq!(round_cents(payment), 1199.10);
    }

    #[test]
    fn test_thirty_year_schedule() {
        let principal = 200000.;
        let schedule = generate_schedule(principal, 0.005, 360).unwrap();

        assert_eq!(schedule.len(), 360);
        for (i, entry) in schedule.iter().enumerate() {
            assert_eq!(entry.period as usize, i + 1);
        }

        let first = schedule.get(1).unwrap();
        assert_relative_eq!(first.interest_portion, 1000., max_relative = 1e-12);
        assert_eq!(round_cents(first.principal_portion), 199.10);
        assert_eq!(round_cents(first.remaining_balance), 199800.90);

        let last = schedule.last().unwrap();
        assert_eq!(last.period, 360);
        assert!(last.remaining_balance.abs() < principal * 1e-6);
        assert_relative_eq!(schedule.total_principal(), principal, max_relative = 1e-6);
        assert_relative_eq!(
            schedule.total_paid(),
            schedule.payment() * 360.,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        assert_eq!(compute_payment(12000., 0., 12).unwrap(), 1000.);

        let schedule = generate_schedule(12000., 0., 12).unwrap();
        assert_eq!(schedule.len(), 12);
        for entry in &schedule {
            assert_eq!(entry.interest_portion, 0.);
            assert_eq!(entry.principal_portion, 1000.);
        }
        assert_eq!(schedule.get(12).unwrap().remaining_balance, 0.);
        assert_eq!(schedule.total_interest(), 0.);
    }

    #[test]
    fn test_zero_rate_uneven_split() {
        let payment = compute_payment(1000., 0., 3).unwrap();
        assert_eq!(payment, 1000. / 3.);

        let schedule = generate_schedule(1000., 0., 3).unwrap();
        assert!(schedule.last().unwrap().remaining_balance.abs() < 1000. * 1e-6);
    }

    #[test]
    fn test_single_period() {
        let payment = compute_payment(5000., 0.01, 1).unwrap();
        assert_relative_eq!(payment, 5000. * 1.01, max_relative = 1e-12);

        let schedule = generate_schedule(5000., 0.01, 1).unwrap();
        assert_eq!(schedule.len(), 1);
        let entry = schedule.get(1).unwrap();
        assert_relative_eq!(entry.interest_portion, 50., max_relative = 1e-12);
        assert!(entry.remaining_balance.abs() < 5000. * 1e-6);
    }

    #[test]
    fn test_schedule_properties_across_inputs() {
        for &(principal, rate, periods) in &[
            (1., 0.0001, 1),
            (350000., 0.045 / 12., 300),
            (25000., 0.12 / 12., 60),
            (80000., 0.25, 40),
            (150000., 1e-9, 240),
            (750000., 0.07 / 12., 480),
        ] {
            let schedule = generate_schedule(principal, rate, periods).unwrap();
            assert_eq!(schedule.len(), periods as usize);
            assert!(
                relative_eq!(schedule.total_principal(), principal, max_relative = 1e-6),
                "principal repaid {} != {} for rate {} over {}",
                schedule.total_principal(),
                principal,
                rate,
                periods
            );
            let last = schedule.last().unwrap();
            assert!(
                last.remaining_balance.abs() < principal * 1e-6,
                "final balance {} for rate {} over {}",
                last.remaining_balance,
                rate,
                periods
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let first = generate_schedule(123456.78, 0.0042, 180).unwrap();
        let second = generate_schedule(123456.78, 0.0042, 180).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_loan_input_matches_free_functions() {
        let input = LoanInput::new(200000., 0.005, 360).unwrap();
        assert_eq!(input.payment().unwrap(), compute_payment(200000., 0.005, 360).unwrap());
        assert_eq!(input.schedule().unwrap(), generate_schedule(200000., 0.005, 360).unwrap());
        assert_eq!(input.num_periods(), 360);
    }

    #[test]
    fn test_invalid_inputs() {
        let cases = [
            (0., 0.005, 360, "principal"),
            (-100., 0.005, 360, "principal"),
            (f64::NAN, 0.005, 360, "principal"),
            (f64::INFINITY, 0.005, 360, "principal"),
            (1000., -0.01, 12, "periodic_rate"),
            (1000., f64::NAN, 12, "periodic_rate"),
            (1000., f64::INFINITY, 12, "periodic_rate"),
            (1000., 0.01, 0, "num_periods"),
        ];
        for (principal, rate, periods, expected) in cases {
            match generate_schedule(principal, rate, periods) {
                Err(AmortizationError::InvalidInput { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected invalid {}, got {:?}", expected, other),
            }
            assert!(matches!(
                compute_payment(principal, rate, periods),
                Err(AmortizationError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_overflow_is_reported() {
        let result = compute_payment(100000., 1., 2000);
        assert!(matches!(result, Err(AmortizationError::NumericOverflow(_))));
        assert!(matches!(
            generate_schedule(100000., 1., 2000),
            Err(AmortizationError::NumericOverflow(_))
        ));
    }

    #[test]
    fn test_oversized_schedule_is_reported() {
        for periods in [MAX_SCHEDULE_PERIODS + 1, u32::MAX] {
            match generate_schedule(1000., 0., periods) {
                Err(AmortizationError::NumericOverflow(msg)) => {
                    assert_eq!(msg, format!("schedule of {} periods cannot be allocated", periods))
                }
                other => panic!("expected overflow for {} periods, got {:?}", periods, other),
            }
        }

        // the payment itself needs no schedule
        assert_eq!(compute_payment(1000., 0., u32::MAX).unwrap(), 1000. / f64::from(u32::MAX));

        let schedule = generate_schedule(1000., 0., MAX_SCHEDULE_PERIODS).unwrap();
        assert_eq!(schedule.len(), MAX_SCHEDULE_PERIODS as usize);
    }

    #[test]
    fn test_get_out_of_range() {
        let schedule = generate_schedule(12000., 0., 12).unwrap();
        assert!(schedule.get(0).is_none());
        assert!(schedule.get(13).is_none());
        assert_eq!(schedule.entries().len(), 12);
    }

    #[test]
    fn test_entry_display() {
        let entry = ScheduleEntry::new(1, 1000., 199.1010503, 199800.8989497);
        assert_eq!(
            entry.to_string(),
            "period 1, interest paid 1000.0000, principal paid 199.1011, remaining balance 199800.8989"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_schedule_serializes() {
        let schedule = generate_schedule(12000., 0., 12).unwrap();
        let json = serde_json::to_value(&schedule).unwrap();
        assert_eq!(json["payment"], 1000.0);
        assert_eq!(json["entries"][0]["period"], 1);
        assert_eq!(json["entries"][11]["remaining_balance"], 0.0);
    }
}
