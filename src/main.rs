use clap::{ArgAction, Parser, ValueEnum};
use log::{debug, info, LevelFilter};
use mortgage::repayment::round;
use mortgage::{format_currency, MortgageRequest, RepaymentData};
use simple_logger::SimpleLogger;
use std::error::Error;
use std::io::{self, Write};
use std::process;

/// Fixed-rate mortgage repayment calculator
#[derive(Parser, Debug)]
#[command(name = "mortgage", version, about)]
struct Cli {
    /// Purchase price of the property
    #[arg(long)]
    house_price: f64,

    /// Deposit paid up front
    #[arg(long, default_value_t = 0.)]
    deposit: f64,

    /// Annual interest rate as a percentage (e.g. 4.5)
    #[arg(long, allow_negative_numbers = true)]
    interest_rate: f64,

    /// Mortgage term in years
    #[arg(long)]
    term: u32,

    /// What to print after the monthly payment
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum OutputFormat {
    /// Month, interest, principal and remaining balance per payment
    Table,
    /// Chart series as CSV
    Csv,
    /// Monthly payment only
    Payment,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).env().init()?;

    let request = MortgageRequest::new(cli.house_price, cli.deposit, cli.interest_rate, cli.term);
    info!("calculating repayments for {:?}", request);
    let schedule = request.schedule()?;
    for entry in &schedule {
        debug!("{}", entry);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", payment_line(schedule.payment()))?;

    let data = RepaymentData::from(&schedule);
    match cli.format {
        OutputFormat::Table => show_repayment_table(&data, &mut out)?,
        OutputFormat::Csv => data.write_csv(&mut out)?,
        OutputFormat::Payment => {}
    }
    Ok(())
}

fn payment_line(payment: f64) -> String {
    format!("Monthly payment: {}", format_currency(round(payment, 2)))
}

fn show_repayment_table<W: Write>(data: &RepaymentData, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{:<10} {:>16} {:>16} {:>18}",
        "Month", "Interest", "Principal", "Remaining balance"
    )?;
    for i in 0..data.len() {
        writeln!(
            out,
            "{:<10} {:>16} {:>16} {:>18}",
            data.labels[i],
            format_currency(data.interest_payments[i]),
            format_currency(data.principal_payments[i]),
            format_currency(data.remaining_balances[i])
        )?;
    }
    Ok(())
}

// verifies that types can implement the gated traits below
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<mortgage::ScheduleEntry>();
    is_normal::<mortgage::Schedule>();
    is_normal::<RepaymentData>();
}

#[test]
fn cli_definition() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn payment_line_is_rounded_to_pence() {
    let payment = mortgage::compute_payment(200000., 0.005, 360).unwrap();
    assert_eq!(payment_line(payment), "Monthly payment: £1,199.10");
    assert_eq!(payment_line(0.004), "Monthly payment: £0.00");
}

#[test]
fn repayment_table_rows() {
    let schedule = mortgage::generate_schedule(12000., 0., 12).unwrap();
    let mut out = Vec::new();
    show_repayment_table(&RepaymentData::from(&schedule), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 13);
    assert!(lines[0].starts_with("Month"));
    assert!(lines[1].starts_with("Month 1 "));
    assert!(lines[1].ends_with("£11,000.00"));
    assert!(lines[12].ends_with("£0.00"));
}
