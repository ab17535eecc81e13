//! E2E tests driving the rigbooks binary over the fixtures in tests/data

use std::process::{Command, Output};

fn rigbooks(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rigbooks"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

const YEAR: [&str; 2] = ["--year", "2024-2025"];

/// Test the classification table for bank and cash inputs
#[test]
fn classify_table() {
    let output = rigbooks(&[
        "classify",
        YEAR[0],
        YEAR[1],
        "--bank",
        "tests/data/bank.csv",
        "--cash",
        "tests/data/cash.csv",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("CLASSIFIED TRANSACTIONS (FY 2024-2025)"));
    assert!(stdout.contains("Fuel"));
    assert!(stdout.contains("Meals (50%)"));
    assert!(stdout.contains("Shareholder draw"));
    assert!(stdout.contains("Greg 25.50 / Lilibeth 24.50"));
    assert!(stdout.contains("detailed"));
    assert!(stdout.contains("9 classified, 0 rejected, 0 duplicates dropped, 2 outside the fiscal year"));
}

/// Test CSV output of the classification
#[test]
fn classify_csv() {
    let output = rigbooks(&["classify", YEAR[0], YEAR[1], "--bank", "tests/data/bank.csv", "--csv"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("id,date,description,amount,category,rule,gst,deductible,receipt,split")
    );
    assert!(stdout.contains("bank-0003,2024-12-05,SHELL C01234,-105.00,Fuel,fuel,5.00,100.00,-,"));
    assert_eq!(stdout.lines().count(), 8);
}

/// Test bank rows that omit the trailing credit column
#[test]
fn classify_short_bank_rows() {
    let output = rigbooks(&["classify", YEAR[0], YEAR[1], "--bank", "tests/data/bank_short.csv", "--csv"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("bank-0001,2025-01-20,SHELL C01234,-63.00,Fuel,fuel,3.00,60.00,"));
    assert!(stdout.contains("bank-0002,2025-01-22,WIRE TSF ACME OIL INV 1010,1050.00,Revenue"));
}

/// Test the annual GST/HST return totals
#[test]
fn gst_annual_return() {
    let output = rigbooks(&["gst", YEAR[0], YEAR[1], "--bank", "tests/data/bank.csv", "--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["collected"], "500.00");
    assert_eq!(summary["itc"], "120.00");
    assert_eq!(summary["net"], "380.00");
    assert_eq!(summary["taxableRevenue"], "10000.00");
    assert_eq!(summary["collectedFrom"][0], "bank-0002");
}

/// Test a quarterly return in text form
#[test]
fn gst_quarter() {
    let output = rigbooks(&[
        "gst",
        YEAR[0],
        YEAR[1],
        "--bank",
        "tests/data/bank.csv",
        "--quarter",
        "1",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("FY 2024-2025 Q1: 2024-12-01 to 2025-02-28"));
    assert!(stdout.contains("Balance owing: $380.00"));
}

/// Test that an uncategorized transaction blocks the return
#[test]
fn gst_incomplete_period_fails() {
    let output = rigbooks(&["gst", YEAR[0], YEAR[1], "--bank", "tests/data/review.csv"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("incomplete"), "stderr: {}", stderr);
    assert!(stderr.contains("bank-0001"), "stderr: {}", stderr);
}

/// Test validation exits 1 and lists every problem
#[test]
fn validate_reports_issues() {
    let output = rigbooks(&["validate", YEAR[0], YEAR[1], "--bank", "tests/data/review.csv", "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["issueCount"], 3);
    assert_eq!(report["issues"][0]["kind"], "rejected");
    assert_eq!(report["issues"][1]["kind"], "duplicate");
    assert_eq!(report["issues"][2]["kind"], "uncategorized");
}

/// Test validation of clean input succeeds
#[test]
fn validate_clean_input() {
    let output = rigbooks(&["validate", YEAR[0], YEAR[1], "--bank", "tests/data/bank.csv"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("No issues found."));
}

/// Test cash receipts are flagged for review
#[test]
fn validate_flags_receipts() {
    let output = rigbooks(&["validate", YEAR[0], YEAR[1], "--cash", "tests/data/cash.csv"]);
    let stdout = stdout(&output);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("[receipt] cash-0002"));
    assert!(stdout.contains("detailed receipt required"));
}

/// Test the loan ledger with opening balances and manual entries
#[test]
fn loans_ledger_and_deadlines() {
    let output = rigbooks(&[
        "loans",
        YEAR[0],
        YEAR[1],
        "--bank",
        "tests/data/bank.csv",
        "--entries",
        "tests/data/loans.csv",
        "--opening",
        "Lilibeth=300.00",
        "--as-of",
        "2025-12-15",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let ledger: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ledger["closing"]["Greg"], "0.00");
    assert_eq!(ledger["closing"]["Lilibeth"], "398.00");
    assert_eq!(ledger["entries"].as_array().unwrap().len(), 3);
    assert_eq!(ledger["violations"].as_array().unwrap().len(), 1);
    assert_eq!(ledger["violations"][0]["shareholder"], "Lilibeth");
    assert_eq!(ledger["violations"][0]["deadline"], "2025-11-30");
    assert_eq!(ledger["violations"][0]["outstanding"], "300.00");
    assert_eq!(ledger["nextPeriod"], "2025-2026");
    assert_eq!(ledger["nextOpening"]["Lilibeth"], "398.00");
}

/// Test balances part way through the year, before the repayment
#[test]
fn loans_balances_as_of() {
    let output = rigbooks(&[
        "loans",
        YEAR[0],
        YEAR[1],
        "--bank",
        "tests/data/bank.csv",
        "--entries",
        "tests/data/loans.csv",
        "--opening",
        "Lilibeth=300.00",
        "--as-of",
        "2025-02-01",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let ledger: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ledger["balancesAsOf"]["Greg"], "102.00");
    assert_eq!(ledger["balancesAsOf"]["Lilibeth"], "398.00");
    assert_eq!(ledger["closing"]["Greg"], "0.00");
    assert!(ledger["violations"].as_array().unwrap().is_empty());
}

/// Test the income statement for a date range inside the fiscal year
#[test]
fn summary_income_statement() {
    let output = rigbooks(&[
        "summary",
        YEAR[0],
        YEAR[1],
        "--bank",
        "tests/data/bank.csv",
        "--from",
        "2024-12-01",
        "--to",
        "2024-12-31",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let statement: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(statement["revenue"], "10000.00");
    assert_eq!(statement["expenses"][0]["category"], "fuel");
    assert_eq!(statement["expenses"][0]["amount"], "100.00");
    assert_eq!(statement["expenses"][1]["category"], "meals");
    assert_eq!(statement["expenses"][1]["amount"], "20.50");
    assert_eq!(statement["totalExpenses"], "120.50");
    assert_eq!(statement["netIncome"], "9879.50");
}

/// Test the formatted income statement for a quarter
#[test]
fn summary_quarter_table() {
    let output = rigbooks(&[
        "summary",
        YEAR[0],
        YEAR[1],
        "--bank",
        "tests/data/bank.csv",
        "--quarter",
        "1",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("INCOME STATEMENT (FY 2024-2025 Q1: 2024-12-01 to 2025-02-28)"));
    assert!(stdout.contains("Fuel"));
    assert!(stdout.contains("$10,000.00"));
    assert!(!stdout.contains("Shareholder draw"));
}

/// Test a summary range outside the fiscal year is rejected
#[test]
fn summary_range_outside_year_fails() {
    let output = rigbooks(&[
        "summary",
        YEAR[0],
        YEAR[1],
        "--bank",
        "tests/data/bank.csv",
        "--from",
        "2025-12-01",
    ]);
    assert!(!output.status.success());
}

/// Test T5 slips from a dividends file with payer details from config
#[test]
fn t5_slips() {
    let output = rigbooks(&[
        "t5",
        YEAR[0],
        YEAR[1],
        "--config",
        "tests/data/config.json",
        "--dividends",
        "tests/data/dividends.csv",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("Payer: Rig Services Ltd. (BN 123456789RC0001)"));
    assert!(stdout.contains("1380.00"));
    assert!(stdout.contains("207.00"));
    assert!(stdout.contains("690.00"));
    assert!(stdout.contains("103.50"));
    assert!(stdout.contains("230.00"));
    assert!(stdout.contains("20.77"));
    assert!(!stdout.contains("750.00"));
}

/// Test eligible and non-eligible dividends land in separate boxes
#[test]
fn t5_dividend_types() {
    let output = rigbooks(&[
        "t5",
        YEAR[0],
        YEAR[1],
        "--dividends",
        "tests/data/dividends.csv",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let slips: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(slips.as_array().unwrap().len(), 2);
    assert_eq!(slips[0]["shareholder"], "Greg");
    assert_eq!(slips[0]["otherThanEligible"]["actual"], "0.00");
    let lilibeth = &slips[1];
    assert_eq!(lilibeth["shareholder"], "Lilibeth");
    assert_eq!(lilibeth["paymentCount"], 2);
    assert_eq!(lilibeth["eligible"]["actual"], "500.00");
    assert_eq!(lilibeth["eligible"]["taxable"], "690.00");
    assert_eq!(lilibeth["otherThanEligible"]["actual"], "200.00");
    assert_eq!(lilibeth["otherThanEligible"]["taxable"], "230.00");
    assert_eq!(lilibeth["otherThanEligible"]["taxCredit"], "20.77");
}

/// Test a declared dividend is split by ownership
#[test]
fn t5_declared_dividend() {
    let output = rigbooks(&[
        "t5",
        YEAR[0],
        YEAR[1],
        "--declare",
        "10000",
        "--date",
        "2025-11-01",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let slips: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(slips[0]["shareholder"], "Greg");
    assert_eq!(slips[0]["eligible"]["actual"], "5100.00");
    assert_eq!(slips[1]["shareholder"], "Lilibeth");
    assert_eq!(slips[1]["eligible"]["actual"], "4900.00");
}

/// Test a declared non-eligible dividend uses the other-than-eligible boxes
#[test]
fn t5_declared_non_eligible_dividend() {
    let output = rigbooks(&[
        "t5",
        YEAR[0],
        YEAR[1],
        "--declare",
        "1000",
        "--date",
        "2025-11-01",
        "--type",
        "non-eligible",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let slips: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(slips[0]["otherThanEligible"]["actual"], "510.00");
    assert_eq!(slips[0]["otherThanEligible"]["taxable"], "586.50");
    assert_eq!(slips[1]["otherThanEligible"]["actual"], "490.00");
}

/// Test the schema command prints CSV column descriptions
#[test]
fn schema_csv_fields() {
    let output = rigbooks(&["schema", "csv-fields"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("Bank statement"));
    assert!(stdout.contains("debit"));
    assert!(stdout.contains("(optional)"));
    assert!(stdout.contains("shareholder"));
}

/// Test the JSON schema of the configuration
#[test]
fn schema_json() {
    let output = rigbooks(&["schema"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(schema["properties"]["splitAllocations"].is_object());
    assert!(schema["properties"]["gstRate"].is_object());
}

/// Test a fiscal year label that does not match the year-end
#[test]
fn invalid_year_rejected() {
    let output = rigbooks(&["classify", "--year", "2024", "--bank", "tests/data/bank.csv"]);
    assert!(!output.status.success());
}
