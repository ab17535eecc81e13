//! Schema command - print expected input formats

use crate::core::{BankRow, CashExpenseRow, CsvColumn, DividendRow, LedgerRow, RuleSetConfig};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the rule-set configuration
    JsonSchema,
    /// The built-in rule set, as a starting configuration file
    DefaultConfig,
    /// CSV column descriptions for every input file
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(RuleSetConfig);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::DefaultConfig => {
                println!("{}", serde_json::to_string_pretty(&RuleSetConfig::default())?);
            }
            SchemaFormat::CsvFields => {
                print_columns("Bank statement (--bank, no header row)", BankRow::csv_columns());
                print_columns("Cash expenses (--cash)", CashExpenseRow::csv_columns());
                print_columns("Loan entries (loans --entries)", LedgerRow::csv_columns());
                print_columns("Dividends (t5 --dividends)", DividendRow::csv_columns());
            }
        }
        Ok(())
    }
}

fn print_columns(title: &str, columns: &[CsvColumn]) {
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    for column in columns {
        let req = if column.required { "required" } else { "optional" };
        println!("{:20} ({:8})  {}", column.name, req, column.description);
    }
    println!();
}
