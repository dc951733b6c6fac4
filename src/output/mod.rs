//! Output formatting for CLI results

use serde::Serialize;
use tabled::Tabled;

use rentkit::error::Result;

use crate::cli::OutputFormat;

pub mod json;
pub mod table;

/// Print display rows as a table, or `data` in the JSON envelope
pub fn print_rows<R, D>(rows: &[R], data: &D, format: OutputFormat) -> Result<()>
where
    R: Tabled,
    D: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => println!("{}", table::format_table(rows)),
        OutputFormat::Json => println!("{}", json::format_json(data)?),
    }
    Ok(())
}
