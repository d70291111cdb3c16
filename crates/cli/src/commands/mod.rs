//! Command handlers, one module per command group

pub mod card;
pub mod fraud;
pub mod history;
pub mod loan;
pub mod sponsor;
pub mod user;
pub mod wallet;

use anyhow::Result;
use serde::Serialize;

/// Print a result as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
