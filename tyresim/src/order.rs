use std::fs::File;
use std::io::Read;
use std::path::Path;

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::{TyreSize, TyreType};

/// A single line of the order sheet: a number of identical tyres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TyreOrder {
    /// Product ID.
    #[serde(rename = "PID")]
    pub pid: String,
    #[allow(missing_docs)]
    #[serde(rename = "TyreType")]
    pub tyre_type: TyreType,
    #[allow(missing_docs)]
    #[serde(rename = "Brand")]
    pub brand: String,
    #[allow(missing_docs)]
    #[serde(rename = "TreadPattern")]
    pub tread_pattern: String,
    #[allow(missing_docs)]
    #[serde(rename = "Size")]
    pub size: TyreSize,
    /// Number of tyres to produce.
    #[serde(rename = "Quantity")]
    pub quantity: usize,
}

/// Reads orders in CSV format with header `PID,TyreType,Brand,TreadPattern,Size,Quantity`.
///
/// # Errors
///
/// Returns an error if the input is not valid CSV, a column is missing, or a tyre type,
/// size or quantity is invalid. The error points to the offending record.
pub fn read_orders<R: Read>(reader: R) -> eyre::Result<Vec<TyreOrder>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let orders = reader
        .deserialize()
        .enumerate()
        .map(|(idx, record)| record.wrap_err_with(|| format!("invalid order #{}", idx + 1)))
        .collect::<eyre::Result<Vec<TyreOrder>>>()?;
    log::info!(
        "Loaded {} orders of {} tyres",
        orders.len(),
        orders.iter().map(|o| o.quantity).sum::<usize>()
    );
    Ok(orders)
}

/// Loads orders from a CSV file. See [`read_orders`].
///
/// # Errors
///
/// Returns an error if the file cannot be opened or any order is invalid.
pub fn load_orders<P: AsRef<Path>>(path: P) -> eyre::Result<Vec<TyreOrder>> {
    let path = path.as_ref();
    let file = File::open(path)
        .wrap_err_with(|| format!("unable to open orders file: {}", path.display()))?;
    read_orders(file).wrap_err_with(|| format!("unable to read orders from {}", path.display()))
}
