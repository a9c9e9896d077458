//! Tyre factory simulation.
//!
//! Tyres are built on a line of single-slot stations, in an order that depends on the tyre type,
//! and then cured in a bank of ovens. Orders come from a CSV file; the simulation itself is run
//! by [`desim`].

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use serde::{Deserialize, Serialize};

pub mod config;
pub use config::{CuringConfig, FactoryConfig, RouteStage, StationConfig};

mod factory;
pub use factory::{CuringTime, Factory, StageTime};

mod order;
pub use order::{load_orders, read_orders, TyreOrder};

pub mod report;

/// Type of tyre. Determines the route through the building stations and the base curing time.
#[derive(
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Hash,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
pub enum TyreType {
    /// Resilient tyre with soft and bond layers.
    #[strum(serialize = "Resilient-SoftBond")]
    #[serde(rename = "Resilient-SoftBond")]
    ResilientSoftBond,
    /// Resilient tyre without soft and bond layers.
    #[strum(serialize = "Resilient-Basic")]
    #[serde(rename = "Resilient-Basic")]
    ResilientBasic,
    /// Press-on tyre.
    #[strum(serialize = "Press-On")]
    #[serde(rename = "Press-On")]
    PressOn,
}

/// Tyre size, affecting curing time.
#[derive(
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Hash,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
pub enum TyreSize {
    #[allow(missing_docs)]
    Small,
    #[allow(missing_docs)]
    Medium,
    #[allow(missing_docs)]
    Large,
}

/// Temperature range an oven happens to run at, affecting curing time.
#[derive(
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Hash,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemperatureRange {
    #[allow(missing_docs)]
    Optimal,
    #[allow(missing_docs)]
    Acceptable,
    #[allow(missing_docs)]
    Minimum,
}

/// Job attribute holding the order's product ID.
pub const PID_ATTRIBUTE: &str = "pid";

/// Job attribute holding the tyre size.
pub const SIZE_ATTRIBUTE: &str = "size";
