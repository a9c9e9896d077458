//! Factory layout and timing, typically loaded from a YAML file.
//!
//! Every field has a default, and the defaults describe the reference factory:
//! eight single-slot building stations, twelve curing ovens, and an eight-hour shift.

use std::collections::BTreeMap;
use std::io::Read;

use eyre::{ensure, WrapErr};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{TemperatureRange, TyreSize, TyreType};

/// A station and its number of slots.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct StationConfig {
    /// Station name, referenced by route stages.
    pub name: String,
    /// Number of tyres that can be processed at the same time.
    pub capacity: usize,
}

impl StationConfig {
    fn new(name: &str, capacity: usize) -> Self {
        Self {
            name: String::from(name),
            capacity,
        }
    }
}

/// A building stage: the name it is reported under, and the station where it happens.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RouteStage {
    /// Stage name used in statistics and for looking up its duration.
    pub stage: String,
    /// Name of the station.
    pub station: String,
}

impl RouteStage {
    fn new(stage: &str, station: &str) -> Self {
        Self {
            stage: String::from(stage),
            station: String::from(station),
        }
    }

    fn same(name: &str) -> Self {
        Self::new(name, name)
    }
}

/// Curing time, in minutes, is the sum of the base time for the tyre type, an adjustment for
/// the temperature range the oven is running at, and an adjustment for the tyre size.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct CuringConfig {
    /// Name of the oven station.
    pub station: String,
    /// Name under which curing is reported.
    pub stage: String,
    /// Base time per tyre type.
    pub base: BTreeMap<TyreType, f64>,
    /// Adjustment per temperature range. Each range is equally likely.
    pub temperature: BTreeMap<TemperatureRange, f64>,
    /// Adjustment per tyre size.
    pub size: BTreeMap<TyreSize, f64>,
}

impl Default for CuringConfig {
    fn default() -> Self {
        Self {
            station: String::from("curing_ovens"),
            stage: String::from("curing"),
            base: vec![
                (TyreType::ResilientSoftBond, 120.0),
                (TyreType::ResilientBasic, 100.0),
                (TyreType::PressOn, 90.0),
            ]
            .into_iter()
            .collect(),
            temperature: vec![
                (TemperatureRange::Optimal, 0.0),
                (TemperatureRange::Acceptable, 20.0),
                (TemperatureRange::Minimum, 40.0),
            ]
            .into_iter()
            .collect(),
            size: vec![
                (TyreSize::Small, 0.0),
                (TyreSize::Medium, 15.0),
                (TyreSize::Large, 30.0),
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// Simulation configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct FactoryConfig {
    /// Length of the simulated shift, in minutes.
    pub horizon: f64,
    /// Random seed. If missing, results differ between runs.
    pub seed: Option<u64>,
    /// All stations, including the ovens.
    pub stations: Vec<StationConfig>,
    /// Building stages of each tyre type, in order. Curing always follows.
    pub routes: BTreeMap<TyreType, Vec<RouteStage>>,
    /// Range of building stage durations in seconds, per stage name.
    pub stage_seconds: BTreeMap<String, (f64, f64)>,
    /// Range of building stage durations in seconds for stages missing in `stage_seconds`.
    pub default_stage_seconds: (f64, f64),
    /// Curing parameters.
    pub curing: CuringConfig,
    /// If present, each tyre enters the line after a delay drawn uniformly from this range,
    /// in minutes. Otherwise, all tyres are released at the beginning of the shift.
    pub arrival_stagger: Option<(f64, f64)>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        let routes = vec![
            (
                TyreType::ResilientSoftBond,
                vec![
                    RouteStage::same("wrap_inner_heal"),
                    RouteStage::same("apply_bead"),
                    RouteStage::same("wrap_heal"),
                    RouteStage::new("wrap_bond", "resilient_bond"),
                    RouteStage::same("wrap_soft"),
                    RouteStage::same("wrap_tread"),
                    RouteStage::same("press"),
                ],
            ),
            (
                TyreType::ResilientBasic,
                vec![
                    RouteStage::same("wrap_inner_heal"),
                    RouteStage::same("apply_bead"),
                    RouteStage::same("wrap_heal"),
                    RouteStage::same("wrap_tread"),
                    RouteStage::same("press"),
                ],
            ),
            (
                TyreType::PressOn,
                vec![
                    RouteStage::new("wrap_bond", "press_on_bond"),
                    RouteStage::same("wrap_soft"),
                    RouteStage::same("wrap_tread"),
                    RouteStage::same("press"),
                ],
            ),
        ];
        Self {
            horizon: 480.0,
            seed: None,
            stations: vec![
                StationConfig::new("wrap_inner_heal", 1),
                StationConfig::new("apply_bead", 1),
                StationConfig::new("wrap_heal", 1),
                StationConfig::new("resilient_bond", 1),
                StationConfig::new("press_on_bond", 1),
                StationConfig::new("wrap_soft", 1),
                StationConfig::new("wrap_tread", 1),
                StationConfig::new("press", 1),
                StationConfig::new("curing_ovens", 12),
            ],
            routes: routes.into_iter().collect(),
            stage_seconds: vec![
                (String::from("wrap_inner_heal"), (40.0, 50.0)),
                (String::from("press"), (120.0, 300.0)),
            ]
            .into_iter()
            .collect(),
            default_stage_seconds: (45.0, 55.0),
            curing: CuringConfig::default(),
            arrival_stagger: None,
        }
    }
}

impl FactoryConfig {
    /// Load config from YAML. Missing fields take their default values.
    ///
    /// # Example
    ///
    /// ```
    /// # use tyresim::{FactoryConfig, TyreType};
    /// # fn main() -> eyre::Result<()> {
    /// let input = r#"
    /// horizon: 960
    /// seed: 17
    /// stage_seconds:
    ///     press: [60, 90]
    /// curing:
    ///     base:
    ///         Resilient-SoftBond: 110
    ///         Resilient-Basic: 100
    ///         Press-On: 80"#;
    /// let config = FactoryConfig::from_yaml(std::io::Cursor::new(input))?;
    /// assert_eq!(config.horizon, 960.0);
    /// assert_eq!(config.seed, Some(17));
    /// assert_eq!(config.stage_seconds["press"], (60.0, 90.0));
    /// assert_eq!(config.curing.base[&TyreType::PressOn], 80.0);
    /// assert_eq!(config.stations.len(), 9);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Error will be returned either if the input cannot be parsed, or if the configuration is
    /// inconsistent, which happens if any of these are true:
    /// - the horizon is not positive,
    /// - a station has zero capacity or is defined twice,
    /// - a route uses an undefined station, or a tyre type has no route,
    /// - a duration range is negative, reversed, or not finite,
    /// - curing times are missing for a tyre type, size, or there are no temperature ranges.
    pub fn from_yaml<R: Read>(reader: R) -> eyre::Result<Self> {
        let config: Self = serde_yaml::from_reader(reader).wrap_err("failed to parse config")?;
        config.verify()?;
        Ok(config)
    }

    /// Checks that the configuration is consistent. See [`FactoryConfig::from_yaml`] for the
    /// list of checks.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found.
    pub fn verify(&self) -> eyre::Result<()> {
        ensure!(
            self.horizon > 0.0,
            "horizon must be positive ({})",
            self.horizon
        );
        for (idx, station) in self.stations.iter().enumerate() {
            ensure!(
                station.capacity > 0,
                "station `{}` must have positive capacity",
                station.name
            );
            ensure!(
                self.stations[..idx].iter().all(|s| s.name != station.name),
                "station `{}` defined more than once",
                station.name
            );
        }
        for tyre_type in TyreType::iter() {
            let route = self.routes.get(&tyre_type);
            ensure!(route.is_some(), "missing route for {}", tyre_type);
            for stage in route.into_iter().flatten() {
                ensure!(
                    self.has_station(&stage.station),
                    "route of {} uses undefined station `{}`",
                    tyre_type,
                    stage.station
                );
            }
            ensure!(
                self.curing.base.contains_key(&tyre_type),
                "missing base curing time for {}",
                tyre_type
            );
        }
        for size in TyreSize::iter() {
            ensure!(
                self.curing.size.contains_key(&size),
                "missing curing adjustment for size {}",
                size
            );
        }
        ensure!(
            !self.curing.temperature.is_empty(),
            "at least one temperature range required"
        );
        ensure!(
            self.has_station(&self.curing.station),
            "undefined curing station `{}`",
            self.curing.station
        );
        let ranges = self
            .stage_seconds
            .iter()
            .map(|(stage, range)| (stage.as_str(), *range))
            .chain(std::iter::once(("default", self.default_stage_seconds)))
            .chain(self.arrival_stagger.map(|range| ("arrival stagger", range)));
        for (name, (low, high)) in ranges {
            ensure!(
                low.is_finite() && high.is_finite() && low >= 0.0 && low <= high,
                "invalid {} duration range: [{}, {}]",
                name,
                low,
                high
            );
        }
        let curing_times = self
            .curing
            .base
            .values()
            .chain(self.curing.temperature.values())
            .chain(self.curing.size.values());
        for &time in curing_times {
            ensure!(
                time.is_finite() && time >= 0.0,
                "curing times must be finite and non-negative ({})",
                time
            );
        }
        Ok(())
    }

    fn has_station(&self, name: &str) -> bool {
        self.stations.iter().any(|s| s.name == name)
    }

    /// Range of durations, in seconds, of the given building stage.
    #[must_use]
    pub fn stage_range(&self, stage: &str) -> (f64, f64) {
        self.stage_seconds
            .get(stage)
            .copied()
            .unwrap_or(self.default_stage_seconds)
    }
}
