use std::collections::BTreeMap;
use std::rc::Rc;
use std::str::FromStr;

use desim::{
    Driver, DurationSampler, Job, JobUnits, ResourceId, Route, RunOutput, StageDefinition,
};
use eyre::{ensure, eyre, WrapErr};
use rand::seq::SliceRandom;
use rand::RngCore;
use rand_distr::{Distribution, Uniform};
use strum::IntoEnumIterator;

use crate::{FactoryConfig, TyreOrder, TyreSize, TyreType, PID_ATTRIBUTE, SIZE_ATTRIBUTE};

const SECONDS_PER_MINUTE: f64 = 60.0;

fn uniform(low: f64, high: f64) -> eyre::Result<Uniform<f64>> {
    ensure!(
        low.is_finite() && high.is_finite() && low >= 0.0 && low <= high,
        "invalid duration range: [{}, {}]",
        low,
        high
    );
    Ok(Uniform::new_inclusive(low, high))
}

/// Duration of a building stage: uniform in a range given in seconds, sampled in minutes.
#[derive(Debug, Clone, Copy)]
pub struct StageTime {
    distribution: Uniform<f64>,
}

impl StageTime {
    /// Constructs a sampler for durations between `low` and `high` seconds, inclusive.
    ///
    /// # Errors
    ///
    /// Returns an error if either bound is negative or not finite, or if `low > high`.
    pub fn from_seconds(low: f64, high: f64) -> eyre::Result<Self> {
        Ok(Self {
            distribution: uniform(low / SECONDS_PER_MINUTE, high / SECONDS_PER_MINUTE)?,
        })
    }
}

impl DurationSampler for StageTime {
    fn sample(&self, _: &Job, rng: &mut dyn RngCore) -> f64 {
        self.distribution.sample(rng)
    }
}

/// Duration of curing, in minutes.
///
/// It is the sum of a fixed base time, an adjustment for a temperature range chosen at random,
/// and an adjustment for the size read from the job's [`SIZE_ATTRIBUTE`].
/// A job without a valid size gets a NaN duration, which aborts the run.
#[derive(Debug, Clone)]
pub struct CuringTime {
    base: f64,
    temperature: Vec<f64>,
    size: BTreeMap<TyreSize, f64>,
}

impl CuringTime {
    /// Constructs a curing time sampler.
    #[must_use]
    pub fn new(base: f64, temperature: Vec<f64>, size: BTreeMap<TyreSize, f64>) -> Self {
        Self {
            base,
            temperature,
            size,
        }
    }

    fn size_adjustment(&self, job: &Job) -> Option<f64> {
        let size = TyreSize::from_str(job.attribute(SIZE_ATTRIBUTE)?).ok()?;
        self.size.get(&size).copied()
    }
}

impl DurationSampler for CuringTime {
    fn sample(&self, job: &Job, rng: &mut dyn RngCore) -> f64 {
        let temperature = self.temperature.choose(rng).copied().unwrap_or(0.0);
        match self.size_adjustment(job) {
            Some(size) => self.base + temperature + size,
            None => {
                log::error!("Cannot determine curing time of {:?}", job);
                f64::NAN
            }
        }
    }
}

/// The shop floor: stations and one route per tyre type, ready to run orders.
pub struct Factory {
    driver: Driver,
    routes: BTreeMap<TyreType, Rc<Route>>,
}

impl Factory {
    /// Builds stations and routes from `config`, seeded with `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not pass [`FactoryConfig::verify`].
    pub fn new(config: &FactoryConfig) -> eyre::Result<Self> {
        config.verify().wrap_err("invalid factory configuration")?;
        let mut driver = Driver::new(config.seed);
        if let Some((low, high)) = config.arrival_stagger {
            let distribution = uniform(low, high).wrap_err("invalid arrival stagger")?;
            driver =
                driver.stagger(move |_: &Job, rng: &mut dyn RngCore| distribution.sample(rng));
        }
        let mut stations: BTreeMap<&str, ResourceId> = BTreeMap::new();
        for station in &config.stations {
            let id = driver
                .add_resource(station.name.as_str(), station.capacity)
                .wrap_err_with(|| format!("unable to create station `{}`", station.name))?;
            stations.insert(&station.name, id);
        }
        let station = |name: &str| {
            stations
                .get(name)
                .copied()
                .ok_or_else(|| eyre!("undefined station `{}`", name))
        };
        let curing_station = station(&config.curing.station)?;
        let temperature: Vec<f64> = config.curing.temperature.values().copied().collect();
        let mut routes = BTreeMap::new();
        for tyre_type in TyreType::iter() {
            let mut stages = config
                .routes
                .get(&tyre_type)
                .ok_or_else(|| eyre!("missing route for {}", tyre_type))?
                .iter()
                .map(|stage| -> eyre::Result<StageDefinition> {
                    let (low, high) = config.stage_range(&stage.stage);
                    Ok(StageDefinition::new(
                        stage.stage.as_str(),
                        station(&stage.station)?,
                        StageTime::from_seconds(low, high)
                            .wrap_err_with(|| format!("invalid duration of {}", stage.stage))?,
                    ))
                })
                .collect::<eyre::Result<Vec<_>>>()?;
            let base = config
                .curing
                .base
                .get(&tyre_type)
                .copied()
                .ok_or_else(|| eyre!("missing base curing time for {}", tyre_type))?;
            stages.push(StageDefinition::new(
                config.curing.stage.as_str(),
                curing_station,
                CuringTime::new(base, temperature.clone(), config.curing.size.clone()),
            ));
            routes.insert(tyre_type, Route::new(tyre_type.to_string(), stages));
        }
        Ok(Self { driver, routes })
    }

    /// The route of the given tyre type.
    #[must_use]
    pub fn route(&self, tyre_type: TyreType) -> Option<&Route> {
        self.routes.get(&tyre_type).map(Rc::as_ref)
    }

    /// Runs all `orders` until `horizon` minutes pass.
    ///
    /// Tyres enter the line in the order they are listed, all of one order before the next.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulation aborts, which means the configuration is invalid.
    pub fn run(self, orders: &[TyreOrder], horizon: f64) -> eyre::Result<RunOutput> {
        let units = orders
            .iter()
            .map(|order| -> eyre::Result<JobUnits> {
                let route = self
                    .routes
                    .get(&order.tyre_type)
                    .ok_or_else(|| eyre!("no route for {}", order.tyre_type))?;
                let job = Job::new(order.tyre_type.to_string())
                    .with(PID_ATTRIBUTE, order.pid.as_str())
                    .with(SIZE_ATTRIBUTE, order.size.to_string())
                    .with("brand", order.brand.as_str())
                    .with("tread_pattern", order.tread_pattern.as_str());
                Ok(JobUnits::new(Rc::clone(route), job, order.quantity))
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        self.driver
            .run(&units, horizon)
            .wrap_err("simulation aborted")
    }
}
