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

//! Discrete-event simulation of jobs flowing through finite-capacity stations.
//!
//! The building blocks, from the bottom up:
//!
//! - [`Scheduler`] keeps the virtual clock and a queue of pending wake-ups,
//! - [`Resource`] is a station with a fixed number of slots and a FIFO waiting line,
//! - [`Process`] is anything that can be suspended and resumed by the event loop,
//!   and [`Simulation`] is the event loop itself,
//! - [`WorkflowProcess`] walks a single job through a [`Route`] of stages,
//! - [`MetricsCollector`] keeps stage records of finished jobs and aggregates them,
//! - [`Driver`] puts all of the above together for a batch of job units.
//!
//! # Examples
//!
//! ```
//! # use desim::*;
//! # fn main() -> Result<(), Error> {
//! let mut driver = Driver::new(Some(17));
//! let oven = driver.add_resource("oven", 1)?;
//! let route = Route::new("bread", vec![StageDefinition::fixed("bake", oven, 10.0)]);
//! let output = driver.run(&[JobUnits::new(route, Job::new("bread"), 2)], 100.0)?;
//! let finished: Vec<_> = output.completed.iter().map(WorkflowProcess::completed).collect();
//! assert_eq!(finished, vec![Some(10.0), Some(20.0)]);
//! # Ok(())
//! # }
//! ```

use std::cell::Cell;
use std::rc::Rc;

/// Simulation clock. Virtual time is a non-negative number of arbitrary time units.
pub type Clock = Rc<Cell<f64>>;

pub use driver::{Driver, JobUnits, RunOutput};
pub use error::Error;
pub use metrics::{Aggregates, Completion, KindAggregate, MetricsCollector, StageAggregate, Summary};
pub use process::{Context, Effect, Process, ProcessId};
pub use resource::{Acquire, Request, RequestId, Resource, ResourceId};
pub use scheduler::{ClockRef, EventEntry, Scheduler, Wake};
pub use simulation::{RunResult, Simulation};
pub use workflow::{DurationSampler, Job, Route, StageDefinition, StageRecord, WorkflowProcess};

mod driver;
mod error;
mod metrics;
mod process;
mod resource;
mod scheduler;
mod simulation;
mod workflow;
