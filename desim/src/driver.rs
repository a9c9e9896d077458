use std::rc::Rc;

use crate::{
    Completion, DurationSampler, Error, Job, MetricsCollector, ResourceId, Route, RunResult,
    Simulation, WorkflowProcess,
};

/// A number of identical jobs to run through a route.
#[derive(Debug, Clone)]
pub struct JobUnits {
    route: Rc<Route>,
    job: Rc<Job>,
    quantity: usize,
}

impl JobUnits {
    /// Requests `quantity` jobs with attributes `job` following `route`.
    #[must_use]
    pub fn new(route: Rc<Route>, job: Job, quantity: usize) -> Self {
        Self {
            route,
            job: Rc::new(job),
            quantity,
        }
    }

    /// The route.
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Number of jobs.
    #[must_use]
    pub fn quantity(&self) -> usize {
        self.quantity
    }
}

/// Result of [`Driver::run`].
#[derive(Debug)]
pub struct RunOutput {
    /// Completed jobs, in order of completion.
    pub completed: Vec<WorkflowProcess>,
    /// Jobs still in progress (or not started) when the run stopped, in creation order.
    /// Their partial histories are kept for diagnostics only, and are not in `metrics`.
    pub incomplete: Vec<WorkflowProcess>,
    /// Stage records and completions of completed jobs.
    pub metrics: MetricsCollector,
    /// Simulation time at which the run stopped.
    pub end_time: f64,
    /// Whether the run drained all events or was cut short by the horizon.
    pub result: RunResult,
}

/// Sets up the stations, creates one process per job, and runs them up to a horizon.
pub struct Driver {
    simulation: Simulation<WorkflowProcess>,
    stagger: Option<Box<dyn DurationSampler>>,
}

impl Driver {
    /// Constructs a driver with an empty shop floor. The seed determines all sampled
    /// durations; see [`Simulation::new`].
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            simulation: Simulation::new(seed),
            stagger: None,
        }
    }

    /// Adds a station with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn add_resource<S: Into<String>>(
        &mut self,
        name: S,
        capacity: usize,
    ) -> Result<ResourceId, Error> {
        self.simulation.add_resource(name, capacity)
    }

    /// Delays the first stage of each job by a duration sampled from `sampler`.
    /// Without it, all jobs start at time 0.
    #[must_use]
    pub fn stagger<D: DurationSampler + 'static>(mut self, sampler: D) -> Self {
        self.stagger = Some(Box::new(sampler));
        self
    }

    /// Creates a process for every requested job, in order, and runs until no events are left
    /// at or before `horizon`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResource`] if a route uses a resource that was not added,
    /// [`Error::InvalidHorizon`] if the horizon is not positive, and any error aborting the run.
    pub fn run(mut self, units: &[JobUnits], horizon: f64) -> Result<RunOutput, Error> {
        if horizon.is_nan() || horizon <= 0.0 {
            return Err(Error::InvalidHorizon(horizon));
        }
        self.verify_routes(units)?;
        for unit in units {
            for _ in 0..unit.quantity {
                let delay = match &self.stagger {
                    Some(sampler) => sampler.sample(&unit.job, self.simulation.rng()),
                    None => 0.0,
                };
                let job = Rc::clone(&unit.job);
                let route = Rc::clone(&unit.route);
                self.simulation.spawn(delay, |id, created| {
                    WorkflowProcess::new(id, job, route, created)
                })?;
            }
        }
        log::info!(
            "Running {} jobs of {} kinds until {}",
            units.iter().map(JobUnits::quantity).sum::<usize>(),
            units.len(),
            horizon
        );
        let result = self.simulation.run_until(horizon)?;
        let end_time = self.simulation.time();

        let mut metrics = MetricsCollector::default();
        let completed: Vec<_> = self
            .simulation
            .take_finished()
            .into_iter()
            .map(|(_, process)| process)
            .collect();
        for process in &completed {
            for record in process.history() {
                metrics.record(process.id(), record.clone());
            }
            if let Some(completed) = process.completed() {
                metrics.complete(Completion {
                    process: process.id(),
                    kind: process.kind().to_string(),
                    created: process.created(),
                    completed,
                });
            }
        }
        let incomplete: Vec<_> = self
            .simulation
            .into_active()
            .into_iter()
            .map(|(_, process)| process)
            .collect();
        log::info!(
            "Completed {} jobs, {} incomplete",
            completed.len(),
            incomplete.len()
        );
        Ok(RunOutput {
            completed,
            incomplete,
            metrics,
            end_time,
            result,
        })
    }

    fn verify_routes(&self, units: &[JobUnits]) -> Result<(), Error> {
        for stage in units.iter().flat_map(|unit| unit.route.stages()) {
            if self.simulation.resource(stage.resource()).is_none() {
                return Err(Error::UnknownResource(stage.resource()));
            }
        }
        Ok(())
    }
}
