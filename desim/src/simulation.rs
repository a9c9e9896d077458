use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::{
    Acquire, ClockRef, Context, Effect, Error, Process, ProcessId, Resource, ResourceId,
    Scheduler, Wake,
};

/// The result of running the simulation up to a horizon.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// No more events are scheduled; every process has either finished or waits for
    /// something that will never happen.
    Drained,
    /// The horizon was reached with events still pending.
    Truncated,
}

/// The event loop. Owns processes, resources, the scheduler, and the random number generator.
///
/// Runs on a single thread: each fired event resumes exactly one process, which runs until
/// it suspends again, before the next event is fired.
pub struct Simulation<P> {
    scheduler: Scheduler,
    resources: Vec<Resource>,
    processes: Vec<Option<P>>,
    finished: Vec<(ProcessId, P)>,
    rng: ChaChaRng,
}

impl<P> Default for Simulation<P> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<P> Simulation<P> {
    /// Constructs an empty simulation. If `seed` is `None`, the random number generator is
    /// seeded from system entropy.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            scheduler: Scheduler::default(),
            resources: Vec::new(),
            processes: Vec::new(),
            finished: Vec::new(),
            rng: seed.map_or_else(ChaChaRng::from_entropy, ChaChaRng::seed_from_u64),
        }
    }

    /// Adds a new resource with the given number of slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn add_resource<S: Into<String>>(
        &mut self,
        name: S,
        capacity: usize,
    ) -> Result<ResourceId, Error> {
        let id = ResourceId::from(self.resources.len());
        self.resources.push(Resource::new(id, name, capacity)?);
        Ok(id)
    }

    /// Creates a process, and schedules its first resumption after `delay`.
    /// The process is constructed by `make`, which receives the ID assigned to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDelay`] if `delay` is negative.
    pub fn spawn<F>(&mut self, delay: f64, make: F) -> Result<ProcessId, Error>
    where
        F: FnOnce(ProcessId, f64) -> P,
    {
        let id = ProcessId::from(self.processes.len());
        self.scheduler.schedule(delay, id, Wake::Start)?;
        self.processes.push(Some(make(id, self.scheduler.time())));
        Ok(id)
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.scheduler.time()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        self.scheduler.clock()
    }

    /// Number of events waiting to be fired.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    /// All resources, indexed by their IDs.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Gets a resource by its ID.
    #[must_use]
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(usize::from(id))
    }

    /// Random number generator of the simulation, e.g., for sampling inter-arrival delays.
    pub fn rng(&mut self) -> &mut ChaChaRng {
        &mut self.rng
    }

    /// Iterates over the processes that have not finished yet, in creation order.
    pub fn active(&self) -> impl Iterator<Item = (ProcessId, &P)> {
        self.processes
            .iter()
            .enumerate()
            .filter_map(|(id, process)| process.as_ref().map(|p| (ProcessId::from(id), p)))
    }

    /// Takes out the processes that have finished so far, in the order they finished.
    pub fn take_finished(&mut self) -> Vec<(ProcessId, P)> {
        std::mem::take(&mut self.finished)
    }

    /// Consumes the simulation, returning the processes that have not finished, in creation
    /// order.
    #[must_use]
    pub fn into_active(self) -> Vec<(ProcessId, P)> {
        self.processes
            .into_iter()
            .enumerate()
            .filter_map(|(id, process)| process.map(|p| (ProcessId::from(id), p)))
            .collect()
    }
}

impl<P: Process> Simulation<P> {
    /// Fires the next event, if any, returning the ID of the process it resumed.
    ///
    /// The process keeps running as long as its requests are granted right away, and stops at
    /// the first timeout, wait in line, or when it finishes.
    ///
    /// # Errors
    ///
    /// Any error returned by the resumed process, or by handling its effects.
    pub fn advance(&mut self) -> Result<Option<ProcessId>, Error> {
        let entry = match self.scheduler.pop() {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let id = entry.process();
        let mut wake = entry.wake();
        log::trace!("[{}] Resuming process {}: {:?}", entry.time(), id, wake);
        let process = match self
            .processes
            .get_mut(usize::from(id))
            .and_then(Option::as_mut)
        {
            Some(process) => process,
            None => {
                log::warn!("[{}] Event for a finished process {}", entry.time(), id);
                return Ok(Some(id));
            }
        };
        let finished = loop {
            let effect = {
                let mut ctx = Context {
                    id,
                    resources: &mut self.resources,
                    scheduler: &mut self.scheduler,
                    rng: &mut self.rng,
                };
                process.resume(wake, &mut ctx)?
            };
            match effect {
                Effect::Timeout(delay) => {
                    self.scheduler.schedule(delay, id, Wake::Timeout)?;
                    break false;
                }
                Effect::Request(resource_id) => {
                    let now = self.scheduler.time();
                    let resource = self
                        .resources
                        .get_mut(usize::from(resource_id))
                        .ok_or(Error::UnknownResource(resource_id))?;
                    match resource.request(id, now) {
                        Acquire::Granted(request) => wake = Wake::Granted(request),
                        Acquire::Queued(_) => break false,
                    }
                }
                Effect::Finish => break true,
            }
        };
        if finished {
            if let Some(process) = self.processes[usize::from(id)].take() {
                log::debug!("[{}] Process {} finished", self.time(), id);
                self.finished.push((id, process));
            }
        }
        Ok(Some(id))
    }

    /// Fires events in order until none are left at or before `horizon`.
    ///
    /// An event due exactly at the horizon is still fired. Processes suspended past the horizon
    /// are never resumed. When `horizon` is finite, the clock is left at the horizon.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHorizon`] if `horizon` is not positive, or the first error
    /// encountered while firing events.
    pub fn run_until(&mut self, horizon: f64) -> Result<RunResult, Error> {
        if horizon.is_nan() || horizon <= 0.0 {
            return Err(Error::InvalidHorizon(horizon));
        }
        let result = loop {
            match self.scheduler.peek_time() {
                None => break RunResult::Drained,
                Some(time) if time > horizon => break RunResult::Truncated,
                Some(_) => {
                    self.advance()?;
                }
            }
        };
        if horizon.is_finite() {
            self.scheduler.advance_to(horizon);
        }
        log::info!(
            "[{}] Simulation stopped: {:?} ({} events pending)",
            self.time(),
            result,
            self.scheduler.len()
        );
        Ok(result)
    }

    /// Fires all remaining events.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered while firing events.
    pub fn run(&mut self) -> Result<(), Error> {
        while self.advance()?.is_some() {}
        Ok(())
    }
}
