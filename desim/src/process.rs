use derive_more::{Display, From, Into};
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};

use crate::{Error, Request, Resource, ResourceId, Scheduler, Wake};

/// Process ID, assigned in creation order.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ProcessId(usize);

/// This is what a process returns when it yields to the simulation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Effect {
    /// Suspend for the given amount of time, then resume with [`Wake::Timeout`].
    Timeout(f64),
    /// Request a slot of the resource. Resumes with [`Wake::Granted`]: right away if a slot is
    /// free, otherwise when the request reaches the head of the line and a slot is released.
    Request(ResourceId),
    /// The process has finished and will never be resumed again.
    Finish,
}

/// Interface for anything that can be suspended and resumed by the [`Simulation`].
///
/// Between two suspension points, the code of a process runs without interruption from any
/// other process.
///
/// [`Simulation`]: crate::Simulation
pub trait Process {
    /// Resumes the process, which runs until its next suspension point, returned as an [`Effect`].
    ///
    /// # Errors
    ///
    /// Any error returned here aborts the entire run.
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Effect, Error>;
}

/// What a process can see and do while it is being resumed.
pub struct Context<'a> {
    pub(crate) id: ProcessId,
    pub(crate) resources: &'a mut [Resource],
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) rng: &'a mut ChaChaRng,
}

impl<'a> Context<'a> {
    /// ID of the resumed process.
    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.scheduler.time()
    }

    /// Random number generator of the simulation.
    pub fn rng(&mut self) -> &mut ChaChaRng {
        &mut *self.rng
    }

    /// Read-only access to a resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownResource`] if there is no such resource in the simulation.
    pub fn resource(&self, id: ResourceId) -> Result<&Resource, Error> {
        self.resources
            .get(usize::from(id))
            .ok_or(Error::UnknownResource(id))
    }

    /// Releases a granted request. Does not suspend the caller.
    ///
    /// If the slot is handed over to a waiting process, that process is woken up with
    /// a zero-delay event, so it resumes after everything already due at this time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotHeld`] if the request is not holding a slot, and
    /// [`Error::UnknownResource`] if it was made on a resource from a different simulation.
    pub fn release(&mut self, request: &Request) -> Result<(), Error> {
        let now = self.scheduler.time();
        let resource = self
            .resources
            .get_mut(usize::from(request.resource()))
            .ok_or_else(|| Error::UnknownResource(request.resource()))?;
        if let Some(next) = resource.release(request.id(), now)? {
            self.scheduler
                .schedule_immediately(next.process(), Wake::Granted(next));
        }
        Ok(())
    }
}
