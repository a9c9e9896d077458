use crate::{ProcessId, RequestId, ResourceId};

/// Contract violations detected by the simulation kernel.
///
/// None of these are expected during a correctly configured run; they abort it.
/// Jobs left unfinished at the horizon are not errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A timeout or sampled duration was negative or not a number.
    #[error("invalid delay: {0}")]
    InvalidDelay(f64),
    /// Released a request that was never granted or has already been released.
    #[error("request {request} is not held on resource {resource}")]
    NotHeld {
        /// Resource the release was attempted on.
        resource: ResourceId,
        /// The offending request.
        request: RequestId,
    },
    /// Resource constructed with zero capacity.
    #[error("invalid capacity of resource `{name}`: {capacity}")]
    InvalidCapacity {
        /// Name of the resource.
        name: String,
        /// Requested capacity.
        capacity: usize,
    },
    /// A run was requested with a non-positive horizon.
    #[error("invalid horizon: {0}")]
    InvalidHorizon(f64),
    /// A resource ID that does not belong to this simulation.
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),
    /// A process was resumed for a reason it was not waiting for.
    #[error("process {process} resumed unexpectedly: {reason}")]
    UnexpectedWake {
        /// The resumed process.
        process: ProcessId,
        /// Description of the wake-up.
        reason: String,
    },
}
