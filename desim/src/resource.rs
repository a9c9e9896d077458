//! A station with a fixed number of slots, and a first-come-first-served line of processes
//! waiting for one of them.

use std::collections::VecDeque;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::{Error, ProcessId};

/// Resource ID.
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
pub struct ResourceId(usize);

/// Request ID, unique within a single resource.
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
pub struct RequestId(usize);

/// A claim on a resource slot made by a process.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Request {
    id: RequestId,
    resource: ResourceId,
    process: ProcessId,
    enqueued: f64,
    granted: Option<f64>,
    queue_length: usize,
}

impl Request {
    /// The ID of this request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The resource that is requested.
    #[must_use]
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// The requesting process.
    #[must_use]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// The time of the simulation when the request was made.
    #[must_use]
    pub fn enqueue_time(&self) -> f64 {
        self.enqueued
    }

    /// The time of the simulation when the request was granted, if it was.
    #[must_use]
    pub fn grant_time(&self) -> Option<f64> {
        self.granted
    }

    /// Number of requests still waiting on the resource right after this one was granted.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.queue_length
    }
}

/// Outcome of [`Resource::request`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Acquire {
    /// A slot was free, and the request holds it now.
    Granted(Request),
    /// All slots are taken; the request waits in line.
    Queued(Request),
}

/// A resource with a limited number of slots.
///
/// At most `capacity` requests are held at any time. Requests that cannot be granted right away
/// wait in line and are granted strictly in the order they arrived, one per release.
#[derive(Debug)]
pub struct Resource {
    id: ResourceId,
    name: String,
    capacity: usize,
    holders: Vec<RequestId>,
    waiting: VecDeque<Request>,
    next_request: usize,
}

impl Resource {
    /// Constructs a new resource with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn new<S: Into<String>>(id: ResourceId, name: S, capacity: usize) -> Result<Self, Error> {
        let name = name.into();
        if capacity == 0 {
            return Err(Error::InvalidCapacity { name, capacity });
        }
        Ok(Self {
            id,
            name,
            capacity,
            holders: Vec::new(),
            waiting: VecDeque::new(),
            next_request: 0,
        })
    }

    /// Resource ID.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.holders.len()
    }

    /// Number of requests waiting in line.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.waiting.len()
    }

    /// Requests a slot for `process` at time `now`.
    ///
    /// If a slot is free, the request is granted immediately. Otherwise, it is put at the end of
    /// the line, and will be granted by a future [`release`](Self::release).
    pub fn request(&mut self, process: ProcessId, now: f64) -> Acquire {
        let mut request = Request {
            id: RequestId(self.next_request),
            resource: self.id,
            process,
            enqueued: now,
            granted: None,
            queue_length: 0,
        };
        self.next_request += 1;
        if self.in_use() < self.capacity {
            self.grant(&mut request, now);
            Acquire::Granted(request)
        } else {
            log::trace!(
                "[{}] Process {} waits for {} ({} ahead)",
                now,
                process,
                self.name,
                self.waiting.len()
            );
            self.waiting.push_back(request);
            Acquire::Queued(request)
        }
    }

    /// Releases a held slot at time `now`.
    ///
    /// If anyone is waiting, the slot goes to the head of the line right away,
    /// and the granted request is returned, so that its process can be woken up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotHeld`] if the request is not currently holding a slot of this resource.
    pub fn release(&mut self, request: RequestId, now: f64) -> Result<Option<Request>, Error> {
        let position = self
            .holders
            .iter()
            .position(|&held| held == request)
            .ok_or(Error::NotHeld {
                resource: self.id,
                request,
            })?;
        self.holders.swap_remove(position);
        Ok(self.waiting.pop_front().map(|mut next| {
            self.grant(&mut next, now);
            next
        }))
    }

    fn grant(&mut self, request: &mut Request, now: f64) {
        debug_assert!(self.in_use() < self.capacity);
        self.holders.push(request.id);
        request.granted = Some(now);
        request.queue_length = self.waiting.len();
        log::debug!(
            "[{}] {} granted to process {} ({}/{} in use)",
            now,
            self.name,
            request.process,
            self.in_use(),
            self.capacity
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn resource(capacity: usize) -> Resource {
        Resource::new(ResourceId(0), "press", capacity).unwrap()
    }

    fn granted(acquire: Acquire) -> Request {
        match acquire {
            Acquire::Granted(request) => request,
            Acquire::Queued(request) => panic!("request {} not granted", request.id()),
        }
    }

    fn queued(acquire: Acquire) -> Request {
        match acquire {
            Acquire::Queued(request) => request,
            Acquire::Granted(request) => panic!("request {} granted", request.id()),
        }
    }

    #[test]
    fn test_zero_capacity() {
        assert_eq!(
            Resource::new(ResourceId(3), "oven", 0).unwrap_err(),
            Error::InvalidCapacity {
                name: String::from("oven"),
                capacity: 0
            }
        );
    }

    #[test]
    fn test_unbounded_capacity() {
        let mut line = resource(usize::MAX);
        let requests: Vec<_> = (0..5)
            .map(|p| granted(line.request(ProcessId::from(p), 0.0)))
            .collect();
        assert_eq!(line.in_use(), 5);
        assert_eq!(line.queue_length(), 0);
        assert_eq!(line.release(requests[2].id(), 1.0), Ok(None));
        assert_eq!(line.in_use(), 4);
    }

    #[test]
    fn test_grant_until_full() {
        let mut press = resource(2);
        let first = granted(press.request(ProcessId::from(0), 0.0));
        assert_eq!(first.grant_time(), Some(0.0));
        assert_eq!(press.in_use(), 1);
        let _ = granted(press.request(ProcessId::from(1), 0.0));
        assert_eq!(press.in_use(), 2);
        let third = queued(press.request(ProcessId::from(2), 1.0));
        assert_eq!(third.grant_time(), None);
        assert_eq!(press.in_use(), 2);
        assert_eq!(press.queue_length(), 1);
    }

    #[test]
    fn test_release_grants_head_of_line() {
        let mut press = resource(1);
        let first = granted(press.request(ProcessId::from(0), 0.0));
        let _ = queued(press.request(ProcessId::from(1), 1.0));
        let _ = queued(press.request(ProcessId::from(2), 2.0));

        let next = press.release(first.id(), 5.0).unwrap().unwrap();
        assert_eq!(next.process(), ProcessId::from(1));
        assert_eq!(next.enqueue_time(), 1.0);
        assert_eq!(next.grant_time(), Some(5.0));
        assert_eq!(next.queue_length(), 1);
        assert_eq!(press.in_use(), 1);

        let last = press.release(next.id(), 6.0).unwrap().unwrap();
        assert_eq!(last.process(), ProcessId::from(2));
        assert_eq!(last.queue_length(), 0);

        assert_eq!(press.release(last.id(), 7.0).unwrap(), None);
        assert_eq!(press.in_use(), 0);
    }

    #[test]
    fn test_release_not_held() {
        let mut press = resource(1);
        let first = granted(press.request(ProcessId::from(0), 0.0));
        let waiting = queued(press.request(ProcessId::from(1), 0.0));
        let not_held = Err(Error::NotHeld {
            resource: ResourceId(0),
            request: waiting.id(),
        });
        assert_eq!(press.release(waiting.id(), 1.0), not_held);
        let next = press.release(first.id(), 1.0).unwrap();
        assert!(next.is_some());
        assert!(matches!(
            press.release(first.id(), 2.0),
            Err(Error::NotHeld { .. })
        ));
    }
}
