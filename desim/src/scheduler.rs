use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::{Clock, Error, ProcessId, Request};

/// The reason a suspended process is being resumed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Wake {
    /// First resumption of a process after it has been created.
    Start,
    /// A timeout requested by the process itself has elapsed.
    Timeout,
    /// A resource request has been granted.
    Granted(Request),
}

/// Entry type stored in the scheduler: the process to wake up, the reason, and the time when
/// it is supposed to occur.
///
/// The sequence number is assigned at scheduling time and breaks ties between entries due at the
/// same time, so that they come out in the order they were scheduled.
#[derive(Debug, Clone)]
pub struct EventEntry {
    time: OrderedFloat<f64>,
    sequence: u64,
    process: ProcessId,
    wake: Wake,
}

impl EventEntry {
    /// Time when the event is due.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time.into_inner()
    }

    /// Sequence number assigned at scheduling time.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The process to resume.
    #[must_use]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// Why the process is resumed.
    #[must_use]
    pub fn wake(&self) -> Wake {
        self.wake
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed, so that the max-heap pops the earliest entry first.
impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.time, other.sequence).cmp(&(self.time, self.sequence))
    }
}

/// This struct has only immutable access to the simulation clock exposed.
#[derive(Debug, Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.get()
    }
}

/// Scheduler is used to keep the current time and information about the upcoming events.
#[derive(Debug)]
pub struct Scheduler {
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    next_sequence: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            clock: Rc::new(Cell::new(0.0)),
            next_sequence: 0,
        }
    }
}

impl Scheduler {
    /// Schedules `process` to be woken up at `self.time() + delay`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDelay`] if `delay` is negative or not a finite number.
    pub fn schedule(&mut self, delay: f64, process: ProcessId, wake: Wake) -> Result<(), Error> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(Error::InvalidDelay(delay));
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(EventEntry {
            time: OrderedFloat(self.time() + delay),
            sequence,
            process,
            wake,
        });
        Ok(())
    }

    /// Schedules `process` to be woken up at `self.time()`, after anything already due now.
    pub fn schedule_immediately(&mut self, process: ProcessId, wake: Wake) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(EventEntry {
            time: OrderedFloat(self.time()),
            sequence,
            process,
            wake,
        });
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Time of the next event, if any is scheduled.
    #[must_use]
    pub fn peek_time(&self) -> Option<f64> {
        self.events.peek().map(EventEntry::time)
    }

    /// Returns the number of events in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Answers whether the event queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes and returns the next scheduled event or `None` if none are left.
    /// The clock is moved to the time of the returned event.
    pub fn pop(&mut self) -> Option<EventEntry> {
        self.events.pop().map(|entry| {
            debug_assert!(entry.time() >= self.time(), "time moved backwards");
            self.clock.replace(entry.time());
            entry
        })
    }

    /// Moves the clock forward to `time` without firing anything.
    /// Has no effect if `time` is not later than the current time.
    pub(crate) fn advance_to(&mut self, time: f64) {
        if time > self.time() {
            self.clock.replace(time);
        }
    }
}
