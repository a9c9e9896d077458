//! Jobs walking through an ordered list of stages, one station at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rand::RngCore;
use serde::Serialize;

use crate::{Context, Effect, Error, Process, ProcessId, Request, ResourceId, Wake};

/// Attributes of a job, available to duration samplers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Job {
    kind: String,
    attributes: BTreeMap<String, String>,
}

impl Job {
    /// Constructs a job of the given kind without any attributes.
    #[must_use]
    pub fn new<S: Into<String>>(kind: S) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Job kind; all jobs of one kind follow the same route.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Gets an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Implementors produce service durations for a given job.
///
/// The returned value must be finite and non-negative. Anything else aborts the run with
/// [`Error::InvalidDelay`].
pub trait DurationSampler {
    /// Samples a duration for `job`.
    fn sample(&self, job: &Job, rng: &mut dyn RngCore) -> f64;
}

impl<F> DurationSampler for F
where
    F: Fn(&Job, &mut dyn RngCore) -> f64,
{
    fn sample(&self, job: &Job, rng: &mut dyn RngCore) -> f64 {
        self(job, rng)
    }
}

/// A single stage of a route: the station it occupies and how long it takes.
#[derive(Clone)]
pub struct StageDefinition {
    name: String,
    resource: ResourceId,
    duration: Rc<dyn DurationSampler>,
}

impl fmt::Debug for StageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDefinition")
            .field("name", &self.name)
            .field("resource", &self.resource)
            .finish()
    }
}

impl StageDefinition {
    /// Constructs a stage sampling its durations from `duration`.
    pub fn new<S, D>(name: S, resource: ResourceId, duration: D) -> Self
    where
        S: Into<String>,
        D: DurationSampler + 'static,
    {
        Self {
            name: name.into(),
            resource,
            duration: Rc::new(duration),
        }
    }

    /// Constructs a stage that always takes the same time.
    pub fn fixed<S: Into<String>>(name: S, resource: ResourceId, duration: f64) -> Self {
        Self::new(name, resource, move |_: &Job, _: &mut dyn RngCore| duration)
    }

    /// Stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resource occupied during this stage.
    #[must_use]
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Samples the service duration for `job`.
    pub fn sample(&self, job: &Job, rng: &mut dyn RngCore) -> f64 {
        self.duration.sample(job, rng)
    }
}

/// Ordered list of stages traversed by every job of one kind.
#[derive(Debug)]
pub struct Route {
    kind: String,
    stages: Vec<StageDefinition>,
}

impl Route {
    /// Constructs a shared route.
    #[must_use]
    pub fn new<S: Into<String>>(kind: S, stages: Vec<StageDefinition>) -> Rc<Self> {
        Rc::new(Self {
            kind: kind.into(),
            stages,
        })
    }

    /// Name of the job kind this route is for.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The stages, in order.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }
}

/// What happened to a job at one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    /// Stage name.
    pub stage: String,
    /// Occupied resource.
    pub resource: ResourceId,
    /// Time of arrival at the stage.
    pub arrival: f64,
    /// Time spent waiting in line.
    pub wait: f64,
    /// Time spent occupying the resource.
    pub service: f64,
    /// Number of jobs still waiting for the resource when this one was granted.
    pub queue_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Created,
    Waiting { arrival: f64 },
    InService { arrival: f64, wait: f64, service: f64, request: Request },
    Done,
}

/// One job traversing its route.
///
/// For each stage: request the resource, wait for the grant, hold it for a sampled service
/// time, release it, and record the stage. After the last stage, the job is complete.
#[derive(Debug)]
pub struct WorkflowProcess {
    id: ProcessId,
    job: Rc<Job>,
    route: Rc<Route>,
    stage: usize,
    state: State,
    history: Vec<StageRecord>,
    created: f64,
    started: Option<f64>,
    completed: Option<f64>,
}

impl WorkflowProcess {
    /// Constructs a job process created at time `created`.
    #[must_use]
    pub fn new(id: ProcessId, job: Rc<Job>, route: Rc<Route>, created: f64) -> Self {
        Self {
            id,
            job,
            route,
            stage: 0,
            state: State::Created,
            history: Vec::new(),
            created,
            started: None,
            completed: None,
        }
    }

    /// Process ID.
    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// The job attributes.
    #[must_use]
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Job kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.route.kind()
    }

    /// Records of the stages traversed so far, in order.
    #[must_use]
    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// Time when the process was created.
    #[must_use]
    pub fn created(&self) -> f64 {
        self.created
    }

    /// Time when the job arrived at its first stage, after any inter-arrival delay.
    #[must_use]
    pub fn started(&self) -> Option<f64> {
        self.started
    }

    /// Time when the job left the last stage, or `None` if it has not.
    #[must_use]
    pub fn completed(&self) -> Option<f64> {
        self.completed
    }

    /// Completion time minus creation time, for complete jobs.
    #[must_use]
    pub fn turnaround(&self) -> Option<f64> {
        self.completed.map(|completed| completed - self.created)
    }

    /// Takes the job to its current stage, or completes it if no stages are left.
    fn arrive(&mut self, now: f64) -> Effect {
        match self.route.stages().get(self.stage) {
            Some(stage) => {
                log::trace!("[{}] Job {} arrives at {}", now, self.id, stage.name());
                self.state = State::Waiting { arrival: now };
                Effect::Request(stage.resource())
            }
            None => {
                log::debug!("[{}] Job {} ({}) complete", now, self.id, self.kind());
                self.state = State::Done;
                self.completed = Some(now);
                Effect::Finish
            }
        }
    }

    fn unexpected(&self, wake: Wake) -> Error {
        Error::UnexpectedWake {
            process: self.id,
            reason: format!("{:?} in state {:?}", wake, self.state),
        }
    }
}

impl Process for WorkflowProcess {
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Effect, Error> {
        let now = ctx.time();
        match (self.state, wake) {
            (State::Created, Wake::Start) => {
                self.started = Some(now);
                Ok(self.arrive(now))
            }
            (State::Waiting { arrival }, Wake::Granted(request)) => {
                let route = Rc::clone(&self.route);
                let stage = &route.stages()[self.stage];
                let service = stage.sample(&self.job, ctx.rng());
                if !service.is_finite() || service < 0.0 {
                    return Err(Error::InvalidDelay(service));
                }
                self.state = State::InService {
                    arrival,
                    wait: now - arrival,
                    service,
                    request,
                };
                Ok(Effect::Timeout(service))
            }
            (
                State::InService {
                    arrival,
                    wait,
                    service,
                    request,
                },
                Wake::Timeout,
            ) => {
                ctx.release(&request)?;
                let stage = &self.route.stages()[self.stage];
                self.history.push(StageRecord {
                    stage: stage.name().to_string(),
                    resource: stage.resource(),
                    arrival,
                    wait,
                    service,
                    queue_length: request.queue_length(),
                });
                self.stage += 1;
                Ok(self.arrive(now))
            }
            (_, wake) => Err(self.unexpected(wake)),
        }
    }
}
