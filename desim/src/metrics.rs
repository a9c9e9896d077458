//! Stage records and completions of finished jobs, and their aggregates.
//!
//! Nothing is aggregated while the simulation runs. The collector only appends, and
//! [`MetricsCollector::aggregate`] computes everything at once afterwards.

use std::collections::HashMap;

use serde::Serialize;

use crate::{ProcessId, StageRecord};

/// Completion of a single job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    /// The job's process.
    pub process: ProcessId,
    /// Job kind.
    pub kind: String,
    /// Creation time.
    pub created: f64,
    /// Completion time.
    pub completed: f64,
}

impl Completion {
    /// Completion time minus creation time.
    #[must_use]
    pub fn turnaround(&self) -> f64 {
        self.completed - self.created
    }
}

/// Count, total, mean, minimum, and maximum of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Number of values.
    pub count: usize,
    /// Sum of all values.
    pub total: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl Summary {
    /// Summarizes `values`. Returns `None` if there are none.
    pub fn new<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut values = values.into_iter();
        let first = values.next()?;
        let mut summary = Self {
            count: 1,
            total: first,
            mean: first,
            min: first,
            max: first,
        };
        for value in values {
            summary.count += 1;
            summary.total += value;
            summary.min = summary.min.min(value);
            summary.max = summary.max.max(value);
        }
        summary.mean = summary.total / summary.count as f64;
        Some(summary)
    }
}

/// Aggregated statistics of a single stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageAggregate {
    /// Stage name.
    pub stage: String,
    /// Number of traversals.
    pub count: usize,
    /// Waiting times.
    pub wait: Summary,
    /// Service times.
    pub service: Summary,
    /// Queue lengths sampled when each job was granted the stage's resource.
    pub queue_length: Summary,
}

/// Aggregated statistics of a single job kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindAggregate {
    /// Job kind.
    pub kind: String,
    /// Number of completed jobs.
    pub count: usize,
    /// Turnaround times.
    pub turnaround: Summary,
}

/// Everything computed by [`MetricsCollector::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    /// Number of completed jobs.
    pub completed: usize,
    /// Turnaround of all completed jobs, or `None` if no job completed.
    pub turnaround: Option<Summary>,
    /// Per-stage statistics, in order of first appearance.
    pub stages: Vec<StageAggregate>,
    /// Per-kind statistics, in order of first completion.
    pub kinds: Vec<KindAggregate>,
}

impl Aggregates {
    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageAggregate> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Looks up a job kind by name.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<&KindAggregate> {
        self.kinds.iter().find(|k| k.kind == name)
    }
}

/// Accumulates stage records and completions of finished jobs.
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    records: Vec<(ProcessId, StageRecord)>,
    completions: Vec<Completion>,
}

impl MetricsCollector {
    /// Appends a stage record of `process`.
    pub fn record(&mut self, process: ProcessId, record: StageRecord) {
        self.records.push((process, record));
    }

    /// Registers a completed job.
    pub fn complete(&mut self, completion: Completion) {
        self.completions.push(completion);
    }

    /// All stage records, in the order they were recorded.
    #[must_use]
    pub fn records(&self) -> &[(ProcessId, StageRecord)] {
        &self.records
    }

    /// All completions, in the order they were registered.
    #[must_use]
    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    /// Computes per-stage and per-kind statistics.
    #[must_use]
    pub fn aggregate(&self) -> Aggregates {
        let stages = group_by_first_appearance(self.records.iter().map(|(_, r)| (&r.stage, r)))
            .into_iter()
            .filter_map(|(stage, records)| {
                Some(StageAggregate {
                    stage: stage.clone(),
                    count: records.len(),
                    wait: Summary::new(records.iter().map(|r| r.wait))?,
                    service: Summary::new(records.iter().map(|r| r.service))?,
                    queue_length: Summary::new(records.iter().map(|r| r.queue_length as f64))?,
                })
            })
            .collect();
        let kinds = group_by_first_appearance(self.completions.iter().map(|c| (&c.kind, c)))
            .into_iter()
            .filter_map(|(kind, completions)| {
                Some(KindAggregate {
                    kind: kind.clone(),
                    count: completions.len(),
                    turnaround: Summary::new(completions.iter().map(|c| c.turnaround()))?,
                })
            })
            .collect();
        Aggregates {
            completed: self.completions.len(),
            turnaround: Summary::new(self.completions.iter().map(Completion::turnaround)),
            stages,
            kinds,
        }
    }
}

fn group_by_first_appearance<'a, T, I>(items: I) -> Vec<(&'a String, Vec<&'a T>)>
where
    I: Iterator<Item = (&'a String, &'a T)>,
{
    let mut positions: HashMap<&String, usize> = HashMap::new();
    let mut groups: Vec<(&String, Vec<&T>)> = Vec::new();
    for (key, item) in items {
        let position = *positions.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(item);
    }
    groups
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ResourceId;

    use float_cmp::approx_eq;
    use rstest::{fixture, rstest};

    fn record(stage: &str, wait: f64, service: f64, queue_length: usize) -> StageRecord {
        StageRecord {
            stage: String::from(stage),
            resource: ResourceId::from(0),
            arrival: 0.0,
            wait,
            service,
            queue_length,
        }
    }

    fn completion(process: usize, kind: &str, completed: f64) -> Completion {
        Completion {
            process: ProcessId::from(process),
            kind: String::from(kind),
            created: 0.0,
            completed,
        }
    }

    #[fixture]
    fn collector() -> MetricsCollector {
        let mut collector = MetricsCollector::default();
        collector.record(ProcessId::from(0), record("press", 0.0, 4.0, 2));
        collector.record(ProcessId::from(1), record("press", 4.0, 2.0, 1));
        collector.record(ProcessId::from(0), record("curing", 0.0, 120.0, 0));
        collector.record(ProcessId::from(2), record("press", 6.0, 3.0, 0));
        collector.record(ProcessId::from(1), record("curing", 1.0, 100.0, 0));
        collector.complete(completion(0, "Press-On", 124.0));
        collector.complete(completion(1, "Resilient-Basic", 107.0));
        collector.complete(completion(2, "Press-On", 9.0));
        collector
    }

    #[test]
    fn test_summary() {
        assert_eq!(Summary::new(Vec::new()), None);
        let summary = Summary::new(vec![3.0, 1.0, 2.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert!(approx_eq!(f64, summary.total, 6.0));
        assert!(approx_eq!(f64, summary.mean, 2.0));
        assert!(approx_eq!(f64, summary.min, 1.0));
        assert!(approx_eq!(f64, summary.max, 3.0));
    }

    #[rstest]
    fn test_stage_aggregates(collector: MetricsCollector) {
        let aggregates = collector.aggregate();
        let names: Vec<_> = aggregates.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, vec!["press", "curing"]);

        let press = aggregates.stage("press").unwrap();
        assert_eq!(press.count, 3);
        assert!(approx_eq!(f64, press.wait.mean, 10.0 / 3.0));
        assert!(approx_eq!(f64, press.wait.max, 6.0));
        assert!(approx_eq!(f64, press.service.min, 2.0));
        assert!(approx_eq!(f64, press.service.total, 9.0));
        assert!(approx_eq!(f64, press.queue_length.total, 3.0));
        assert!(approx_eq!(f64, press.queue_length.max, 2.0));

        let curing = aggregates.stage("curing").unwrap();
        assert_eq!(curing.count, 2);
        assert!(approx_eq!(f64, curing.service.mean, 110.0));
        assert!(aggregates.stage("wrap_soft").is_none());
    }

    #[rstest]
    fn test_kind_aggregates(collector: MetricsCollector) {
        let aggregates = collector.aggregate();
        assert_eq!(aggregates.completed, 3);
        let kinds: Vec<_> = aggregates
            .kinds
            .iter()
            .map(|k| (k.kind.as_str(), k.count))
            .collect();
        assert_eq!(kinds, vec![("Press-On", 2), ("Resilient-Basic", 1)]);
        let press_on = aggregates.kind("Press-On").unwrap();
        assert!(approx_eq!(f64, press_on.turnaround.mean, 66.5));
        assert!(approx_eq!(f64, press_on.turnaround.min, 9.0));
        assert!(approx_eq!(f64, press_on.turnaround.max, 124.0));
        let overall = aggregates.turnaround.unwrap();
        assert!(approx_eq!(f64, overall.max, 124.0));
        assert!(approx_eq!(f64, overall.min, 9.0));
    }

    #[test]
    fn test_empty() {
        let aggregates = MetricsCollector::default().aggregate();
        assert_eq!(aggregates.completed, 0);
        assert_eq!(aggregates.turnaround, None);
        assert!(aggregates.stages.is_empty());
        assert!(aggregates.kinds.is_empty());
    }
}
