use std::rc::Rc;

use desim::{
    Driver, Error, Job, JobUnits, Route, RunResult, Simulation, StageDefinition,
    WorkflowProcess,
};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use rstest::rstest;

fn completion_times(processes: &[WorkflowProcess]) -> Vec<f64> {
    processes.iter().filter_map(WorkflowProcess::completed).collect()
}

#[test]
fn two_jobs_share_a_single_press() -> Result<(), Error> {
    let mut driver = Driver::new(Some(0));
    let press = driver.add_resource("press", 1)?;
    let route = Route::new("tyre", vec![StageDefinition::fixed("press", press, 10.0)]);
    let output = driver.run(&[JobUnits::new(route, Job::new("tyre"), 2)], 100.0)?;

    assert_eq!(output.result, RunResult::Drained);
    assert!(output.incomplete.is_empty());
    let jobs: Vec<_> = output
        .completed
        .iter()
        .map(|p| {
            let record = &p.history()[0];
            (usize::from(p.id()), record.wait, record.service, p.completed())
        })
        .collect();
    assert_eq!(
        jobs,
        vec![(0, 0.0, 10.0, Some(10.0)), (1, 10.0, 10.0, Some(20.0))]
    );
    Ok(())
}

#[test]
fn oven_batch_of_twelve() -> Result<(), Error> {
    let mut driver = Driver::new(Some(0));
    let oven = driver.add_resource("curing_ovens", 12)?;
    let route = Route::new("tyre", vec![StageDefinition::fixed("curing", oven, 5.0)]);
    let output = driver.run(&[JobUnits::new(route, Job::new("tyre"), 20)], 100.0)?;

    assert_eq!(output.completed.len(), 20);
    let (first, rest) = output.completed.split_at(12);
    assert!(first.iter().all(|p| p.completed() == Some(5.0)));
    assert!(first.iter().all(|p| p.history()[0].wait == 0.0));
    assert!(rest.iter().all(|p| p.completed() == Some(10.0)));
    assert!(rest.iter().all(|p| p.history()[0].wait == 5.0));

    let curing = output.metrics.aggregate();
    let curing = curing.stage("curing").unwrap();
    assert_eq!(curing.count, 20);
    assert_eq!(curing.wait.total, 40.0);
    assert_eq!(curing.wait.max, 5.0);
    Ok(())
}

#[rstest(jobs, duration, case(1, 3.0), case(5, 10.0), case(30, 0.5))]
fn conservation_on_single_server(jobs: usize, duration: f64) {
    let mut driver = Driver::new(Some(0));
    let press = driver.add_resource("press", 1).unwrap();
    let route = Route::new("tyre", vec![StageDefinition::fixed("press", press, duration)]);
    let output = driver
        .run(&[JobUnits::new(route, Job::new("tyre"), jobs)], f64::INFINITY)
        .unwrap();
    let expected: Vec<_> = (1..=jobs).map(|n| n as f64 * duration).collect();
    assert_eq!(completion_times(&output.completed), expected);
}

#[test]
fn horizon_truncates_long_jobs() -> Result<(), Error> {
    let mut driver = Driver::new(Some(0));
    let heal = driver.add_resource("wrap_heal", 1)?;
    let press = driver.add_resource("press", 1)?;
    let long = Route::new(
        "long",
        vec![
            StageDefinition::fixed("wrap_heal", heal, 10.0),
            StageDefinition::fixed("press", press, 10.0),
        ],
    );
    let short = Route::new("short", vec![StageDefinition::fixed("press", press, 2.0)]);
    let output = driver.run(
        &[
            JobUnits::new(long, Job::new("long"), 1),
            JobUnits::new(short, Job::new("short"), 1),
        ],
        15.0,
    )?;

    assert_eq!(output.result, RunResult::Truncated);
    assert_eq!(output.end_time, 15.0);
    assert_eq!(output.completed.len(), 1);
    assert_eq!(output.completed[0].kind(), "short");
    assert_eq!(output.incomplete.len(), 1);
    let unfinished = &output.incomplete[0];
    assert_eq!(unfinished.kind(), "long");
    assert_eq!(unfinished.completed(), None);
    assert_eq!(unfinished.history().len(), 1);
    assert_eq!(unfinished.history()[0].stage, "wrap_heal");

    let aggregates = output.metrics.aggregate();
    assert_eq!(aggregates.completed, 1);
    assert!(aggregates.kind("long").is_none());
    assert!(aggregates.stage("wrap_heal").is_none());
    Ok(())
}

#[test]
fn event_at_horizon_still_fires() -> Result<(), Error> {
    let mut driver = Driver::new(Some(0));
    let press = driver.add_resource("press", 1)?;
    let route = Route::new("tyre", vec![StageDefinition::fixed("press", press, 10.0)]);
    let output = driver.run(&[JobUnits::new(route, Job::new("tyre"), 2)], 10.0)?;
    assert_eq!(completion_times(&output.completed), vec![10.0]);
    assert_eq!(output.incomplete.len(), 1);
    assert!(output.incomplete[0].history().is_empty());
    Ok(())
}

#[test]
fn stagger_delays_first_stage() -> Result<(), Error> {
    let mut driver = Driver::new(Some(0)).stagger(testing::cycle::<Job>(vec![0.0, 3.0, 30.0]));
    let press = driver.add_resource("press", 1)?;
    let route = Route::new("tyre", vec![StageDefinition::fixed("press", press, 10.0)]);
    let output = driver.run(&[JobUnits::new(route, Job::new("tyre"), 3)], 100.0)?;
    let jobs: Vec<_> = output
        .completed
        .iter()
        .map(|p| (p.started(), p.history()[0].wait, p.completed(), p.turnaround()))
        .collect();
    assert_eq!(
        jobs,
        vec![
            (Some(0.0), 0.0, Some(10.0), Some(10.0)),
            (Some(3.0), 7.0, Some(20.0), Some(20.0)),
            (Some(30.0), 0.0, Some(40.0), Some(40.0)),
        ]
    );
    Ok(())
}

#[test]
fn arrival_at_release_time_queues_behind_waiter() -> Result<(), Error> {
    let mut driver = Driver::new(Some(0)).stagger(testing::cycle::<Job>(vec![0.0, 0.0, 10.0]));
    let press = driver.add_resource("press", 1)?;
    let route = Route::new("tyre", vec![StageDefinition::fixed("press", press, 10.0)]);
    let output = driver.run(&[JobUnits::new(route, Job::new("tyre"), 3)], 100.0)?;
    let jobs: Vec<_> = output
        .completed
        .iter()
        .map(|p| (usize::from(p.id()), p.history()[0].wait, p.completed()))
        .collect();
    assert_eq!(
        jobs,
        vec![(0, 0.0, Some(10.0)), (1, 10.0, Some(20.0)), (2, 10.0, Some(30.0))]
    );
    Ok(())
}

#[test]
fn handed_over_slot_is_not_taken_by_later_arrival() -> Result<(), Error> {
    let mut driver = Driver::new(Some(0)).stagger(testing::cycle::<Job>(vec![0.0, 0.0, 5.0]));
    let prep = driver.add_resource("wrap_heal", 1)?;
    let press = driver.add_resource("press", 1)?;
    let direct = Route::new("direct", vec![StageDefinition::fixed("press", press, 10.0)]);
    let prepared = Route::new(
        "prepared",
        vec![
            StageDefinition::fixed("wrap_heal", prep, 5.0),
            StageDefinition::fixed("press", press, 10.0),
        ],
    );
    let output = driver.run(
        &[
            JobUnits::new(direct, Job::new("direct"), 2),
            JobUnits::new(prepared, Job::new("prepared"), 1),
        ],
        100.0,
    )?;
    let press_records: Vec<_> = output
        .completed
        .iter()
        .map(|p| {
            let record = p.history().last().unwrap();
            (usize::from(p.id()), record.arrival, record.wait, p.completed())
        })
        .collect();
    assert_eq!(
        press_records,
        vec![
            (0, 0.0, 0.0, Some(10.0)),
            (1, 0.0, 10.0, Some(20.0)),
            (2, 10.0, 10.0, Some(30.0)),
        ]
    );
    Ok(())
}

#[test]
fn invalid_configuration() {
    let mut driver = Driver::new(Some(0));
    assert!(matches!(
        driver.add_resource("oven", 0),
        Err(Error::InvalidCapacity { .. })
    ));
    let press = driver.add_resource("press", 1).unwrap();
    let route = Route::new(
        "tyre",
        vec![
            StageDefinition::fixed("press", press, 1.0),
            StageDefinition::fixed("ghost", desim::ResourceId::from(9), 1.0),
        ],
    );
    let units = [JobUnits::new(route, Job::new("tyre"), 1)];
    assert_eq!(
        Driver::new(Some(0)).run(&units, 10.0).unwrap_err(),
        Error::UnknownResource(press)
    );
    assert_eq!(
        driver.run(&units, 10.0).unwrap_err(),
        Error::UnknownResource(desim::ResourceId::from(9))
    );
    assert!(matches!(
        Driver::new(Some(0)).run(&[], -1.0),
        Err(Error::InvalidHorizon(_))
    ));
}

#[test]
fn negative_stagger_aborts() {
    let driver = Driver::new(Some(0)).stagger(testing::constant::<Job>(-0.5));
    assert_eq!(
        driver
            .run(&[JobUnits::new(Route::new("x", vec![]), Job::new("x"), 1)], 1.0)
            .unwrap_err(),
        Error::InvalidDelay(-0.5)
    );
}

/// Two stages with random durations, drawn from the run's seeded generator.
fn random_run(seed: u64) -> desim::RunOutput {
    let mut driver = Driver::new(Some(seed)).stagger(testing::wrapping_echo::<Job>(4));
    let heal = driver.add_resource("wrap_heal", 1).unwrap();
    let oven = driver.add_resource("curing_ovens", 3).unwrap();
    let full = Route::new(
        "full",
        vec![
            StageDefinition::new("wrap_heal", heal, testing::wrapping_echo::<Job>(6)),
            StageDefinition::new("curing", oven, testing::wrapping_echo::<Job>(20)),
        ],
    );
    let reduced = Route::new(
        "reduced",
        vec![StageDefinition::new("curing", oven, testing::wrapping_echo::<Job>(10))],
    );
    driver
        .run(
            &[
                JobUnits::new(full, Job::new("full"), 15),
                JobUnits::new(reduced, Job::new("reduced"), 10),
            ],
            60.0,
        )
        .unwrap()
}

#[test]
fn same_seed_same_results() {
    let first = random_run(17);
    let second = random_run(17);
    assert_eq!(
        completion_times(&first.completed),
        completion_times(&second.completed)
    );
    assert_eq!(first.metrics.aggregate(), second.metrics.aggregate());
    assert_eq!(first.incomplete.len(), second.incomplete.len());
}

/// Steps the event loop one event at a time over a single-stage route and checks,
/// after every event, that no resource is over capacity and that time never goes back.
/// At the end, checks that the slots were granted in the order of requests.
#[quickcheck]
fn capacity_fifo_and_monotonic_time(capacity: u8, jobs: u8, seed: u64) -> TestResult {
    let capacity = usize::from(capacity % 4) + 1;
    let jobs = usize::from(jobs % 40);
    let mut sim = Simulation::new(Some(seed));
    let press = sim.add_resource("press", capacity).unwrap();
    let route = Route::new(
        "tyre",
        vec![StageDefinition::new("press", press, testing::wrapping_echo::<Job>(7))],
    );
    let job = Rc::new(Job::new("tyre"));
    for n in 0..jobs {
        let delay = (n % 5) as f64;
        let job = Rc::clone(&job);
        let route = Rc::clone(&route);
        sim.spawn(delay, |id, created| WorkflowProcess::new(id, job, route, created))
            .unwrap();
    }
    let mut last_time = sim.time();
    while let Some(_) = sim.advance().unwrap() {
        if sim.time() < last_time {
            return TestResult::error("time moved backwards");
        }
        last_time = sim.time();
        if sim.resources().iter().any(|r| r.in_use() > r.capacity()) {
            return TestResult::error("capacity exceeded");
        }
    }
    let finished = sim.take_finished();
    if finished.len() != jobs {
        return TestResult::error("not all jobs finished");
    }
    let mut requests: Vec<_> = finished
        .iter()
        .map(|(id, p)| {
            let record = &p.history()[0];
            (record.arrival, *id, record.arrival + record.wait)
        })
        .collect();
    requests.sort_by(|lhs, rhs| (lhs.0, lhs.1).partial_cmp(&(rhs.0, rhs.1)).unwrap());
    let fifo = requests.windows(2).all(|pair| pair[0].2 <= pair[1].2);
    TestResult::from_bool(fifo)
}
