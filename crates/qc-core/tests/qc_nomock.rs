//! End-to-end QC scenarios on real datasets and a real on-disk override store.

use ndarray::{Array1, Array2};
use qc_config::QcConfig;
use qc_core::dataset::{Dataset, Dimension, Variable, SECONDS_PER_DAY, TIME};
use qc_core::overrides::OverrideStore;
use qc_core::qc::{by_name, run_test, BurstOutlierTest, MultiBeamTest, QcContext, QcTest};
use qc_core::Target;
use std::sync::Arc;

fn variable(name: &str, rows: usize, cols: usize, values: Vec<f64>) -> Variable {
    Variable {
        name: name.into(),
        dimensions: vec![],
        data: Array2::from_shape_vec((rows, cols), values).unwrap(),
        flags: Array2::zeros((rows, cols)),
    }
}

fn single_burst(values: &[f64]) -> Dataset {
    let n = values.len();
    let mut ds = Dataset::new("mooring/CTD_2020.json");
    ds.burst_duration = Some(10.0);
    ds.burst_interval = Some(600.0);
    let time: Array1<f64> = (0..n)
        .map(|i| 737_000.0 + i as f64 / SECONDS_PER_DAY)
        .collect();
    ds.dimensions.push(Dimension {
        name: TIME.into(),
        data: time.into_shape_with_order((n, 1)).unwrap(),
        flags: Array2::zeros((n, 1)),
    });
    let mut temp = variable("TEMP", n, 1, values.to_vec());
    temp.dimensions = vec![0];
    ds.variables.push(temp);
    ds
}

/// Two samples by three bins of correlation data plus every derived variable.
fn adcp(identity: &str) -> Dataset {
    let mut ds = Dataset::new(identity);
    let beams = [
        [170.0, 90.0, 40.0, 120.0, 65.0, 200.0],
        [100.0, 90.0, 130.0, 30.0, 70.0, 200.0],
        [180.0, 90.0, 140.0, 125.0, 60.0, 10.0],
        [190.0, 90.0, 20.0, 20.0, 50.0, 10.0],
    ];
    for (b, values) in beams.iter().enumerate() {
        ds.variables
            .push(variable(&format!("CMAG{}", b + 1), 2, 3, values.to_vec()));
    }
    for name in ["UCUR", "VCUR", "WCUR", "CSPD", "CDIR"] {
        ds.variables.push(variable(name, 2, 3, vec![0.0; 6]));
    }
    ds
}

fn ctx() -> QcContext {
    QcContext::new(QcConfig::default()).unwrap()
}

#[test]
fn single_outlier_in_burst_is_flagged_bad() {
    let mut ds = single_burst(&[1.0, 2.0, 100.0, 3.0, 4.0]);
    let outcome = run_test(&BurstOutlierTest, &ctx(), &mut ds, Target::variable(0)).unwrap();

    assert_eq!(ds.variables[0].flags.column(0).to_vec(), vec![1, 1, 4, 1, 1]);
    let burst = &outcome.burst_stats.unwrap().bursts[0];
    assert!((burst.average - 22.0).abs() < 1e-9);
    // sample standard deviation
    assert!(burst.dispersion > 43.0 && burst.dispersion < 44.0);
    assert!(100.0 > burst.threshold_max);
}

#[test]
fn correlation_vote_scenario() {
    let mut ds = Dataset::new("vote.json");
    ds.variables
        .push(variable("CMAG1", 2, 1, vec![170.0, 90.0]));
    ds.variables
        .push(variable("CMAG2", 2, 1, vec![100.0, 90.0]));
    ds.variables
        .push(variable("CMAG3", 2, 1, vec![180.0, 90.0]));
    ds.variables
        .push(variable("CMAG4", 2, 1, vec![190.0, 90.0]));
    ds.variables.push(variable("UCUR", 2, 1, vec![0.1, 0.2]));

    let ctx = ctx().with_explicit("correlation_magnitude", "cmag", 150.0);
    let outcome = run_test(
        &MultiBeamTest::correlation_magnitude(),
        &ctx,
        &mut ds,
        Target::variable(4),
    )
    .unwrap();
    assert_eq!(outcome.param_log, "cmag=150");
    assert_eq!(ds.variables[4].flags.column(0).to_vec(), vec![1, 4]);
}

#[test]
fn every_derived_variable_receives_identical_flags() {
    for name in ["correlation_magnitude", "percent_good", "echo_range"] {
        let test = by_name(name).unwrap();
        let mut ds = adcp("adcp.json");
        // reuse the same numbers for each diagnostic family
        for v in ds.variables.iter_mut() {
            if let Some(beam) = v.name.strip_prefix("CMAG") {
                v.name = match name {
                    "percent_good" => format!("PERG{}", beam),
                    "echo_range" => format!("ABSIC{}", beam),
                    _ => v.name.clone(),
                };
            }
        }
        let ctx = ctx();
        let target = test.eligible_targets(&ctx, &ds)[0];
        let outcome = run_test(test.as_ref(), &ctx, &mut ds, target).unwrap();
        assert_eq!(outcome.targets.len(), 5, "{}", name);

        let reference = ds.variable("UCUR").unwrap().flags.clone();
        assert!(reference.iter().all(|&f| f == 1 || f == 4));
        for derived in ["VCUR", "WCUR", "CSPD", "CDIR"] {
            let flags = &ds.variable(derived).unwrap().flags;
            assert_eq!(flags, &reference, "{} {}", name, derived);
        }
    }
}

#[test]
fn rerun_reuses_stored_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(OverrideStore::new(dir.path()));
    let test = MultiBeamTest::correlation_magnitude();

    let first_ctx = ctx()
        .with_override_store(store.clone())
        .with_explicit("correlation_magnitude", "cmag", 125.0);
    let mut first = adcp("mooring/ADCP_2019.json");
    run_test(&test, &first_ctx, &mut first, Target::variable(4)).unwrap();

    // no explicit value this time: the stored one must be used
    let second_ctx = ctx().with_override_store(store.clone());
    let mut second = adcp("mooring/ADCP_2019.json");
    let outcome = run_test(&test, &second_ctx, &mut second, Target::variable(4)).unwrap();

    assert_eq!(outcome.param_log, "cmag=125");
    assert_eq!(first.flags_digest(), second.flags_digest());
    assert_eq!(
        store
            .read(&second.identity, "correlation_magnitude", "cmag", 64.0)
            .unwrap(),
        125.0
    );
}

#[test]
fn automatic_runs_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(OverrideStore::new(dir.path()));
    let ctx = ctx().with_override_store(store.clone());

    let mut digests = Vec::new();
    let mut logs = Vec::new();
    for _ in 0..2 {
        let mut ds = adcp("auto.json");
        for test in ["correlation_magnitude", "percent_good", "echo_range"] {
            let test = by_name(test).unwrap();
            let outcome = run_test(test.as_ref(), &ctx, &mut ds, Target::variable(4)).unwrap();
            logs.push(outcome.param_log);
        }
        digests.push(ds.flags_digest());
    }
    assert_eq!(digests[0], digests[1]);
    assert_eq!(&logs[..3], &logs[3..]);

    let record = store.load(&"auto.json".into()).unwrap().unwrap();
    assert_eq!(record.get("correlation_magnitude", "cmag"), Some(64.0));
    assert_eq!(record.get("percent_good", "min_pgood"), Some(80.0));
    assert_eq!(record.get("echo_range", "ea_thresh"), Some(50.0));
}

#[test]
fn writes_merge_instead_of_replacing() {
    let dir = tempfile::tempdir().unwrap();
    let store = OverrideStore::new(dir.path());
    let id = "merge.json".into();

    store.write(&id, "B", "y", 2.0).unwrap();
    store.write(&id, "A", "x", 1.0).unwrap();
    store.write(&id, "A", "z", 3.0).unwrap();

    assert_eq!(store.read(&id, "B", "y", 0.0).unwrap(), 2.0);
    assert_eq!(store.read(&id, "A", "x", 0.0).unwrap(), 1.0);
    assert_eq!(store.read(&id, "A", "z", 0.0).unwrap(), 3.0);
}

#[test]
fn concurrent_writers_on_one_dataset_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(OverrideStore::new(dir.path()));
    let id: qc_common::DatasetId = "shared.json".into();

    let handles: Vec<_> = ["spike", "burst"]
        .into_iter()
        .map(|test| {
            let store = store.clone();
            let id = id.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    store
                        .write(&id, test, &format!("p{}", i), i as f64)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let record = store.load(&id).unwrap().unwrap();
    for test in ["spike", "burst"] {
        assert_eq!(record.tests[test].len(), 25);
        assert_eq!(record.get(test, "p24"), Some(24.0));
    }
}

#[test]
fn tests_on_different_datasets_run_in_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(OverrideStore::new(dir.path()));
    let ctx = Arc::new(ctx().with_override_store(store.clone()));

    let handles: Vec<_> = (0..4)
        .map(|k| {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                let mut ds = adcp(&format!("parallel_{}.json", k));
                run_test(&MultiBeamTest::percent_good(), &ctx, &mut ds, Target::variable(4))
                    .unwrap();
                ds.flags_digest()
            })
        })
        .collect();
    let digests: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // same data, same default threshold
    assert!(digests.windows(2).all(|w| w[0] == w[1]));
    for k in 0..4 {
        let id = format!("parallel_{}.json", k).into();
        assert!(store.load(&id).unwrap().is_some());
    }
}
