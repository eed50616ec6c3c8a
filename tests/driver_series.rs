use polycall::backend::Coordinates;
use polycall::driver::{BenchmarkDriver, CaseState, DriverConfig, ExecMode, Repetition};
use polycall::scripts::Language;

const LONDON_NEW_YORK: Coordinates = Coordinates {
    a_lat: 51.507222,
    a_long: -0.1275,
    b_lat: 40.7127,
    b_long: -74.0059,
};

fn full_series() -> Vec<polycall::backend::BenchmarkCase> {
    ExecMode::ALL
        .iter()
        .flat_map(|mode| {
            Language::ALL
                .iter()
                .map(move |language| mode.case(*language, LONDON_NEW_YORK))
        })
        .collect()
}

#[test]
fn series_without_reuse_recreates_runtimes_per_case() {
    let mut driver = BenchmarkDriver::new(DriverConfig {
        repetition: Repetition::Iterations(4),
        ..DriverConfig::default()
    });
    let reports = driver.run_series(&full_series()).unwrap();
    assert_eq!(reports.len(), 16);
    for report in &reports {
        assert_eq!(report.final_state, CaseState::TornDown);
        assert_eq!(report.samples().len(), 4);
        assert_eq!(
            format!("{:.2} km", report.last_result().unwrap()),
            "5570.25 km",
            "{}",
            report.case
        );
    }
    let stats = driver.runtimes().stats();
    assert_eq!(stats.isolates_created, 10);
    assert_eq!(stats.vms_created, 6);
    assert_eq!(stats.isolates_torn_down, 10);
    assert_eq!(stats.vms_destroyed, 6);
}

#[test]
fn series_with_reuse_keeps_one_of_each() {
    let config = DriverConfig::from_json(
        r#"{"reuse_context": true, "repetition": {"time_budget_ms": 1}}"#,
    )
    .unwrap();
    let mut driver = BenchmarkDriver::new(config);
    let reports = driver.run_series(&full_series()).unwrap();
    assert!(reports.iter().all(|report| !report.samples().is_empty()));
    let stats = driver.runtimes().stats();
    assert_eq!(stats.lifecycle_objects_created(), 2);
    assert!(driver.runtimes().isolate_thread().is_some());
    assert!(driver.runtimes().control_interface().is_some());
}

#[test]
fn prepared_case_drives_an_external_loop() {
    let mut driver = BenchmarkDriver::new(DriverConfig::default());
    let case = ExecMode::NativeUnsynchronizedCache.case(Language::Js, LONDON_NEW_YORK);
    let mut prepared = driver.prepare(&case).unwrap();
    let results: Vec<f64> = (0..100).map(|_| prepared.invoke().unwrap()).collect();
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    prepared.finish();
    assert!(driver.runtimes().isolate_thread().is_none());
}
