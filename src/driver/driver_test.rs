use crate::backend::{BenchmarkCase, Coordinates};
use crate::driver::{
    BenchmarkDriver, CaseError, CaseOutcome, CaseReport, CaseState, DriverConfig, ExecMode, Repetition,
    Stage,
};
use crate::cache::CachePolicy;
use crate::error::{InvocationError, SetupError};
use crate::geo::haversine_distance;
use crate::guest::GuestErrorKind;
use crate::runtime::vm::VmOptions;
use crate::scripts::Language;

const LONDON_NEW_YORK: Coordinates = Coordinates {
    a_lat: 51.507222,
    a_long: -0.1275,
    b_lat: 40.7127,
    b_long: -74.0059,
};

fn config(repetition: Repetition, reuse_context: bool) -> DriverConfig {
    DriverConfig {
        repetition,
        reuse_context,
        ..DriverConfig::default()
    }
}

#[test]
fn state_machine_transitions() {
    use CaseState::*;
    assert!(Uninitialized.can_transition_to(SetUp));
    assert!(SetUp.can_transition_to(WarmedUp));
    assert!(WarmedUp.can_transition_to(Timing));
    assert!(Timing.can_transition_to(TornDown));
    assert!(SetUp.can_transition_to(TornDown));

    assert!(!Uninitialized.can_transition_to(Timing));
    assert!(!SetUp.can_transition_to(Timing));
    assert!(!Timing.can_transition_to(WarmedUp));
    assert!(!TornDown.can_transition_to(SetUp));
    assert!(!Uninitialized.can_transition_to(TornDown));
}

#[test]
fn illegal_transition_message() {
    let err = CaseError::IllegalTransition {
        from: CaseState::TornDown,
        to: CaseState::Timing,
    };
    insta::assert_snapshot!(err.to_string(), @"illegal case transition torn-down -> timing");
}

#[test]
fn every_mode_and_language_completes() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(3), false));
    let [a, b, c, d] = LONDON_NEW_YORK.to_array();
    let expected = haversine_distance(a, b, c, d);
    for mode in ExecMode::ALL {
        for language in Language::ALL {
            let report = driver
                .run_case(&mode.case(language, LONDON_NEW_YORK))
                .unwrap();
            assert_eq!(report.final_state, CaseState::TornDown);
            assert_eq!(report.samples().len(), 3);
            let result = report.last_result().unwrap();
            assert!(
                ((result - expected) / expected).abs() < 1e-9,
                "mode {} {}: {}",
                mode,
                language,
                result
            );
        }
    }
}

#[test]
fn runtimes_are_released_between_cases_without_reuse() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(1), false));
    let case = ExecMode::NativeSynchronizedCache.case(Language::Js, LONDON_NEW_YORK);
    driver.run_case(&case).unwrap();
    driver.run_case(&case).unwrap();
    let stats = driver.runtimes().stats();
    assert_eq!(stats.isolates_created, 2);
    assert_eq!(stats.isolates_torn_down, 2);
    assert!(driver.runtimes().isolate_thread().is_none());
}

#[test]
fn reuse_context_keeps_runtimes_alive() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(1), true));
    let cases: Vec<BenchmarkCase> = ExecMode::ALL
        .iter()
        .map(|mode| mode.case(Language::Ruby, LONDON_NEW_YORK))
        .collect();
    let reports = driver.run_series(&cases).unwrap();
    assert_eq!(reports.len(), ExecMode::ALL.len());
    let stats = driver.runtimes().stats();
    assert_eq!(stats.isolates_created, 1);
    assert_eq!(stats.vms_created, 1);
    let control = driver.runtimes().control_interface().unwrap();
    assert_eq!(control.contexts_built(), 1);
}

#[test]
fn zero_iterations_reports_the_warm_up_result() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(0), false));
    let report = driver
        .run_case(&ExecMode::NativeDistance.case(Language::Js, LONDON_NEW_YORK))
        .unwrap();
    assert!(report.samples().is_empty());
    assert_eq!(report.mean(), None);
    assert!(report.last_result().is_some());
}

#[test]
fn time_budget_makes_at_least_one_call() {
    let mut driver = BenchmarkDriver::new(config(Repetition::TimeBudgetMs(0), false));
    let report = driver
        .run_case(&ExecMode::VmDirect.case(Language::Js, LONDON_NEW_YORK))
        .unwrap();
    assert_eq!(report.samples().len(), 1);
    assert!(report.mean().is_some());
}

#[test]
fn setup_failure_aborts_the_series() {
    let mut config = config(Repetition::Iterations(1), false);
    config.vm = VmOptions::new(["--verbose"]);
    let mut driver = BenchmarkDriver::new(config);
    let cases = [
        ExecMode::NativeDistance.case(Language::Js, LONDON_NEW_YORK),
        ExecMode::VmDirect.case(Language::Js, LONDON_NEW_YORK),
        ExecMode::NativeDistance.case(Language::Js, LONDON_NEW_YORK),
    ];
    let err = driver.run_series(&cases).unwrap_err();
    assert!(matches!(
        err,
        CaseError::Setup(SetupError::UnrecognizedVmOption(_))
    ));
    assert_eq!(driver.runtimes().stats().isolates_created, 1);
}

#[test]
fn failed_report_has_no_result() {
    let report = CaseReport {
        case: ExecMode::NativeNoCache.case(Language::Ruby, LONDON_NEW_YORK),
        outcome: CaseOutcome::Failed {
            stage: Stage::Timing,
            error: InvocationError::NotExecutable {
                language: Language::Ruby,
            },
        },
        final_state: CaseState::TornDown,
    };
    assert_eq!(report.last_result(), None);
    assert!(report.samples().is_empty());
    assert_eq!(report.mean(), None);
}

#[test]
fn prepared_cases_can_follow_each_other() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(2), false));
    let case = ExecMode::NativeSynchronizedCache.case(Language::Ruby, LONDON_NEW_YORK);
    let mut prepared = driver.prepare(&case).unwrap();
    prepared.invoke().unwrap();
    prepared.finish();

    let report = driver.run_case(&case).unwrap();
    assert!(matches!(report.outcome, CaseOutcome::Completed { .. }));
    assert_eq!(driver.runtimes().stats().isolates_created, 2);
}

#[test]
fn prepared_case_tears_down_on_drop() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(1), false));
    let case = ExecMode::VmGuest.case(Language::Js, LONDON_NEW_YORK);
    {
        let mut prepared = driver.prepare(&case).unwrap();
        assert_eq!(prepared.state(), CaseState::WarmedUp);
        let first = prepared.invoke().unwrap();
        assert_eq!(prepared.state(), CaseState::Timing);
        assert_eq!(prepared.invoke().unwrap(), first);
    }
    assert!(driver.runtimes().control_interface().is_none());
    assert_eq!(driver.runtimes().stats().vms_destroyed, 1);
}

#[test]
fn failure_message_names_the_stage() {
    let err = CaseError::Invocation {
        stage: Stage::WarmUp,
        error: InvocationError::NotExecutable {
            language: Language::Js,
        },
    };
    insta::assert_snapshot!(err.to_string(), @"warm-up failed: The code block for 'js' is not executable. Did you return a function?");
}

/// The same point twice; rounding puts the acos argument just above 1.
const SAME_POINT: Coordinates = Coordinates {
    a_lat: -79.4183,
    a_long: 0.0,
    b_lat: -79.4183,
    b_long: 0.0,
};

#[test]
fn out_of_domain_acos_fails_ruby_but_not_js() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(2), false));
    let cases = [
        ExecMode::NativeSynchronizedCache.case(Language::Ruby, SAME_POINT),
        ExecMode::VmGuest.case(Language::Ruby, SAME_POINT),
        ExecMode::NativeNoCache.case(Language::Js, SAME_POINT),
        ExecMode::NativeNoCache.case(Language::Ruby, LONDON_NEW_YORK),
    ];
    let reports = driver.run_series(&cases).unwrap();
    assert_eq!(reports.len(), 4);

    for report in &reports[..2] {
        assert_eq!(report.final_state, CaseState::TornDown);
        match &report.outcome {
            CaseOutcome::Failed {
                stage: Stage::WarmUp,
                error: InvocationError::Evaluation(err),
            } => {
                assert_eq!(err.kind, GuestErrorKind::DomainError, "{}", report.case);
                insta::allow_duplicates! {
                    insta::assert_snapshot!(
                        err.to_string(),
                        @r#"Math::DomainError: Numerical argument is out of domain - "acos" (eval):7:34"#
                    );
                }
            }
            other => panic!("{}: {:?}", report.case, other),
        }
        assert_eq!(report.last_result(), None);
    }

    assert!(reports[2].last_result().unwrap().is_nan());
    assert_eq!(
        format!("{:.2} km", reports[3].last_result().unwrap()),
        "5570.25 km"
    );
    let stats = driver.runtimes().stats();
    assert_eq!(stats.isolates_created, stats.isolates_torn_down);
    assert_eq!(stats.vms_created, stats.vms_destroyed);
}

#[test]
fn precompiled_ruby_is_evaluated_once_per_runtime() {
    let mut driver = BenchmarkDriver::new(config(Repetition::Iterations(5), true));
    let native = driver
        .run_case(&ExecMode::NativeRubyDistance.case(Language::Js, LONDON_NEW_YORK))
        .unwrap();
    let direct = driver
        .run_case(&ExecMode::VmDirectRuby.case(Language::Js, LONDON_NEW_YORK))
        .unwrap();
    let polyglot = driver
        .run_case(&ExecMode::NativeSynchronizedCache.case(Language::Ruby, LONDON_NEW_YORK))
        .unwrap();
    assert_eq!(native.samples().len(), 5);
    assert_eq!(native.last_result(), direct.last_result());
    assert_eq!(native.last_result(), polyglot.last_result());

    let thread = driver.runtimes().isolate_thread().unwrap();
    // One evaluation at isolate creation, one for the synchronized cache.
    assert_eq!(thread.context().unwrap().evaluations(), 2);
    assert_eq!(
        thread.cache(CachePolicy::Synchronized).unwrap().evaluations(),
        1
    );
    // The library class keeps its own context outside the ones the VM built
    // for callers.
    let control = driver.runtimes().control_interface().unwrap();
    assert_eq!(control.contexts_built(), 0);
}
