use std::process::{Command, Output};

fn run(binary: &str, args: &[&str]) -> Output {
    Command::new(binary)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to run {} with args {:?}: {e}", binary, args))
}

fn polycall(args: &[&str]) -> Output {
    run(env!("CARGO_BIN_EXE_polycall"), args)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim_end().to_string()
}

const LONDON_NEW_YORK: [&str; 4] = ["51.507222", "-0.1275", "40.7127", "-74.0059"];

#[test]
fn every_mode_prints_the_reference_distance() {
    for mode in ["0", "1", "2", "3", "4", "5", "6", "7"] {
        for language in ["js", "ruby"] {
            let mut args = vec![mode, language];
            args.extend(LONDON_NEW_YORK);
            let output = polycall(&args);
            assert!(
                output.status.success(),
                "mode {} {}: {}",
                mode,
                language,
                stderr(&output)
            );
            assert_eq!(stdout(&output), "5570.25 km", "mode {} {}", mode, language);
        }
    }
}

#[test]
fn quarter_equator() {
    let output = polycall(&["3", "ruby", "0", "0", "0", "90"]);
    insta::assert_snapshot!(stdout(&output), @"10007.54 km");
}

#[test]
fn unsupported_language_exits_with_one() {
    let mut args = vec!["1", "python"];
    args.extend(LONDON_NEW_YORK);
    let output = polycall(&args);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    insta::assert_snapshot!(stderr(&output), @"Haversine distance code is not provided for 'python'");
}

#[test]
fn unknown_mode_exits_with_one() {
    let mut args = vec!["8", "js"];
    args.extend(LONDON_NEW_YORK);
    let output = polycall(&args);
    assert_eq!(output.status.code(), Some(1));
    insta::assert_snapshot!(stderr(&output), @"unexpected mode '8' (expected 0-7)");
}

#[test]
fn wrong_argument_count_prints_usage() {
    let output = polycall(&["0", "js", "1.0"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("Usage: "));
}

#[test]
fn iterations_and_verbose() {
    let mut args = vec!["--iterations", "5", "--verbose", "2", "js"];
    args.extend(LONDON_NEW_YORK);
    let output = polycall(&args);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "5570.25 km");
    let err = stderr(&output);
    assert!(err.contains("samples: 5"), "{}", err);
    assert!(err.contains("mean: "), "{}", err);
}

#[test]
fn contention_probe_for_the_synchronized_cache() {
    let mut args = vec!["3", "ruby", "--contention", "8"];
    args.extend(LONDON_NEW_YORK);
    let output = polycall(&args);
    assert!(output.status.success(), "{}", stderr(&output));
    insta::assert_snapshot!(stdout(&output), @r"
    policy: thread-safe-parse-cache
    language: ruby
    callers: 8
    evaluations: 1
    cached entries: 1
    5570.25 km
    ");
}

#[test]
fn contention_needs_a_cache_mode() {
    let mut args = vec!["4", "js", "--contention", "4"];
    args.extend(LONDON_NEW_YORK);
    let output = polycall(&args);
    assert_eq!(output.status.code(), Some(1));
    insta::assert_snapshot!(stderr(&output), @"--contention needs a guest cache mode (1-3), got 4");
}

#[test]
fn missing_config_file_exits_with_one() {
    let mut args = vec!["0", "js", "--config", "/nonexistent/polycall.json"];
    args.extend(LONDON_NEW_YORK);
    let output = polycall(&args);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("invalid config '/nonexistent/polycall.json'"));
}

#[test]
fn runner_binaries() {
    let output = run(env!("CARGO_BIN_EXE_native-runner"), &LONDON_NEW_YORK);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "5570.25 km");

    let mut args = vec!["ruby"];
    args.extend(LONDON_NEW_YORK);
    let output = run(env!("CARGO_BIN_EXE_polyglot-runner"), &args);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "5570.25 km");

    let output = run(env!("CARGO_BIN_EXE_polyglot-runner"), &["js", "48.8566", "2.3522"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn ruby_runner_binary() {
    let output = run(env!("CARGO_BIN_EXE_native-runner-ruby"), &LONDON_NEW_YORK);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "5570.25 km");

    let output = run(env!("CARGO_BIN_EXE_native-runner-ruby"), &["0", "0", "0", "0x5A"]);
    insta::assert_snapshot!(stdout(&output), @"10007.54 km");

    let output = run(env!("CARGO_BIN_EXE_native-runner-ruby"), &["ruby", "0", "0", "0", "90"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("Usage: "));
}

#[test]
fn out_of_domain_ruby_exits_with_one() {
    let output = polycall(&["1", "ruby", "-79.4183", "0", "-79.4183", "0"]);
    assert_eq!(output.status.code(), Some(1));
    insta::assert_snapshot!(
        stderr(&output),
        @r#"Math::DomainError: Numerical argument is out of domain - "acos" (eval):7:34"#
    );

    let output = polycall(&["1", "js", "-79.4183", "0", "-79.4183", "0"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "NaN km");
}

#[test]
fn help_lists_modes() {
    let output = polycall(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("--contention <n>"));
    assert!(stdout(&output).contains("bench/NativeLibraryRuby.distance"));
}
