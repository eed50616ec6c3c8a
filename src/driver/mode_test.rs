use crate::backend::{BackendKind, Coordinates, Library};
use crate::cache::CachePolicy;
use crate::driver::ExecMode;
use crate::scripts::Language;

#[test]
fn codes_round_trip() {
    for mode in ExecMode::ALL {
        assert_eq!(ExecMode::from_code(mode.code()), Some(mode));
        assert_eq!(ExecMode::parse(&mode.to_string()).unwrap(), mode);
    }
    assert_eq!(ExecMode::from_code(8), None);
}

#[test]
fn modes_select_backend_and_policy() {
    let table: Vec<(u8, BackendKind, Option<CachePolicy>, Library)> = ExecMode::ALL
        .iter()
        .map(|mode| (mode.code(), mode.backend(), mode.policy(), mode.library()))
        .collect();
    assert_eq!(
        table,
        vec![
            (0, BackendKind::NativeEntry, None, Library::Host),
            (1, BackendKind::NativeEntry, Some(CachePolicy::None), Library::Host),
            (2, BackendKind::NativeEntry, Some(CachePolicy::Unsynchronized), Library::Host),
            (3, BackendKind::NativeEntry, Some(CachePolicy::Synchronized), Library::Host),
            (4, BackendKind::VmDirect, None, Library::Host),
            (5, BackendKind::VmGuest, None, Library::Host),
            (6, BackendKind::NativeEntry, None, Library::PrecompiledRuby),
            (7, BackendKind::VmDirect, None, Library::PrecompiledRuby),
        ]
    );
}

#[test]
fn invalid_modes_are_usage_errors() {
    for text in ["8", "-1", "two", ""] {
        assert!(ExecMode::parse(text).is_err(), "{:?}", text);
    }
    let err = ExecMode::parse("9").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"unexpected mode '9' (expected 0-7)");
}

#[test]
fn case_carries_language_and_coordinates() {
    let coordinates = Coordinates::new(0.0, 0.0, 0.0, 90.0);
    let case = ExecMode::NativeNoCache.case(Language::Ruby, coordinates);
    assert_eq!(case.language, Language::Ruby);
    assert_eq!(case.coordinates, coordinates);
    assert_eq!(case.policy, Some(CachePolicy::None));
}

#[test]
fn precompiled_ruby_cases_are_named_by_library() {
    let coordinates = Coordinates::new(0.0, 0.0, 0.0, 90.0);
    let native = ExecMode::NativeRubyDistance.case(Language::Js, coordinates);
    let direct = ExecMode::VmDirectRuby.case(Language::Js, coordinates);
    insta::assert_snapshot!(native.to_string(), @"native-entry/precompiled-ruby");
    insta::assert_snapshot!(direct.to_string(), @"vm-direct/precompiled-ruby");
    assert_eq!(
        ExecMode::VmDirect.case(Language::Js, coordinates).to_string(),
        "vm-direct/js"
    );
}
