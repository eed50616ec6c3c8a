use crate::backend::Coordinates;
use crate::cache::CachePolicy;
use crate::driver::contention::probe;
use crate::geo::haversine_distance;
use crate::scripts::Language;

const PARIS_TOKYO: Coordinates = Coordinates {
    a_lat: 48.8566,
    a_long: 2.3522,
    b_lat: 35.6762,
    b_long: 139.6503,
};

fn expected() -> f64 {
    let [a, b, c, d] = PARIS_TOKYO.to_array();
    haversine_distance(a, b, c, d)
}

#[test]
fn synchronized_cache_evaluates_once() {
    for language in Language::ALL {
        let report = probe(CachePolicy::Synchronized, language, 16, PARIS_TOKYO).unwrap();
        assert_eq!(report.evaluations, 1);
        assert_eq!(report.cached_entries, 1);
        assert_eq!(report.results.len(), 16);
    }
}

#[test]
fn unsynchronized_cache_may_race_but_stays_correct() {
    let report = probe(CachePolicy::Unsynchronized, Language::Ruby, 16, PARIS_TOKYO).unwrap();
    assert!(report.evaluations >= 1 && report.evaluations <= 16);
    assert_eq!(report.cached_entries, 1);
    for result in report.results {
        assert!(((result - expected()) / expected()).abs() < 1e-9);
    }
}

#[test]
fn no_cache_evaluates_per_caller() {
    let report = probe(CachePolicy::None, Language::Js, 8, PARIS_TOKYO).unwrap();
    assert_eq!(report.evaluations, 8);
    assert_eq!(report.cached_entries, 0);
}
