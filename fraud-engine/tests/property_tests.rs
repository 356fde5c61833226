//! Property-based tests for the fraud evaluator

use atlas_codec::geotag::CITIES;
use fraud_engine::{ComparisonMode, FraudEvaluator};
use proptest::prelude::*;

fn city_index() -> impl Strategy<Value = usize> {
    0..CITIES.len()
}

proptest! {
    /// Property: city comparisons are symmetric and flag exactly above the threshold
    #[test]
    fn prop_city_pairs(a in city_index(), b in city_index()) {
        let evaluator = FraudEvaluator::default();
        let (a, b) = (CITIES[a].code, CITIES[b].code);

        let forward = evaluator.check_fraud(a, b);
        let backward = evaluator.check_fraud(b, a);

        prop_assert_eq!(forward.mode, ComparisonMode::City);
        prop_assert_eq!(forward.suspicious, backward.suspicious);

        let distance = forward.distance_km.unwrap();
        prop_assert_eq!(forward.suspicious, distance > 100.0);
        prop_assert_eq!(a == b, distance == 0.0);
    }

    /// Property: identical coordinates are never suspicious
    #[test]
    fn prop_same_point(lat in -89.0f64..89.0, lng in -179.0f64..179.0) {
        let point = format!("{},{}", lat, lng);
        let report = FraudEvaluator::default().check_fraud(&point, &point);
        prop_assert_eq!(report.mode, ComparisonMode::Coordinates);
        prop_assert!(!report.suspicious);
    }
}
