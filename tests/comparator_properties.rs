//! Counting properties of single-schema comparison.

mod common;

use common::*;
use derive_parity::comparator::TRUNCATION_LINE;
use derive_parity::{assert_with_log, test_complete, test_phase};
use proptest::prelude::*;

#[test]
fn identical_logic_passes_with_a_single_summary_line() {
    init_test_logging();
    test_phase!("identical_logic_passes_with_a_single_summary_line");
    let cmp = comparator(diverging_pair(30, &[]), attribute_loader());
    for schema in ["initials", "tones", "indices"] {
        let (passed, lines) = cmp.compare(schema).unwrap().into_parts();
        assert_with_log!(passed, "passed", true, passed);
        assert_eq!(lines, vec!["All 30 tests passed".to_string()], "{schema}");
    }
    test_complete!("identical_logic_passes_with_a_single_summary_line");
}

#[test]
fn divergence_only_hits_schemas_that_read_it() {
    init_test_logging();
    test_phase!("divergence_only_hits_schemas_that_read_it");
    let cmp = comparator(diverging_pair(12, &[0, 5, 11]), attribute_loader());

    assert!(cmp.compare("initials").unwrap().passed());
    let tones = cmp.compare("tones").unwrap();
    assert_with_log!(
        tones.error_count == 3,
        "error count",
        3,
        tones.error_count
    );
    assert_eq!(tones.summary_line(), Some("3/12 test(s) failed"));
    assert!(tones.lines[..3].iter().all(|line| line.contains("Received: X")));
    test_complete!("divergence_only_hits_schemas_that_read_it");
}

#[test]
fn default_limit_truncates_at_twenty() {
    init_test_logging();
    test_phase!("default_limit_truncates_at_twenty");
    let divergent: Vec<usize> = (0..40).map(|i| i * 2).collect();
    let cmp = comparator(diverging_pair(100, &divergent), attribute_loader());
    let summary = cmp.compare("tones").unwrap();

    assert!(summary.truncated);
    assert_eq!(summary.error_count, 20);
    assert_eq!(summary.run_count, 39);
    assert_eq!(summary.lines.len(), 22);
    assert_eq!(summary.lines[20], TRUNCATION_LINE);
    assert_eq!(summary.summary_line(), Some("20+/39+ test(s) failed"));
    test_complete!("default_limit_truncates_at_twenty", run_count = summary.run_count);
}

#[test]
fn limit_reached_on_last_item_still_marks_truncation() {
    init_test_logging();
    let cmp = comparator(diverging_pair(5, &[2, 4]), attribute_loader()).with_error_limit(2);
    let summary = cmp.compare("tones").unwrap();
    assert_eq!(summary.run_count, 5);
    assert_eq!(summary.summary_line(), Some("2+/5+ test(s) failed"));
}

#[test]
fn empty_domain_trivially_passes() {
    init_test_logging();
    let cmp = comparator(diverging_pair(0, &[]), attribute_loader());
    let summary = cmp.compare("tones").unwrap();
    assert!(summary.passed());
    assert_eq!(summary.run_count, 0);
}

proptest! {
    #![proptest_config(test_proptest_config(64))]

    #[test]
    fn k_divergences_below_limit_report_k_of_n(
        size in 1usize..60,
        picks in proptest::collection::btree_set(0usize..60, 0..19),
    ) {
        let divergent: Vec<usize> = picks.into_iter().filter(|i| *i < size).collect();
        let cmp = comparator(diverging_pair(size, &divergent), attribute_loader());
        let summary = cmp.compare("tones").unwrap();
        let k = divergent.len();

        prop_assert_eq!(summary.passed(), k == 0);
        prop_assert_eq!(summary.run_count, size);
        prop_assert_eq!(summary.lines.len(), k + 1);
        let expected = if k == 0 {
            format!("All {size} tests passed")
        } else {
            format!("{k}/{size} test(s) failed")
        };
        prop_assert_eq!(summary.summary_line(), Some(expected.as_str()));
    }

    #[test]
    fn divergences_at_or_over_limit_stop_early(
        limit in 1usize..10,
        extra in 0usize..10,
        spacing in 1usize..4,
        tail in 0usize..10,
    ) {
        let count = limit + extra;
        let divergent: Vec<usize> = (0..count).map(|i| i * spacing).collect();
        let size = divergent[count - 1] + 1 + tail;
        let cmp = comparator(diverging_pair(size, &divergent), attribute_loader())
            .with_error_limit(limit);
        let summary = cmp.compare("tones").unwrap();

        let stop = divergent[limit - 1] + 1;
        prop_assert!(summary.truncated);
        prop_assert_eq!(summary.run_count, stop);
        prop_assert!(summary.run_count <= size);
        prop_assert_eq!(summary.lines[limit].as_str(), TRUNCATION_LINE);
        let expected = format!("{limit}+/{stop}+ test(s) failed");
        prop_assert_eq!(summary.summary_line(), Some(expected.as_str()));
    }
}
