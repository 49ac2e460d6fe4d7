//! Property tests for the tag codec and locator.

use kupydo::core::source::{extract_block, find_kwarg_line};
use kupydo::core::tag;
use proptest::prelude::*;

proptest! {
    #[test]
    fn wrap_unwrap_roundtrip(t in "[0-9a-f]{32}") {
        let wrapped = tag::wrap(&t).unwrap();
        prop_assert_eq!(wrapped.len(), 40);
        prop_assert_eq!(tag::unwrap(&wrapped), Some(t));
    }

    #[test]
    fn non_tags_are_rejected(s in "\\PC{0,48}") {
        prop_assume!(!tag::is_valid(&s));
        prop_assert_eq!(tag::wrap(&s), None);
        prop_assert_eq!(tag::unwrap(&s), None);
    }

    #[test]
    fn sanitize_recovers_requoted_tag(t in "[0-9a-f]{32}", pre in "[ '\"(]{0,4}", post in "[ '\",)]{0,4}") {
        let wrapped = tag::wrap(&t).unwrap();
        let dirty = format!("{}{}{}", pre, wrapped, post);
        prop_assert_eq!(tag::sanitize(&dirty), Some(wrapped.as_str()));
    }

    #[test]
    fn block_spans_whole_call(body in 0usize..8) {
        let mut lines = vec!["call(".to_string()];
        lines.extend((0..body).map(|i| format!("    arg{}=\"v{}\",", i, i)));
        lines.push(")".to_string());
        prop_assert_eq!(extract_block(&lines, 0), Some((0, body + 1)));
        lines.pop();
        prop_assert_eq!(extract_block(&lines, 0), None);
    }

    #[test]
    fn kwarg_found_on_its_own_line(n in 1usize..8, pick in 0usize..8) {
        let pick = pick % n;
        let mut lines = vec!["call(".to_string()];
        lines.extend((0..n).map(|i| format!("    key{}=\"value{}\",", i, i)));
        lines.push(")".to_string());
        let found = find_kwarg_line(&lines, 0, &format!("key{}", pick), &format!("value{}", pick)).unwrap();
        prop_assert_eq!(found, pick + 1);
    }
}

#[test]
fn test_sanitize_without_brackets() {
    assert_eq!(tag::sanitize("\"plain\","), None);
    assert_eq!(tag::sanitize("]["), None);
}
