//! Field comparison helpers for change detectors
//!
//! Providers report "unset" as either a missing field or an empty string;
//! the helpers here treat both the same so a detector never flags a change
//! the provider did not make.

use shared::models::Tags;
use std::collections::BTreeSet;

fn norm(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

/// Optional text differs, with `None` equal to `""`
pub fn text_differs(cloud: Option<&str>, local: Option<&str>) -> bool {
    norm(cloud) != norm(local)
}

/// Compare only when the provider reported a non-empty value
pub fn differs_if_reported(cloud: Option<&str>, local: Option<&str>) -> bool {
    match cloud {
        Some(value) if !value.is_empty() => value != norm(local),
        _ => false,
    }
}

/// Order-insensitive comparison of id / CIDR / address lists
pub fn set_differs<A: AsRef<str>, B: AsRef<str>>(cloud: &[A], local: &[B]) -> bool {
    let cloud: BTreeSet<&str> = cloud.iter().map(AsRef::as_ref).collect();
    let local: BTreeSet<&str> = local.iter().map(AsRef::as_ref).collect();
    cloud != local
}

pub fn tags_differ(cloud: &Tags, local: &Tags) -> bool {
    cloud != local
}

pub fn opt_differs<T: PartialEq>(cloud: Option<T>, local: Option<T>) -> bool {
    cloud != local
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::tags_from_pairs;

    #[test]
    fn missing_equals_empty() {
        assert!(!text_differs(None, Some("")));
        assert!(!text_differs(Some(""), None));
        assert!(text_differs(Some("a"), None));
        assert!(!text_differs(Some("a"), Some("a")));
    }

    #[test]
    fn unreported_values_never_differ() {
        assert!(!differs_if_reported(None, Some("old")));
        assert!(!differs_if_reported(Some(""), Some("old")));
        assert!(differs_if_reported(Some("new"), Some("old")));
        assert!(differs_if_reported(Some("new"), None));
    }

    #[test]
    fn lists_compare_as_sets() {
        assert!(!set_differs(&["10.0.0.0/16", "10.1.0.0/16"], &[
            "10.1.0.0/16".to_string(),
            "10.0.0.0/16".to_string()
        ]));
        assert!(set_differs(&["10.0.0.0/16"], &["10.0.0.0/8"]));
        assert!(!set_differs::<&str, &str>(&[], &[]));
    }

    #[test]
    fn tags_compare_by_content() {
        let a = tags_from_pairs([("k", "v")]);
        let b = tags_from_pairs([("k", "w")]);
        assert!(tags_differ(&a, &b));
        assert!(!tags_differ(&a, &a.clone()));
        assert!(opt_differs(Some(1), None));
    }
}
