// src/description.rs

//! Snapshot descriptions
//!
//! snapper shows descriptions in a fixed-width column, so long package lists
//! are collapsed to the first package plus a count of the rest. Lengths are
//! counted in characters, never bytes.

use crate::config::DESCRIPTION_LIMIT;

/// Marker appended to anything cut short
pub const ELLIPSIS: &str = "...";

/// Longest first-package name kept in a collapsed description
pub const FIRST_PACKAGE_LIMIT: usize = 32;

/// Format a description with the default display limit
///
/// See [`format_bounded`].
pub fn format(prefix: &str, action_label: &str, packages: &[String]) -> String {
    format_bounded(prefix, action_label, packages, DESCRIPTION_LIMIT)
}

/// Format `"{prefix}: {action_label} {pkg1,pkg2,...}"` within `limit` characters
///
/// When the joined form is too long it becomes
/// `"{prefix}: {action_label} {first} plus {n} packages"`, where `n` counts
/// every package after the first. An empty list reads `"0 packages"`.
pub fn format_bounded(prefix: &str, action_label: &str, packages: &[String], limit: usize) -> String {
    let head = format!("{}: {} ", prefix, action_label);

    let Some(first) = packages.first() else {
        return truncate(&format!("{}0 packages", head), limit);
    };

    let canonical = format!("{}{}", head, packages.join(","));
    if char_len(&canonical) <= limit {
        return canonical;
    }

    let rest = format!(" plus {} packages", packages.len() - 1);
    let room = limit
        .saturating_sub(char_len(&head) + char_len(&rest))
        .min(FIRST_PACKAGE_LIMIT);

    let collapsed = format!("{}{}{}", head, truncate(first, room), rest);
    truncate(&collapsed, limit)
}

/// Cut `text` to at most `max` characters, ending in [`ELLIPSIS`] when cut
pub fn truncate(text: &str, max: usize) -> String {
    if char_len(text) <= max {
        return text.to_string();
    }

    let marker = char_len(ELLIPSIS);
    if max <= marker {
        return text.chars().take(max).collect();
    }

    let kept: String = text.chars().take(max - marker).collect();
    format!("{}{}", kept, ELLIPSIS)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_form() {
        let desc = format("After", "Install", &names(&["foo", "bar"]));
        assert_eq!(desc, "After: Install foo,bar");
    }

    #[test]
    fn test_single_package() {
        let desc = format("Before", "Remove", &names(&["qux"]));
        assert_eq!(desc, "Before: Remove qux");
    }

    #[test]
    fn test_empty_package_list_reads_naturally() {
        let desc = format("After", "Remove", &[]);
        assert_eq!(desc, "After: Remove 0 packages");
    }

    #[test]
    fn test_exactly_at_limit_is_not_collapsed() {
        let head = "After: Install ";
        let pkg = "a".repeat(DESCRIPTION_LIMIT - head.len());
        let desc = format("After", "Install", &[pkg.clone()]);
        assert_eq!(desc, format!("{}{}", head, pkg));
        assert_eq!(desc.len(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_long_list_collapses_to_count() {
        let packages: Vec<String> = (0..40).map(|i| format!("libpackage{}", i)).collect();
        let desc = format("Before", "Install", &packages);
        assert_eq!(desc, "Before: Install libpackage0 plus 39 packages");
    }

    #[test]
    fn test_long_first_name_is_truncated() {
        let mut packages = names(&["linux-headers-6.8.0-45-generic-extra-long-name"]);
        packages.push("linux-image-6.8.0-45-generic".to_string());
        let desc = format("After", "Install", &packages);
        assert_eq!(desc, "After: Install linux-headers-6.8.0-45-generi... plus 1 packages");
        assert!(desc.chars().count() <= DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_truncation_law_holds_for_many_sizes() {
        for count in 1..200 {
            for name_len in [1, 5, 20, 31, 32, 33, 60, 100] {
                let packages: Vec<String> = (0..count)
                    .map(|i| format!("{}{}", "p".repeat(name_len), i))
                    .collect();
                for prefix in ["Before", "After"] {
                    for label in ["Install", "Remove"] {
                        let canonical = format!("{}: {} {}", prefix, label, packages.join(","));
                        let desc = format(prefix, label, &packages);
                        assert!(desc.chars().count() <= DESCRIPTION_LIMIT, "{}", desc);
                        if canonical.chars().count() > DESCRIPTION_LIMIT {
                            let shown: String = packages[0].chars().take(FIRST_PACKAGE_LIMIT - 3).collect();
                            assert!(desc.contains(&shown), "{}", desc);
                            assert!(desc.contains(&format!(" plus {} packages", count - 1)), "{}", desc);
                        } else {
                            assert_eq!(desc, canonical);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("paquet-été", 20), "paquet-été");
        assert_eq!(truncate("ééééééééé", 5), "éé...");
        assert_eq!(truncate("abcdef", 2), "ab");
    }
}
