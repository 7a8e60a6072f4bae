//! TeamCity locator strings: building, splitting, merging
//!
//! A locator is a comma-separated list of `key:value` dimensions where a value
//! may itself be a parenthesized group of nested dimensions, e.g.
//! `project:(id:MyProject),branch:(refs/heads/main),status:SUCCESS`.
//! Everything in this module is a pure function over strings; malformed input
//! degrades to a locator that round-trips unchanged rather than erroring.

use chrono::{DateTime, Utc};

/// Top-level dimension separator
pub const SEPARATOR: char = ',';

/// Split a locator on the top-level separator, never inside a parenthesized
/// group. Depth never goes negative on stray `)`, and a trailing unclosed
/// group is returned verbatim as part of its segment. Empty segments are
/// dropped.
pub fn split_top_level(input: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;

    for ch in input.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c == SEPARATOR && depth == 0 => {
                if !current.trim().is_empty() {
                    segments.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        segments.push(current.trim().to_string());
    }

    segments
}

/// The key of a `key:value` dimension, lowercased for case-insensitive
/// comparison. A segment without a colon is its own key.
pub fn dimension_key(segment: &str) -> String {
    segment
        .split(':')
        .next()
        .unwrap_or(segment)
        .trim()
        .to_ascii_lowercase()
}

/// Preset selectors that TeamCity accepts unwrapped in dimension values,
/// e.g. `branch:default:any` or `branch:policy:ALL_BRANCHES`.
const UNWRAPPED_PRESETS: [&str; 3] = ["default:", "policy:", "unspecified:"];

/// Produce a `key:value` dimension, wrapping the value in parentheses unless
/// it is already a group, a preset selector, or a bare wildcard. Values with
/// whitespace, slashes, or embedded separators are always wrapped.
pub fn normalize_dimension(key: &str, raw_value: &str) -> String {
    let value = raw_value.trim();

    if value.starts_with('(') {
        return format!("{key}:{value}");
    }

    if UNWRAPPED_PRESETS.iter().any(|p| value.starts_with(p)) {
        return format!("{key}:{value}");
    }

    // A bare wildcard like "*" needs no grouping.
    if !value.is_empty() && value.chars().all(|c| c == '*') {
        return format!("{key}:{value}");
    }

    format!("{key}:({value})")
}

/// Append each of `new_segments` to `existing` unless its key is already
/// present (case-insensitive). Original order is preserved and no filter key
/// ever appears twice.
pub fn merge_segments(existing: &str, new_segments: &[String]) -> String {
    let mut merged = split_top_level(existing);
    let mut keys: Vec<String> = merged.iter().map(|s| dimension_key(s)).collect();

    for segment in new_segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let key = dimension_key(segment);
        if keys.contains(&key) {
            continue;
        }
        keys.push(key);
        merged.push(segment.to_string());
    }

    merged.join(",")
}

/// Structured filter criteria for build queries, flattened into a locator.
#[derive(Debug, Clone, Default)]
pub struct BuildLocator {
    pub project: Option<String>,
    pub build_type: Option<String>,
    pub status: Option<String>,
    pub branch: Option<String>,
    pub since_date: Option<DateTime<Utc>>,
    pub until_date: Option<DateTime<Utc>>,
    pub tag: Option<String>,
    pub personal: Option<bool>,
    pub canceled: Option<bool>,
    /// Free-form dimensions the caller already formatted; merged last so they
    /// never override the structured fields above.
    pub raw: Option<String>,
}

impl BuildLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// TeamCity's timestamp format for date dimensions: `yyyyMMddTHHmmss+0000`.
    fn format_date(date: &DateTime<Utc>) -> String {
        date.format("%Y%m%dT%H%M%S%z").to_string()
    }

    /// Flatten the criteria into a locator string, normalized and merged so
    /// each dimension key appears at most once.
    pub fn build(&self) -> String {
        let mut segments: Vec<String> = Vec::new();

        if let Some(project) = &self.project {
            segments.push(normalize_dimension("project", &format!("id:{project}")));
        }
        if let Some(build_type) = &self.build_type {
            segments.push(normalize_dimension("buildType", &format!("id:{build_type}")));
        }
        if let Some(status) = &self.status {
            segments.push(format!("status:{}", status.to_ascii_uppercase()));
        }
        if let Some(branch) = &self.branch {
            segments.push(normalize_dimension("branch", branch));
        }
        if let Some(since) = &self.since_date {
            segments.push(normalize_dimension("sinceDate", &Self::format_date(since)));
        }
        if let Some(until) = &self.until_date {
            segments.push(normalize_dimension("untilDate", &Self::format_date(until)));
        }
        if let Some(tag) = &self.tag {
            segments.push(normalize_dimension("tag", tag));
        }
        if let Some(personal) = self.personal {
            segments.push(format!("personal:{personal}"));
        }
        if let Some(canceled) = self.canceled {
            segments.push(format!("canceled:{canceled}"));
        }

        let structured = segments.join(",");
        match &self.raw {
            Some(raw) => merge_segments(&structured, &split_top_level(raw)),
            None => structured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_split_respects_groups() {
        assert_eq!(
            split_top_level("branch:(a,b),status:X"),
            vec!["branch:(a,b)", "status:X"]
        );
    }

    #[test]
    fn test_split_nested_groups() {
        assert_eq!(
            split_top_level("project:(id:(a,b),archived:false),count:10"),
            vec!["project:(id:(a,b),archived:false)", "count:10"]
        );
    }

    #[test]
    fn test_split_drops_empty_segments() {
        assert_eq!(split_top_level(",a,,b,"), vec!["a", "b"]);
        assert!(split_top_level("").is_empty());
    }

    #[test]
    fn test_split_malformed_parens() {
        // Stray closer: depth never goes negative, later separators still split.
        assert_eq!(split_top_level("a),b"), vec!["a)", "b"]);
        // Unclosed group swallows the rest of the input.
        assert_eq!(split_top_level("a:(b,c"), vec!["a:(b,c"]);
    }

    #[test]
    fn test_normalize_wraps_plain_values() {
        assert_eq!(normalize_dimension("branch", "main"), "branch:(main)");
        assert_eq!(
            normalize_dimension("branch", "refs/heads/main"),
            "branch:(refs/heads/main)"
        );
        assert_eq!(
            normalize_dimension("branch", "feature branch"),
            "branch:(feature branch)"
        );
    }

    #[test]
    fn test_normalize_is_idempotent_on_groups() {
        assert_eq!(
            normalize_dimension("branch", "(refs/heads/main)"),
            "branch:(refs/heads/main)"
        );
    }

    #[test]
    fn test_normalize_leaves_presets_unwrapped() {
        assert_eq!(
            normalize_dimension("branch", "default:any"),
            "branch:default:any"
        );
        assert_eq!(
            normalize_dimension("branch", "policy:ALL_BRANCHES"),
            "branch:policy:ALL_BRANCHES"
        );
    }

    #[test]
    fn test_normalize_leaves_wildcards_unwrapped() {
        assert_eq!(normalize_dimension("branch", "*"), "branch:*");
    }

    #[test]
    fn test_merge_never_duplicates_keys() {
        let merged = merge_segments(
            "branch:default:any",
            &["branch:(main)".to_string(), "status:SUCCESS".to_string()],
        );
        assert_eq!(merged, "branch:default:any,status:SUCCESS");
    }

    #[test]
    fn test_merge_key_match_is_case_insensitive() {
        let merged = merge_segments("BuildType:(id:X)", &["buildType:(id:Y)".to_string()]);
        assert_eq!(merged, "BuildType:(id:X)");
    }

    #[test]
    fn test_merge_into_empty() {
        let merged = merge_segments("", &["count:5".to_string()]);
        assert_eq!(merged, "count:5");
    }

    #[test]
    fn test_build_locator_flattens_criteria() {
        let since = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let locator = BuildLocator {
            project: Some("MyProject".to_string()),
            status: Some("success".to_string()),
            branch: Some("refs/heads/main".to_string()),
            since_date: Some(since),
            ..Default::default()
        }
        .build();

        assert_eq!(
            locator,
            "project:(id:MyProject),status:SUCCESS,branch:(refs/heads/main),sinceDate:(20240102T030405+0000)"
        );
    }

    #[test]
    fn test_build_locator_raw_never_overrides() {
        let locator = BuildLocator {
            branch: Some("main".to_string()),
            raw: Some("branch:(other),count:3".to_string()),
            ..Default::default()
        }
        .build();
        assert_eq!(locator, "branch:(main),count:3");
    }
}
