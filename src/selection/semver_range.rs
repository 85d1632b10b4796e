//! `appVersion` range satisfaction.
//!
//! The acquisition service's `appVersion` ranges are authored against
//! node-semver grammar (the original `blitzstudios/code-push-server`
//! uses node-semver), which differs from Rust's `semver` crate in three
//! ways this module bridges: a bare version string (`"1.2.3"`) means
//! "exactly this version" rather than caret compatibility; an AND group
//! of comparators is whitespace-separated (`">=1.0.0 <2.0.0"`) rather
//! than comma-separated; and alternatives are `||`-separated rather than
//! unsupported by the crate at all. Hyphen ranges (`"1.0.0 - 2.0.0"`)
//! are also translated.

/// True iff `version` satisfies `range` under node-semver rules.
pub fn satisfies(version: &str, range: &str) -> bool {
    let range = range.trim();
    if range.is_empty() || range == "*" {
        return true;
    }

    let Ok(ver) = semver::Version::parse(version) else {
        return false;
    };

    range
        .split("||")
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .filter_map(parse_clause)
        .any(|req| req.matches(&ver))
}

/// One `||`-separated alternative: either a hyphen range or a
/// whitespace-separated AND group of comparators, translated into the
/// `semver` crate's comma-separated grammar.
fn parse_clause(clause: &str) -> Option<semver::VersionReq> {
    if let Some((lo, hi)) = clause.split_once(" - ") {
        let normalized = format!(">={}, <={}", lo.trim(), hi.trim());
        return semver::VersionReq::parse(&normalized).ok();
    }

    let comparators: Vec<String> = clause.split_whitespace().map(normalize_comparator).collect();
    if comparators.is_empty() {
        return None;
    }

    semver::VersionReq::parse(&comparators.join(", ")).ok()
}

/// A bare version token (no leading range operator) means "exactly this
/// version" in node-semver; the `semver` crate needs an explicit `=`.
fn normalize_comparator(token: &str) -> String {
    let has_operator = token
        .chars()
        .next()
        .is_some_and(|c| matches!(c, '^' | '~' | '>' | '<' | '='));
    if has_operator {
        token.to_string()
    } else {
        format!("={token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_version_matches_itself_only() {
        assert!(satisfies("1.0.0", "1.0.0"));
        assert!(!satisfies("1.0.1", "1.0.0"));
    }

    #[test]
    fn caret_range_matches_compatible_versions() {
        assert!(satisfies("1.2.3", "^1.0.0"));
        assert!(!satisfies("2.0.0", "^1.0.0"));
    }

    #[test]
    fn wildcard_matches_everything_parseable() {
        assert!(satisfies("1.2.3", "*"));
    }

    #[test]
    fn comparison_range_matches() {
        assert!(satisfies("1.5.0", ">=1.0.0 <2.0.0"));
        assert!(!satisfies("2.0.0", ">=1.0.0 <2.0.0"));
    }

    #[test]
    fn hyphen_range_matches_inclusive_bounds() {
        assert!(satisfies("1.0.0", "1.0.0 - 2.0.0"));
        assert!(satisfies("2.0.0", "1.0.0 - 2.0.0"));
        assert!(!satisfies("2.0.1", "1.0.0 - 2.0.0"));
    }

    #[test]
    fn or_alternatives_match_if_any_clause_matches() {
        assert!(satisfies("1.5.0", "<1.0.0 || >=1.5.0 <2.0.0"));
        assert!(satisfies("0.5.0", "<1.0.0 || >=1.5.0 <2.0.0"));
        assert!(!satisfies("1.2.0", "<1.0.0 || >=1.5.0 <2.0.0"));
    }

    #[test]
    fn invalid_input_does_not_match() {
        assert!(!satisfies("not-a-version", "1.0.0"));
        assert!(!satisfies("1.0.0", "not-a-range"));
    }
}
