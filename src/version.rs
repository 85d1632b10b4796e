//! Version normalizer (spec §4.1).
//!
//! Canonicalizes a partial app-version string supplied by a client to a
//! full three-segment semver string suitable for range satisfaction.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static RE_MAJOR_MINOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.\d+)([+-].*)?$").unwrap());

/// Normalize `input` into a full `X.Y.Z[+-tag]` form.
///
/// The function is total, deterministic, and idempotent on valid semver
/// input; empty input is returned unchanged.
pub fn normalize(input: &str) -> String {
    if input.is_empty() {
        return input.to_string();
    }

    if RE_INT.is_match(input) {
        return format!("{input}.0.0");
    }

    if let Some(caps) = RE_MAJOR_MINOR.captures(input) {
        let base = &caps[1];
        let tag = caps.get(2).map_or("", |m| m.as_str());
        return format!("{base}.0{tag}");
    }

    input.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_integer_gets_two_zero_segments() {
        assert_eq!(normalize("2"), "2.0.0");
        assert_eq!(normalize("10"), "10.0.0");
    }

    #[test]
    fn major_minor_gets_patch_inserted() {
        assert_eq!(normalize("2.5"), "2.5.0");
    }

    #[test]
    fn major_minor_with_tag_inserts_patch_before_tag() {
        assert_eq!(normalize("2.5+beta"), "2.5.0+beta");
        assert_eq!(normalize("2.5-rc1"), "2.5.0-rc1");
    }

    #[test]
    fn full_semver_is_unchanged() {
        assert_eq!(normalize("1.0.0"), "1.0.0");
        assert_eq!(normalize("1.0.0+beta"), "1.0.0+beta");
    }

    #[test]
    fn empty_input_is_unchanged() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn garbage_input_is_unchanged() {
        assert_eq!(normalize("not-a-version"), "not-a-version");
    }

    #[test]
    fn normalize_is_idempotent() {
        for v in ["2", "2.5", "2.5+beta", "1.0.0", "", "garbage"] {
            let once = normalize(v);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalize should be idempotent for {v:?}");
        }
    }
}
