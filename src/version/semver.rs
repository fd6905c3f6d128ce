use semver::Version;

use crate::version::range::Range;

/// Clean a specifier into an exact version.
///
/// Surrounding whitespace and any leading `=` or `v` are dropped; the rest must
/// be a complete `MAJOR.MINOR.PATCH` version.
///
/// Examples:
/// - " v8.1.0 " -> Version(8, 1, 0)
/// - "=v6.14.4" -> Version(6, 14, 4)
/// - "8.1" -> None
pub fn clean_version(spec: &str) -> Option<Version> {
    let spec = spec.trim().trim_start_matches('=').trim_start();
    let spec = spec
        .strip_prefix('v')
        .or_else(|| spec.strip_prefix('V'))
        .unwrap_or(spec);
    Version::parse(spec).ok()
}

/// Parse every entry as a version, drop the invalid ones and sort ascending.
///
/// Ordering is semantic (`2.0.0` < `10.0.0`), not lexical.
pub fn sort_versions<I, S>(versions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed: Vec<Version> = versions
        .into_iter()
        .filter_map(|v| clean_version(v.as_ref()))
        .collect();
    parsed.sort();
    parsed.dedup();
    parsed.into_iter().map(|v| v.to_string()).collect()
}

/// Pick the highest version in `pool` satisfying `range`.
pub fn max_satisfying(range: &Range, pool: &[String]) -> Option<String> {
    pool.iter()
        .filter_map(|v| clean_version(v))
        .filter(|v| range.satisfies(v))
        .max()
        .map(|v| v.to_string())
}
