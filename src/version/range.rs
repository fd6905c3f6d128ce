//! npm-style semver ranges
//!
//! Supports the range grammar npm users write in `.npm-version` files and on the
//! command line:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `1`, `1.2`, `*` - wildcards and partial versions
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - space-separated AND and `||`-separated OR
//!
//! Every form is lowered to plain bound comparators when parsed. A partial
//! version stands for the whole span it leaves open, so `<=8.1` becomes
//! `<8.2.0` and `>8` becomes `>=9.0.0`.

use semver::Version;

/// A parsed range specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Range {
    /// Single comparator
    Single(Comparator),
    /// AND of ranges (>=1.0.0 <2.0.0) - space-separated, all must satisfy
    And(Vec<Range>),
    /// OR of ranges (^1.0.0 || ^2.0.0) - any must satisfy
    Or(Vec<Range>),
}

impl Range {
    /// Parse a range specification string
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }

        // OR has the lowest precedence
        if spec.contains("||") {
            let ranges: Option<Vec<Range>> = spec
                .split("||")
                .map(|s| s.trim())
                .map(Self::parse_set)
                .collect();
            return ranges.map(Range::Or);
        }

        Self::parse_set(spec)
    }

    /// Parse one `||` alternative: a hyphen range or space-separated comparators
    fn parse_set(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }

        let comparators = match spec.split_once(" - ") {
            Some((from, to)) => hyphen(from, to)?,
            None => {
                let mut comparators = Vec::new();
                for part in Self::split_and_parts(spec) {
                    comparators.extend(lower(&part)?);
                }
                comparators
            }
        };

        let mut ranges: Vec<Range> = comparators.into_iter().map(Range::Single).collect();
        if ranges.len() == 1 {
            ranges.pop()
        } else {
            Some(Range::And(ranges))
        }
    }

    /// Split spec into AND parts, keeping an operator glued to its version
    /// (`>= 1.2.3` is one part)
    fn split_and_parts(spec: &str) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();
        let mut pending_operator: Option<&str> = None;

        for token in spec.split_whitespace() {
            if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
                pending_operator = Some(token);
                continue;
            }
            match pending_operator.take() {
                Some(op) => parts.push(format!("{op}{token}")),
                None => parts.push(token.to_string()),
            }
        }

        parts
    }

    /// Check if a version satisfies this range.
    ///
    /// Prerelease versions only satisfy a range that names a prerelease of the
    /// same `major.minor.patch`.
    pub fn satisfies(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && !self.allows_prerelease_of(version) {
            return false;
        }
        self.matches(version)
    }

    fn matches(&self, version: &Version) -> bool {
        match self {
            Range::Single(comparator) => comparator.satisfies(version),
            Range::And(ranges) => ranges.iter().all(|r| r.matches(version)),
            Range::Or(ranges) => ranges.iter().any(|r| r.matches(version)),
        }
    }

    fn allows_prerelease_of(&self, version: &Version) -> bool {
        match self {
            Range::Single(comparator) => comparator.version().is_some_and(|v| {
                !v.pre.is_empty()
                    && v.major == version.major
                    && v.minor == version.minor
                    && v.patch == version.patch
            }),
            Range::And(ranges) | Range::Or(ranges) => {
                ranges.iter().any(|r| r.allows_prerelease_of(version))
            }
        }
    }
}

/// A single bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    /// Exact version match
    Exact(Version),
    /// Greater than or equal
    Gte(Version),
    /// Greater than
    Gt(Version),
    /// Less than or equal
    Lte(Version),
    /// Less than
    Lt(Version),
    /// Any version: `*`, `x`
    Any,
}

impl Comparator {
    fn satisfies(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(v) => version == v,
            Comparator::Gte(v) => version >= v,
            Comparator::Gt(v) => version > v,
            Comparator::Lte(v) => version <= v,
            Comparator::Lt(v) => version < v,
            Comparator::Any => true,
        }
    }

    fn version(&self) -> Option<&Version> {
        match self {
            Comparator::Exact(v)
            | Comparator::Gte(v)
            | Comparator::Gt(v)
            | Comparator::Lte(v)
            | Comparator::Lt(v) => Some(v),
            Comparator::Any => None,
        }
    }
}

/// A version with trailing components left open: `8`, `8.1`, `8.x`, `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partial {
    Any,
    Major(u64),
    Minor(u64, u64),
}

/// Either a complete version or a partial one
#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Full(Version),
    Partial(Partial),
}

impl Bound {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('=').trim_start();
        let s = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .unwrap_or(s);
        if s.is_empty() {
            return None;
        }

        // Build metadata never affects matching
        let core = s.split_once('+').map_or(s, |(core, _)| core);
        let numbers = core.split_once('-').map_or(core, |(numbers, _)| numbers);
        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() > 3 {
            return None;
        }

        // Once a component is left open, every later one must be too
        let open = parts.iter().position(|p| is_wild(p)).unwrap_or(parts.len());
        if !parts[open..].iter().all(|p| is_wild(p)) {
            return None;
        }

        let bound = match open {
            0 => Bound::Partial(Partial::Any),
            1 => Bound::Partial(Partial::Major(number(parts[0])?)),
            2 => Bound::Partial(Partial::Minor(number(parts[0])?, number(parts[1])?)),
            _ => return Version::parse(s).ok().map(Bound::Full),
        };
        // A prerelease tag only makes sense on a complete version
        (core == numbers).then_some(bound)
    }

    /// Lowest version inside the bound
    fn floor(&self) -> Option<Version> {
        match self {
            Bound::Full(v) => Some(v.clone()),
            Bound::Partial(Partial::Any) => None,
            Bound::Partial(Partial::Major(major)) => Some(Version::new(*major, 0, 0)),
            Bound::Partial(Partial::Minor(major, minor)) => Some(Version::new(*major, *minor, 0)),
        }
    }

    /// First version past a partial bound; complete versions have none
    fn ceiling(&self) -> Option<Version> {
        match self {
            Bound::Partial(Partial::Major(major)) => Some(Version::new(major + 1, 0, 0)),
            Bound::Partial(Partial::Minor(major, minor)) => {
                Some(Version::new(*major, minor + 1, 0))
            }
            Bound::Full(_) | Bound::Partial(Partial::Any) => None,
        }
    }
}

fn is_wild(part: &str) -> bool {
    part == "*" || part.eq_ignore_ascii_case("x")
}

fn number(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Lower one operator-prefixed part to plain comparators
fn lower(part: &str) -> Option<Vec<Comparator>> {
    let part = part.trim();

    if let Some(rest) = part.strip_prefix(">=") {
        Some(match Bound::parse(rest)?.floor() {
            Some(floor) => vec![Comparator::Gte(floor)],
            None => vec![Comparator::Any],
        })
    } else if let Some(rest) = part.strip_prefix("<=") {
        let bound = Bound::parse(rest)?;
        Some(match bound {
            Bound::Full(v) => vec![Comparator::Lte(v)],
            Bound::Partial(Partial::Any) => vec![Comparator::Any],
            partial => vec![Comparator::Lt(partial.ceiling()?)],
        })
    } else if let Some(rest) = part.strip_prefix('>') {
        match Bound::parse(rest)? {
            Bound::Full(v) => Some(vec![Comparator::Gt(v)]),
            // Nothing is above every version
            Bound::Partial(Partial::Any) => None,
            partial => Some(vec![Comparator::Gte(partial.ceiling()?)]),
        }
    } else if let Some(rest) = part.strip_prefix('<') {
        let bound = Bound::parse(rest)?;
        Some(vec![Comparator::Lt(bound.floor()?)])
    } else if let Some(rest) = part.strip_prefix('^') {
        caret(Bound::parse(rest)?)
    } else if let Some(rest) = part.strip_prefix('~') {
        tilde(Bound::parse(rest.trim_start_matches('>'))?)
    } else {
        Some(match Bound::parse(part)? {
            Bound::Full(v) => vec![Comparator::Exact(v)],
            Bound::Partial(Partial::Any) => vec![Comparator::Any],
            partial => vec![
                Comparator::Gte(partial.floor()?),
                Comparator::Lt(partial.ceiling()?),
            ],
        })
    }
}

/// `^`: changes that do not modify the left-most non-zero component
fn caret(bound: Bound) -> Option<Vec<Comparator>> {
    let upper = match &bound {
        Bound::Partial(Partial::Any) => return Some(vec![Comparator::Any]),
        Bound::Partial(Partial::Major(major)) => Version::new(major + 1, 0, 0),
        Bound::Partial(Partial::Minor(0, minor)) => Version::new(0, minor + 1, 0),
        Bound::Partial(Partial::Minor(major, _)) => Version::new(major + 1, 0, 0),
        Bound::Full(v) if v.major > 0 => Version::new(v.major + 1, 0, 0),
        Bound::Full(v) if v.minor > 0 => Version::new(0, v.minor + 1, 0),
        Bound::Full(v) => Version::new(0, 0, v.patch + 1),
    };
    Some(vec![Comparator::Gte(bound.floor()?), Comparator::Lt(upper)])
}

/// `~`: patch-level changes when a minor is given, otherwise minor-level
fn tilde(bound: Bound) -> Option<Vec<Comparator>> {
    let upper = match &bound {
        Bound::Partial(Partial::Any) => return Some(vec![Comparator::Any]),
        Bound::Full(v) => Version::new(v.major, v.minor + 1, 0),
        partial => partial.ceiling()?,
    };
    Some(vec![Comparator::Gte(bound.floor()?), Comparator::Lt(upper)])
}

/// `A - B`: inclusive, with a partial `B` covering everything it leaves open
fn hyphen(from: &str, to: &str) -> Option<Vec<Comparator>> {
    let from = Bound::parse(from)?;
    let to = Bound::parse(to)?;

    let mut comparators: Vec<Comparator> = from.floor().map(Comparator::Gte).into_iter().collect();
    match to {
        Bound::Full(v) => comparators.push(Comparator::Lte(v)),
        Bound::Partial(Partial::Any) => {}
        partial => comparators.push(Comparator::Lt(partial.ceiling()?)),
    }
    if comparators.is_empty() {
        comparators.push(Comparator::Any);
    }
    Some(comparators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn satisfies(spec: &str, version: &str) -> bool {
        let range = Range::parse(spec).unwrap();
        range.satisfies(&Version::parse(version).unwrap())
    }

    #[rstest]
    #[case("1.0.0", "1.0.0", true)]
    #[case("1.0.0", "1.0.1", false)]
    #[case("v1.0.0", "1.0.0", true)]
    #[case("=1.0.0", "1.0.0", true)]
    fn exact_match(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("^1.2.3", "1.2.3", true)]
    #[case("^1.2.3", "1.9.9", true)]
    #[case("^1.2.3", "1.2.2", false)]
    #[case("^1.2.3", "2.0.0", false)]
    #[case("^0.2.3", "0.2.9", true)]
    #[case("^0.2.3", "0.3.0", false)]
    #[case("^0.0.3", "0.0.3", true)]
    #[case("^0.0.3", "0.0.4", false)]
    #[case("^v2.0.0", "2.5.3", true)]
    #[case("^1.x", "1.9.0", true)]
    #[case("^1.x", "2.0.0", false)]
    #[case("^1.2", "1.1.9", false)]
    #[case("^1.2", "1.9.0", true)]
    #[case("^0.1", "0.1.7", true)]
    #[case("^0.1", "0.2.0", false)]
    fn caret_range(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("~1.2.3", "1.2.9", true)]
    #[case("~1.2.3", "1.3.0", false)]
    #[case("~1.2.3", "1.2.2", false)]
    #[case("~1.2", "1.2.0", true)]
    #[case("~1.2.x", "1.2.7", true)]
    #[case("~1.2.x", "1.3.0", false)]
    #[case("~1", "1.9.0", true)]
    #[case("~1", "2.0.0", false)]
    fn tilde_range(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case(">=1.0.0", "1.0.0", true)]
    #[case(">=1.0.0", "0.9.9", false)]
    #[case(">1.0.0", "1.0.0", false)]
    #[case("<=1.0.0", "1.0.0", true)]
    #[case("<1.0.0", "1.0.0", false)]
    #[case(">= 6.0.0", "6.14.4", true)]
    fn comparison_operators(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("<=8.1", "8.1.5", true)]
    #[case("<=8.1", "8.2.0", false)]
    #[case("<=8", "8.19.4", true)]
    #[case("<=8", "9.0.0", false)]
    #[case(">8", "8.19.4", false)]
    #[case(">8", "9.0.0", true)]
    #[case(">8.1", "8.1.5", false)]
    #[case(">8.1", "8.2.0", true)]
    #[case(">=8.1", "8.1.0", true)]
    #[case("<8.1", "8.0.9", true)]
    #[case("<8.1", "8.1.0", false)]
    #[case(">=8.x", "8.0.0", true)]
    fn comparison_with_partial_versions(
        #[case] spec: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("*", "0.0.1", true)]
    #[case("x", "9.9.9", true)]
    #[case("8", "8.19.2", true)]
    #[case("8", "9.0.0", false)]
    #[case("8.x", "8.1.0", true)]
    #[case("8.x.x", "8.1.0", true)]
    #[case("6.14", "6.14.18", true)]
    #[case("6.14", "6.15.0", false)]
    #[case("1.2.X", "1.2.5", true)]
    fn wildcards_and_partials(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("^6.0.0 || ^8.0.0", "8.5.0", true)]
    #[case("^6.0.0 || ^8.0.0", "7.0.0", false)]
    #[case(">=1.0.0 <2.0.0", "1.9.9", true)]
    #[case(">=1.0.0 <2.0.0", "2.0.0", false)]
    #[case("1.0.0 - 2.0.0", "2.0.0", true)]
    #[case("1.0.0 - 2.0.0", "2.0.1", false)]
    fn compound_ranges(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("7 - 8", "7.0.0", true)]
    #[case("7 - 8", "8.19.4", true)]
    #[case("7 - 8", "9.0.0", false)]
    #[case("7.1 - 7.2", "7.2.9", true)]
    #[case("7.1 - 7.2", "7.0.9", false)]
    #[case("7.1 - 7.2", "7.3.0", false)]
    #[case("1.0.0 - *", "99.0.0", true)]
    fn hyphen_with_partial_versions(
        #[case] spec: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("^7.0.0", "7.0.0-beta.1", false)]
    #[case(">=7.0.0-beta.0", "7.0.0-beta.1", true)]
    #[case(">=7.0.0-beta.0", "7.1.0-beta.1", false)]
    #[case("8", "8.0.0-rc.0", false)]
    fn prereleases_need_explicit_opt_in(
        #[case] spec: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(spec, version), expected);
    }

    #[rstest]
    #[case("")]
    #[case("latest")]
    #[case("match")]
    #[case("^foo")]
    #[case("1.2.3.4")]
    #[case("1.x.3")]
    #[case("1.2-beta")]
    #[case(">*")]
    fn rejects_non_ranges(#[case] spec: &str) {
        assert_eq!(Range::parse(spec), None);
    }

    #[test]
    fn lowers_partial_upper_bound_to_exclusive_ceiling() {
        assert_eq!(
            Range::parse("<=8.1"),
            Some(Range::Single(Comparator::Lt(Version::new(8, 2, 0))))
        );
        assert_eq!(
            Range::parse(">8"),
            Some(Range::Single(Comparator::Gte(Version::new(9, 0, 0))))
        );
    }
}
