// mkpkginfo-core/src/version.rs
//! Name/version splitting for installer file names and a loose, total
//! ordering over free-form version strings.

use std::cmp::Ordering;

fn is_noise(c: char) -> bool {
    matches!(c, ' ' | '_' | '-' | 'v')
}

fn is_trailing_separator(c: char) -> bool {
    matches!(c, '.' | '-' | '_' | 'v') || c.is_whitespace()
}

/// Splits `"Firefox3.6.8"` into `("Firefox", "3.6.8")`.
///
/// Every digit starts a candidate version running to the end of the string.
/// A candidate containing a space, underscore, hyphen or `v` is rejected and
/// scanning continues. Returns `(s, "")` when nothing qualifies.
pub fn split_name_version(s: &str) -> (String, String) {
    for (idx, c) in s.char_indices() {
        if !c.is_ascii_digit() {
            continue;
        }
        let candidate = &s[idx..];
        if candidate.contains(is_noise) {
            continue;
        }
        let base = s[..idx].trim_end_matches(is_trailing_separator);
        return (base.to_string(), candidate.to_string());
    }
    (s.to_string(), String::new())
}

#[derive(Debug, Clone)]
enum Segment {
    /// Digits with leading zeros stripped, so arbitrarily long runs compare
    /// without overflow.
    Number(String),
    Word(String),
}

impl Segment {
    fn zero() -> Self {
        Segment::Number(String::new())
    }

    fn cmp_segment(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Segment::Number(_), Segment::Word(_)) => Ordering::Less,
            (Segment::Word(_), Segment::Number(_)) => Ordering::Greater,
            (Segment::Word(a), Segment::Word(b)) => a.cmp(b),
        }
    }
}

/// A version string compared segment by segment.
///
/// Digit runs compare numerically, letter runs lexically, and a number always
/// sorts before a word. Anything else separates segments. The shorter side is
/// padded with zeros, so `10.6` and `10.6.0` are equal.
#[derive(Debug, Clone)]
pub struct LooseVersion {
    raw: String,
    segments: Vec<Segment>,
}

impl LooseVersion {
    pub fn new(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut chars = raw.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                let mut run = String::new();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    run.push(d);
                    chars.next();
                }
                segments.push(Segment::Number(run.trim_start_matches('0').to_string()));
            } else if c.is_alphabetic() {
                let mut run = String::new();
                while let Some(&a) = chars.peek().filter(|a| a.is_alphabetic()) {
                    run.push(a);
                    chars.next();
                }
                segments.push(Segment::Word(run));
            } else {
                chars.next();
            }
        }
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        let zero = Segment::zero();
        (0..len)
            .map(|i| {
                let a = self.segments.get(i).unwrap_or(&zero);
                let b = other.segments.get(i).unwrap_or(&zero);
                a.cmp_segment(b)
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LooseVersion {}

pub fn loosely_greater(a: &str, b: &str) -> bool {
    LooseVersion::new(a) > LooseVersion::new(b)
}

pub fn loosely_less(a: &str, b: &str) -> bool {
    LooseVersion::new(a) < LooseVersion::new(b)
}

/// The loosely highest of `versions`; the first one wins ties.
pub fn highest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().fold(None, |best, v| match best {
        Some(b) if !loosely_greater(v, b) => Some(b),
        _ => Some(v),
    })
}

/// The loosely lowest of `versions`; the first one wins ties.
pub fn lowest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().fold(None, |best, v| match best {
        Some(b) if !loosely_less(v, b) => Some(b),
        _ => Some(v),
    })
}
