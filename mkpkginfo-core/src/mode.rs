// mkpkginfo-core/src/mode.rs
use mkpkginfo_common::error::{MkPkgInfoError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static MODE_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[augo]+[=+-][rstwxXugo]+$").expect("mode clause regex is valid"));

/// Validates a chmod-style symbolic mode such as `u+rw,go-w`.
///
/// Clauses may be separated by commas or spaces. Returns the clauses joined
/// with commas.
pub fn validate_symbolic_mode(mode: &str) -> Result<String> {
    let clauses: Vec<&str> = mode
        .split(|c: char| c == ',' || c == ' ')
        .filter(|c| !c.is_empty())
        .collect();
    if clauses.is_empty() {
        return Err(MkPkgInfoError::Usage(format!(
            "Invalid mode '{mode}': no mode clauses given"
        )));
    }
    if let Some(bad) = clauses.iter().find(|c| !MODE_CLAUSE.is_match(c)) {
        return Err(MkPkgInfoError::Usage(format!(
            "Invalid mode '{mode}': '{bad}' is not a symbolic mode clause"
        )));
    }
    Ok(clauses.join(","))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn accepts_symbolic_clauses() {
        assert_eq!(validate_symbolic_mode("go-w").unwrap(), "go-w");
        assert_eq!(validate_symbolic_mode("u+rwX,go=rX").unwrap(), "u+rwX,go=rX");
        assert_eq!(validate_symbolic_mode("a+x o-w").unwrap(), "a+x,o-w");
        assert_eq!(validate_symbolic_mode("ug=o").unwrap(), "ug=o");
    }

    #[test]
    fn rejects_anything_else() {
        for bad in ["", " , ", "755", "u+q", "x+r", "u+", "+rw", "u+rw,644"] {
            assert!(
                matches!(validate_symbolic_mode(bad), Err(MkPkgInfoError::Usage(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn stray_separators_are_ignored() {
        assert_eq!(validate_symbolic_mode("u+rw, ").unwrap(), "u+rw");
    }
}
