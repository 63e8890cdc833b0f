//! Wildcard filter predicate.
//!
//! A pattern without `*` is an exact, case-sensitive comparison. With one
//! or more `*` it becomes a full-string glob where `*` matches any run of
//! characters (including none) and every other character is literal: `?`,
//! brackets, dots and the like carry no special meaning. Matching is a
//! direct star/backtrack walk over bytes; there is no regex engine behind
//! it and nothing to escape.

/// Whether `value` matches `pattern` in full.
///
/// ```
/// use csvbin::query::pattern::matches;
///
/// assert!(matches("jenkins46", "jenkins46"));
/// assert!(matches("jenkins*", "jenkins46"));
/// assert!(matches("jenkins*46", "jenkins-test-46"));
/// assert!(!matches("jenkins*", "xjenkins46"));
/// ```
pub fn matches(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }
    glob_match(pattern.as_bytes(), value.as_bytes())
}

/// Anchored glob match supporting `*` only.
///
/// Two-pointer walk: on a mismatch after a star, rewind to just past the
/// star and retry one byte further into the text. Byte-wise comparison is
/// exact for UTF-8 literals since star gaps are unconstrained.
fn glob_match(p: &[u8], t: &[u8]) -> bool {
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star_pi: Option<usize> = None;
    let mut star_ti: usize = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star_pi = Some(pi);
            pi += 1;
            star_ti = ti;
            continue;
        }
        if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
            continue;
        }
        if let Some(sp) = star_pi {
            pi = sp + 1;
            star_ti += 1;
            ti = star_ti;
            continue;
        }
        return false;
    }

    // Trailing stars match the empty suffix.
    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}
