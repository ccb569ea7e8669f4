// crates/strata-core/src/core/pattern.rs
// ============================================================================
// Module: Strata Wildcard Patterns
// Description: Minimal glob matching with `*` and `?`.
// Purpose: Select histogram keys and directory entries by pattern.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Supports `*` (any run, possibly empty) and `?` (exactly one character).
//! Every other character matches literally. Matching is iterative with a
//! single backtrack point, so it runs in linear time for typical patterns.

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Returns true when `text` matches the wildcard `pattern`.
#[must_use]
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0_usize, 0_usize);
    let mut star: Option<usize> = None;
    let mut mark = 0_usize;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            mark = t;
            p += 1;
        } else if let Some(star_pos) = star {
            p = star_pos + 1;
            mark += 1;
            t = mark;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::wildcard_match;

    #[test]
    fn star_and_question_mark() {
        assert!(wildcard_match("steer.time.*", "steer.time.csvparser"));
        assert!(wildcard_match("*.csv", "a.csv"));
        assert!(wildcard_match("a?c", "abc"));
        assert!(!wildcard_match("a?c", "ac"));
        assert!(!wildcard_match("*.csv", "a.arrow"));
        assert!(wildcard_match("*", ""));
    }
}
