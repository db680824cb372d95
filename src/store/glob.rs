//! Glob Matching
//!
//! SCAN MATCH patterns: `*` matches any run of characters, `?` exactly one.

/// Returns true when `text` matches the glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let mut p = 0;
    let mut t = 0;
    // Position of the last `*` and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p).copied() {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some('?') => {
                p += 1;
                t += 1;
                continue;
            }
            Some(c) if c == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star_p, star_t)) => {
                p = star_p + 1;
                t = star_t + 1;
                backtrack = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_pattern() {
        assert!(glob_match("Room:*", "Room:42"));
        assert!(glob_match("Room:*", "Room:"));
        assert!(glob_match("Room:*", "Room:42:Players"));
        assert!(!glob_match("Room:*", "Room"));
        assert!(!glob_match("Room:*", "Player:p1"));
    }

    #[test]
    fn test_wildcards() {
        assert!(glob_match("*", ""));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("*:Quiz:*:Choices", "Room:1:Quiz:q1:Choices"));
        assert!(!glob_match("*:Choices", "Room:1:Quiz:q1"));
    }
}
