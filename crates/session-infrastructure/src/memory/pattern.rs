//! Glob patterns as used by `delete`: `*`, `?`, `[...]` classes and
//! backslash escapes.

use regex::Regex;
use session_core::StoreError;

pub fn glob_to_regex(pattern: &str) -> Result<Regex, StoreError> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(r"\\"),
            },
            '[' => {
                out.push('[');
                let mut first = true;
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '!' | '^' if first => out.push('^'),
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push_str(&regex::escape(&escaped.to_string()));
                            }
                        }
                        ']' | '[' | '&' | '~' => {
                            out.push('\\');
                            out.push(c);
                        }
                        _ => out.push(c),
                    }
                    first = false;
                }
                if !closed {
                    return Err(StoreError::InvalidPattern(format!(
                        "unterminated character class in {:?}",
                        pattern
                    )));
                }
                out.push(']');
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    Regex::new(&out).map_err(|e| StoreError::InvalidPattern(e.to_string()))
}
