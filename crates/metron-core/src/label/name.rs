/// Translate arbitrary text into a metric or label name.
///
/// The output matches `[a-z_][a-z0-9_]*`:
/// - characters outside `[A-Za-z0-9_]` become `_`;
/// - a lowercase letter or digit followed by an uppercase letter gets an `_` in between;
/// - letters are lowercased;
/// - a leading digit is prefixed with `_`, empty input becomes `_`.
///
/// # Examples
/// ```
/// use metron_core::label::sanitize_name;
///
/// assert_eq!(sanitize_name("my-label"), "my_label");
/// assert_eq!(sanitize_name("Another.Label"), "another_label");
/// assert_eq!(sanitize_name("requestCount"), "request_count");
/// ```
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    let mut prev: Option<char> = None;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            let boundary = c.is_ascii_uppercase()
                && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
        prev = Some(c);
    }

    if out.is_empty() {
        out.push('_');
    } else if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Returns `true` if `name` matches `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_valid_snake_case() {
        assert_eq!(sanitize_name("int_counter"), "int_counter");
        assert_eq!(sanitize_name("l1"), "l1");
    }

    #[test]
    fn replaces_punctuation() {
        assert_eq!(sanitize_name("my-label"), "my_label");
        assert_eq!(sanitize_name("a.b/c d"), "a_b_c_d");
        assert_eq!(sanitize_name("naïve"), "na_ve");
    }

    #[test]
    fn splits_camel_case() {
        assert_eq!(sanitize_name("Another.Label"), "another_label");
        assert_eq!(sanitize_name("requestCount"), "request_count");
        assert_eq!(sanitize_name("http2Server"), "http2_server");
        assert_eq!(sanitize_name("HTTP"), "http");
    }

    #[test]
    fn fixes_leading_digit_and_empty() {
        assert_eq!(sanitize_name("9lives"), "_9lives");
        assert_eq!(sanitize_name(""), "_");
    }

    #[test]
    fn output_is_always_valid() {
        for raw in ["", "9", "-", "Äpfel", "a.b", "X", "__x__", "ok_1"] {
            let name = sanitize_name(raw);
            assert!(is_valid_name(&name), "{raw:?} -> {name:?}");
        }
    }

    #[test]
    fn validates_names() {
        assert!(is_valid_name("a"));
        assert!(is_valid_name("_a1"));
        assert!(is_valid_name("Upper"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1a"));
        assert!(!is_valid_name("a-b"));
    }
}
