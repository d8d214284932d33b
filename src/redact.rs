use std::borrow::Cow;

const REDACTED: &str = "REDACTED";

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }

    (0..=hay.len() - nee.len()).find(|&i| {
        hay[i..i + nee.len()]
            .iter()
            .zip(nee)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~' | '+' | '/' | '=')
}

/// Replaces the token that follows every `Bearer ` marker.
fn redact_bearer(text: &str) -> String {
    const MARKER: &str = "bearer ";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = find_ascii_case_insensitive(rest, MARKER) {
        let end = idx + MARKER.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let consumed: usize = rest
            .chars()
            .take_while(|ch| is_token_char(*ch))
            .map(char::len_utf8)
            .sum();
        if consumed > 0 {
            out.push_str(REDACTED);
        }
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

/// Replaces the string value of a JSON field such as `"refreshToken":"..."`.
fn redact_json_field(text: &str, field: &str) -> String {
    let needle = format!("\"{field}\"");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(&needle) {
        let end = idx + needle.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let ws: usize = rest
            .chars()
            .take_while(|ch| ch.is_whitespace() || *ch == ':')
            .map(char::len_utf8)
            .sum();
        if !rest[..ws].contains(':') || !rest[ws..].starts_with('"') {
            continue;
        }
        out.push_str(&rest[..ws]);
        rest = &rest[ws + 1..];

        let mut escaped = false;
        let mut consumed = rest.len();
        for (i, ch) in rest.char_indices() {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                consumed = i + 1;
                break;
            }
        }
        out.push('"');
        out.push_str(REDACTED);
        out.push('"');
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

/// Scrubs bearer tokens and credential fields from text headed for logs or
/// error messages.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = redact_bearer(input);
    for field in ["token", "accessToken", "refreshToken", "password"] {
        value = redact_json_field(&value, field);
    }

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_secrets_redacts_bearer_header_line() {
        let input = "Authorization: Bearer abc.def-123\n";
        let out = redact_secrets(input).to_string();
        assert_eq!(out, "Authorization: Bearer REDACTED\n");
    }

    #[test]
    fn redact_secrets_redacts_lowercase_bearer() {
        let out = redact_secrets("authorization: bearer s3cr3t; other").to_string();
        assert_eq!(out, "authorization: bearer REDACTED; other");
    }

    #[test]
    fn redact_secrets_redacts_json_token_fields() {
        let input = r#"{"token": "abc2", "refreshToken":"r\"1", "user":{"name":"Dr. Lee"}}"#;
        let out = redact_secrets(input).to_string();
        assert_eq!(
            out,
            r#"{"token": "REDACTED", "refreshToken":"REDACTED", "user":{"name":"Dr. Lee"}}"#
        );
    }

    #[test]
    fn redact_secrets_leaves_clean_text_borrowed() {
        let input = "Request failed with status code 500";
        assert!(matches!(redact_secrets(input), Cow::Borrowed(_)));
    }

    #[test]
    fn redact_secrets_ignores_field_names_in_prose() {
        let input = r#"missing "token" in response"#;
        assert_eq!(redact_secrets(input), input);
    }
}
