/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in a raw
/// config file.
///
/// Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] but with an injected lookup, so tests never
/// touch the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut body = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            body.push(c);
        }

        if !closed || body.is_empty() {
            result.push_str("${");
            result.push_str(&body);
            continue;
        }

        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body.as_str(), None),
        };

        match (lookup(name).filter(|v| !v.is_empty()), fallback) {
            (Some(value), _) => result.push_str(&value),
            (None, Some(fallback)) => result.push_str(fallback),
            (None, None) => {
                result.push_str("${");
                result.push_str(&body);
                result.push('}');
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "BOTDECK_TEST_VAR" => Some("hello".to_string()),
            "BOTDECK_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("key=${BOTDECK_TEST_VAR}", lookup),
            "key=hello"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${BOTDECK_NONEXISTENT_XYZ}", lookup),
            "${BOTDECK_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn fallback_used_for_missing_or_empty() {
        assert_eq!(substitute_env_with("${NOPE:-3000}", lookup), "3000");
        assert_eq!(substitute_env_with("${BOTDECK_EMPTY:-x}", lookup), "x");
        assert_eq!(
            substitute_env_with("${BOTDECK_TEST_VAR:-x}", lookup),
            "hello"
        );
    }

    #[test]
    fn malformed_placeholder_is_literal() {
        assert_eq!(substitute_env_with("cost ${unclosed", lookup), "cost ${unclosed");
        assert_eq!(substitute_env_with("$5 and ${}", lookup), "$5 and ${");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
