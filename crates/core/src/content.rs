use serde_json::Value;

/// Values the model emits when it has nothing useful to say; they are
/// filtered out before rendering rather than shown to shoppers.
const PLACEHOLDER_VALUES: [&str; 8] =
    ["", "unspecified", "n/a", "na", "unknown", "none", "null", "-"];

const MAX_VALUE_WORDS: usize = 20;

pub fn is_placeholder(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    PLACEHOLDER_VALUES.contains(&normalized.as_str())
}

pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace().take(max_words).collect::<Vec<_>>().join(" ")
}

/// Collapse model-generated description copy to single-spaced plain text:
/// HTML tags, Markdown emphasis/headers/fences, and link syntax are removed.
/// Idempotent on already-plain text.
pub fn strip_to_plain_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                // Drop an HTML tag wholesale; an unclosed `<` swallows the rest.
                for next in chars.by_ref() {
                    if next == '>' {
                        break;
                    }
                }
                out.push(' ');
            }
            '[' => {
                // `[text](url)` keeps only the text.
                let mut text = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    text.push(next);
                }
                if closed && chars.peek() == Some(&'(') {
                    chars.next();
                    for next in chars.by_ref() {
                        if next == ')' {
                            break;
                        }
                    }
                }
                out.push_str(&text);
            }
            '!' if chars.peek() == Some(&'[') => {}
            '*' | '_' | '`' | '#' | '~' | '>' => {}
            _ => out.push(ch),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Render a parsed features/specifications payload (array of strings or
/// object of key → string) into a flat human-readable block. Placeholder
/// values are dropped; every value is capped at 20 words.
pub fn render_structured(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let lines: Vec<String> = items
                .iter()
                .filter_map(scalar_text)
                .filter(|item| !is_placeholder(item))
                .map(|item| format!("- {}", truncate_words(&item, MAX_VALUE_WORDS)))
                .collect();
            lines.join("\n")
        }
        Value::Object(entries) => {
            let lines: Vec<String> = entries
                .iter()
                .filter_map(|(key, entry)| scalar_text(entry).map(|text| (key, text)))
                .filter(|(_, text)| !is_placeholder(text))
                .map(|(key, text)| format!("{key}: {}", truncate_words(&text, MAX_VALUE_WORDS)))
                .collect();
            lines.join("\n")
        }
        Value::String(text) if !is_placeholder(text) => truncate_words(text, MAX_VALUE_WORDS),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{is_placeholder, render_structured, strip_to_plain_text, truncate_words};

    #[test]
    fn strips_markdown_and_html() {
        let raw = "# Great *Shoes*\n\nThe <b>best</b> [trail runner](https://example.com) ever.";
        assert_eq!(strip_to_plain_text(raw), "Great Shoes The best trail runner ever.");
    }

    #[test]
    fn stripping_is_idempotent_on_plain_text() {
        let raw = "## **Bold** claim with <em>markup</em> and\n\nextra   space";
        let once = strip_to_plain_text(raw);
        assert_eq!(strip_to_plain_text(&once), once);

        let plain = "Already plain, single-spaced text.";
        assert_eq!(strip_to_plain_text(plain), plain);
    }

    #[test]
    fn renders_feature_arrays_without_placeholders() {
        let value = json!(["Waterproof upper", "n/a", "Unknown", "Vibram outsole"]);
        assert_eq!(render_structured(&value), "- Waterproof upper\n- Vibram outsole");
    }

    #[test]
    fn renders_specification_objects() {
        let value = json!({ "Weight": "310g", "Drop": "8mm", "Warranty": "unspecified" });
        assert_eq!(render_structured(&value), "Weight: 310g\nDrop: 8mm");
    }

    #[test]
    fn long_values_are_capped_at_twenty_words() {
        let long = (0..40).map(|index| format!("w{index}")).collect::<Vec<_>>().join(" ");
        let rendered = render_structured(&json!([long]));
        assert_eq!(rendered.split_whitespace().count(), 21); // "-" plus 20 words
    }

    #[test]
    fn placeholder_detection_is_case_insensitive() {
        assert!(is_placeholder(" N/A "));
        assert!(is_placeholder("UNKNOWN"));
        assert!(!is_placeholder("310g"));
    }

    #[test]
    fn truncate_words_keeps_short_text_unchanged() {
        assert_eq!(truncate_words("two words", 20), "two words");
    }

    #[test]
    fn non_renderable_payloads_become_empty() {
        assert_eq!(render_structured(&json!(null)), "");
        assert_eq!(render_structured(&json!(["n/a", ""])), "");
    }
}
