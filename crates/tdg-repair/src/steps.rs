//! Individual repair transformations
//!
//! Every function here maps text to text and returns its input unchanged
//! when given valid JSON.

use crate::scanner::{lex, next_significant, render, Container, Expect, Token, Tracker};
use serde_json::Value;

/// Extract the body of a markdown code fence, if any
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.to_string();
    };
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n').map_or(after_open.len(), |n| n + 1);
    let body = &after_open[body_start..];
    let body = body.find("```").map_or(body, |close| &body[..close]);
    body.trim().to_string()
}

/// Quote bare keys and values, convert single-quoted strings, map
/// Python/JavaScript literals onto JSON ones
#[must_use]
pub fn normalize_literals(text: &str) -> String {
    let mut tokens = lex(text);
    for i in 0..tokens.len() {
        let is_key = next_significant(&tokens, i + 1).is_some_and(|n| tokens[n] == Token::Colon);
        let replacement = match &tokens[i] {
            Token::Str {
                body,
                quote: '\'',
                terminated,
            } => Some(Token::Str {
                body: requote(body),
                quote: '"',
                terminated: *terminated,
            }),
            Token::Word(word) if is_key => Some(quoted(word)),
            Token::Word(word) => normalize_word(word),
            _ => None,
        };
        if let Some(token) = replacement {
            tokens[i] = token;
        }
    }
    render(&tokens)
}

fn normalize_word(word: &str) -> Option<Token> {
    match word {
        "true" | "false" | "null" => None,
        "True" | "TRUE" => Some(Token::Word("true".into())),
        "False" | "FALSE" => Some(Token::Word("false".into())),
        "None" | "NULL" | "undefined" | "NaN" | "Infinity" | "-Infinity" => {
            Some(Token::Word("null".into()))
        }
        w if serde_json::from_str::<serde_json::Number>(w).is_ok() => None,
        w => Some(quoted(w)),
    }
}

fn quoted(word: &str) -> Token {
    Token::Str {
        body: word.replace('\\', "\\\\").replace('"', "\\\""),
        quote: '"',
        terminated: true,
    }
}

/// Re-escape a single-quoted body for double quotes
fn requote(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}

/// Insert a comma between two adjacent values inside a container
#[must_use]
pub fn insert_missing_commas(text: &str) -> String {
    let tokens = lex(text);
    let mut out = Vec::with_capacity(tokens.len());
    let mut tracker = Tracker::default();

    for token in tokens {
        let needs_comma = token.starts_value()
            && tracker.top().is_some_and(|frame| frame.expect == Expect::Next);
        if needs_comma {
            // keep whitespace after the inserted comma
            let trailing_space = if matches!(out.last(), Some(Token::Space(_))) {
                out.pop()
            } else {
                None
            };
            out.push(Token::Comma);
            tracker.observe(&Token::Comma);
            out.extend(trailing_space);
        }
        tracker.observe(&token);
        out.push(token);
    }
    render(&out)
}

/// Close string literals cut off at end of input and escape raw control
/// characters inside strings
#[must_use]
pub fn close_unterminated_strings(text: &str) -> String {
    let mut tokens = lex(text);
    for token in &mut tokens {
        if let Token::Str {
            body, terminated, ..
        } = token
        {
            if !*terminated {
                if ends_with_lone_backslash(body) {
                    body.pop();
                }
                *terminated = true;
            }
            if body.chars().any(is_json_control) {
                *body = escape_controls(body);
            }
        }
    }
    render(&tokens)
}

fn ends_with_lone_backslash(body: &str) -> bool {
    body.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Characters JSON forbids unescaped inside strings
fn is_json_control(c: char) -> bool {
    u32::from(c) < 0x20
}

fn escape_controls(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 8);
    for c in body.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if is_json_control(c) => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

/// Drop trailing commas, fix mismatched or stray closers, fill a dangling
/// key or colon with `null` and append the closers still missing
#[must_use]
pub fn complete_structures(text: &str) -> String {
    let tokens = lex(text);
    let mut out = Vec::with_capacity(tokens.len() + 4);
    let mut tracker = Tracker::default();

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Comma => {
                let next = next_significant(&tokens, i + 1).map(|n| &tokens[n]);
                if matches!(next, None | Some(Token::Close(_) | Token::Text(_))) {
                    continue;
                }
            }
            Token::Close(kind) => {
                if !tracker.is_open(*kind) {
                    continue;
                }
                unwind_to(*kind, &mut out, &mut tracker);
            }
            // The lexer saw the root close early; closers that follow still
            // belong to the open containers.
            Token::Text(text) if tracker.top().is_some() => {
                let rest = absorb_closers(text, &mut out, &mut tracker);
                if !rest.is_empty() {
                    out.push(Token::Text(rest.to_string()));
                }
                continue;
            }
            _ => {}
        }
        tracker.observe(token);
        out.push(token.clone());
    }

    while tracker.top().is_some() {
        close_frame(&mut out, &mut tracker);
    }
    render(&out)
}

/// Close inner frames until `kind` is on top, ready for its closer
fn unwind_to(kind: Container, out: &mut Vec<Token>, tracker: &mut Tracker) {
    while let Some(frame) = tracker.top() {
        if frame.kind == kind {
            break;
        }
        close_frame(out, tracker);
    }
    fill_dangling(out, tracker);
}

/// Apply the leading `}`/`]` of `text` to the open containers, dropping the
/// ones with nothing to close; returns what is left of `text`
fn absorb_closers<'a>(text: &'a str, out: &mut Vec<Token>, tracker: &mut Tracker) -> &'a str {
    let mut rest = text;
    while tracker.top().is_some() {
        let space = rest.len() - rest.trim_start().len();
        if space > 0 {
            out.push(Token::Space(rest[..space].to_string()));
            rest = &rest[space..];
        }
        let kind = match rest.chars().next() {
            Some('}') => Container::Object,
            Some(']') => Container::Array,
            _ => break,
        };
        rest = &rest[1..];
        if tracker.is_open(kind) {
            unwind_to(kind, out, tracker);
            let close = Token::Close(kind);
            tracker.observe(&close);
            out.push(close);
        }
    }
    rest
}

fn fill_dangling(out: &mut Vec<Token>, tracker: &mut Tracker) {
    let Some(frame) = tracker.top() else {
        return;
    };
    let fill = match (frame.kind, frame.expect) {
        (Container::Object, Expect::Colon) => vec![Token::Colon, Token::Word("null".into())],
        (Container::Object, Expect::Value) => vec![Token::Word("null".into())],
        _ => return,
    };
    for token in fill {
        tracker.observe(&token);
        out.push(token);
    }
}

fn close_frame(out: &mut Vec<Token>, tracker: &mut Tracker) {
    let Some(frame) = tracker.top() else {
        return;
    };
    fill_dangling(out, tracker);
    let close = Token::Close(frame.kind);
    tracker.observe(&close);
    out.push(close);
}

/// Candidate spans of balanced containers, outermost first, in text order.
///
/// Each span starts at a top-level `{` or `[` and ends where depth returns
/// to zero; string contents and backslash escapes are honored.
#[must_use]
pub fn balanced_spans(text: &str) -> Vec<&str> {
    scan_spans(text, false)
}

/// Like [`balanced_spans`] but stops at the first unmatched `]`, i.e. the
/// end of the enclosing array
fn element_spans(text: &str) -> Vec<&str> {
    scan_spans(text, true)
}

fn scan_spans(text: &str, stop_at_array_end: bool) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if depth == 0 {
            if stop_at_array_end && c == ']' {
                break;
            }
            if matches!(c, '{' | '[') {
                start = idx;
                depth = 1;
                in_string = false;
                escaped = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..idx + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    spans
}

/// First balanced span that parses as JSON
#[must_use]
pub fn longest_balanced_prefix(text: &str) -> Option<Value> {
    balanced_spans(text)
        .into_iter()
        .find_map(|span| serde_json::from_str(span).ok())
}

/// Rebuild `{"<key>": [...]}` from the complete array elements after `key`
#[must_use]
pub fn extract_keyed_array(text: &str, key: &str) -> Option<Value> {
    let needle = format!("\"{key}\"");
    let key_at = text.find(&needle)?;
    let rest = &text[key_at + needle.len()..];
    let array_at = rest.find('[')?;
    let elements = &rest[array_at + 1..];

    let items: Vec<Value> = element_spans(elements)
        .into_iter()
        .filter_map(|span| serde_json::from_str(span).ok())
        .collect();

    let mut wrapper = serde_json::Map::new();
    wrapper.insert(key.to_string(), Value::Array(items));
    Some(Value::Object(wrapper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parses(text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|e| panic!("{text:?}: {e}"))
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]"), "[1]");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn test_normalize_python_style() {
        let fixed = normalize_literals("{'name': 'Rex', ok: True, missing: None, n: 1.5e3}");
        assert_eq!(
            parses(&fixed),
            json!({"name": "Rex", "ok": true, "missing": null, "n": 1500.0})
        );
    }

    #[test]
    fn test_normalize_bare_values_and_quotes() {
        let fixed = normalize_literals(r#"{status: pending, quote: 'say "hi"', it: 'it\'s'}"#);
        assert_eq!(
            parses(&fixed),
            json!({"status": "pending", "quote": "say \"hi\"", "it": "it's"})
        );
    }

    #[test]
    fn test_insert_missing_commas() {
        let fixed = insert_missing_commas("{\"a\": 1 \"b\": [1 2 {\"c\": 3} \"d\"]}");
        assert_eq!(parses(&fixed), json!({"a": 1, "b": [1, 2, {"c": 3}, "d"]}));

        let fixed = insert_missing_commas("[{\"a\":1}\n{\"b\":2}]");
        assert_eq!(parses(&fixed), json!([{"a": 1}, {"b": 2}]));
    }

    #[test]
    fn test_close_unterminated_string() {
        let fixed = close_unterminated_strings("[\"abc");
        assert_eq!(fixed, "[\"abc\"");
        let fixed = close_unterminated_strings("[\"ab\\");
        assert_eq!(fixed, "[\"ab\"");
        let fixed = close_unterminated_strings("[\"line1\nline2\"]");
        assert_eq!(parses(&fixed), json!(["line1\nline2"]));
    }

    #[test]
    fn test_complete_structures() {
        assert_eq!(parses(&complete_structures("{\"a\": [1, 2")), json!({"a": [1, 2]}));
        assert_eq!(parses(&complete_structures("[1, 2,]")), json!([1, 2]));
        assert_eq!(parses(&complete_structures("{\"a\": [1}")), json!({"a": [1]}));
        assert_eq!(parses(&complete_structures("{\"a\":")), json!({"a": null}));
        assert_eq!(parses(&complete_structures("{\"a\": 1, \"b\"")), json!({"a": 1, "b": null}));
        assert_eq!(parses(&complete_structures("{\"a\": [1]]}")), json!({"a": [1]}));
    }

    #[test]
    fn test_closers_after_early_root_close() {
        assert_eq!(complete_structures("{\"a\": [1]]}"), "{\"a\": [1]}");
        assert_eq!(
            parses(&complete_structures("{\"a\": {\"b\": [1]]} }")),
            json!({"a": {"b": [1]}})
        );
        assert_eq!(complete_structures("{\"a\": [1]]} done"), "{\"a\": [1]} done");
        assert_eq!(complete_structures("note {\"a\": 1}"), "note {\"a\": 1}");
    }

    #[test]
    fn test_balanced_prefix_ignores_braces_in_strings() {
        let text = "prefix {\"a\": \"}{\"} trailing {\"b\": 2}";
        assert_eq!(longest_balanced_prefix(text), Some(json!({"a": "}{"})));
    }

    #[test]
    fn test_balanced_prefix_skips_unparsable_spans() {
        let text = "[see docs] then {\"ok\": true}";
        assert_eq!(longest_balanced_prefix(text), Some(json!({"ok": true})));
    }

    #[test]
    fn test_extract_keyed_array() {
        let text = "{\"meta\": 1, \"cases\": [{\"name\": \"a\"}, {\"name\": \"b\"}, {\"name\": \"trunc";
        assert_eq!(
            extract_keyed_array(text, "cases"),
            Some(json!({"cases": [{"name": "a"}, {"name": "b"}]}))
        );
        assert_eq!(extract_keyed_array("{\"other\": []}", "cases"), None);

        let text = "{\"cases\": [{\"n\": 1}], \"extra\": {\"n\": 2}";
        assert_eq!(
            extract_keyed_array(text, "cases"),
            Some(json!({"cases": [{"n": 1}]}))
        );
    }

    #[test]
    fn test_steps_are_identity_on_valid_json() {
        let valid = r#"{"a": [1, -2.5e-3, true, null, "x\"y"], "b": {"c": "it's", "d": []}}"#;
        assert_eq!(normalize_literals(valid), valid);
        assert_eq!(insert_missing_commas(valid), valid);
        assert_eq!(close_unterminated_strings(valid), valid);
        assert_eq!(complete_structures(valid), valid);
    }
}
