//! Minimal field and array extraction over raw JSON text.
//!
//! # Design
//! The backend's response bodies are flat or lightly nested objects with a
//! handful of known scalar fields, so these helpers scan the raw text instead
//! of building a parsed tree. Every function is pure and total: malformed
//! input and absent fields yield `None` / `0` / an empty vec, never a panic.
//!
//! Matching is positional — the *first* occurrence of `"field"` followed by a
//! colon and a value of the right shape wins, wherever it sits in the
//! document. Callers that need to distinguish "value is 0" from "field is
//! absent" must do so themselves (see `InventoryRecord`'s quantity aliasing).

/// Remainder slices following each occurrence of the quoted field name.
fn field_sites<'a>(json: &'a str, field: &str) -> Vec<&'a str> {
    let needle = format!("\"{field}\"");
    json.match_indices(&needle)
        .map(|(idx, m)| &json[idx + m.len()..])
        .collect()
}

/// Strip `\s*:\s*` from the front of a field site, yielding the value text.
fn after_colon(site: &str) -> Option<&str> {
    let rest = site.trim_start().strip_prefix(':')?;
    Some(rest.trim_start())
}

/// Leading `-?digits` span, optionally extended by `.digits`.
fn number_span(text: &str, allow_fraction: bool) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));
    let digits_start = end;
    while bytes.get(end).is_some_and(|b| b.is_ascii_digit()) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    if allow_fraction && bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(|b| b.is_ascii_digit()) {
            frac_end += 1;
        }
        if frac_end > frac_start {
            end = frac_end;
        }
    }
    Some(&text[..end])
}

/// First `"field": "value"` occurrence in `json`.
///
/// The value runs to the next `"` regardless of escaping, so a value with an
/// embedded escaped quote comes back truncated at the backslash. Returns
/// `None` when no occurrence is followed by a string-shaped value.
pub fn extract_string<'a>(json: &'a str, field: &str) -> Option<&'a str> {
    for site in field_sites(json, field) {
        let Some(value) = after_colon(site) else { continue };
        let Some(value) = value.strip_prefix('"') else { continue };
        if let Some(end) = value.find('"') {
            return Some(&value[..end]);
        }
    }
    None
}

/// First `"field": <integer>` occurrence, or 0 when absent.
///
/// 0 is ambiguous between "stored zero" and "no such field"; callers that
/// care apply an alias lookup on 0.
pub fn extract_int(json: &str, field: &str) -> i64 {
    for site in field_sites(json, field) {
        let Some(value) = after_colon(site) else { continue };
        if let Some(span) = number_span(value, false) {
            return span.parse().unwrap_or(0);
        }
    }
    0
}

/// First `"field": <number>` occurrence (integer or plain decimal, no
/// exponent), or 0.0 when absent.
pub fn extract_double(json: &str, field: &str) -> f64 {
    for site in field_sites(json, field) {
        let Some(value) = after_colon(site) else { continue };
        if let Some(span) = number_span(value, true) {
            return span.parse().unwrap_or(0.0);
        }
    }
    0.0
}

/// User id from an auth response.
///
/// Auth responses nest the user record: `"user": { ... "id": "<value>" ... }`.
/// The nested `id` must appear before the first `}` that follows the opening
/// brace and must be non-empty. Falls back to a flat `"user_id"` field for
/// table rows.
pub fn extract_user_id(json: &str) -> Option<&str> {
    for site in field_sites(json, "user") {
        let Some(rest) = after_colon(site) else { continue };
        let Some(body) = rest.strip_prefix('{') else { continue };
        let window_end = body.find('}').unwrap_or(body.len());
        for (id_idx, m) in body.match_indices("\"id\"") {
            if id_idx >= window_end {
                break;
            }
            let Some(value) = after_colon(&body[id_idx + m.len()..]) else { continue };
            let Some(value) = value.strip_prefix('"') else { continue };
            match value.find('"') {
                Some(end) if end > 0 => return Some(&value[..end]),
                _ => {}
            }
        }
    }
    extract_string(json, "user_id")
}

/// Split a JSON array of objects into its top-level `{...}` substrings.
///
/// Tracks brace depth, ignoring braces inside double-quoted strings. A quote
/// toggles string state unless the immediately preceding character is a
/// backslash. Nested objects stay embedded in their parent's span. Blank
/// input and the literal `[]` yield an empty vec; unbalanced input yields
/// whatever complete top-level spans were seen.
pub fn split_top_level_objects(json: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    if json.trim().is_empty() || json == "[]" {
        return objects;
    }

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut object_start: Option<usize> = None;
    let mut prev = '\0';

    for (i, ch) in json.char_indices() {
        if ch == '"' && prev != '\\' {
            in_string = !in_string;
        }
        if !in_string {
            if ch == '{' {
                if depth == 0 {
                    object_start = Some(i);
                }
                depth += 1;
            } else if ch == '}' {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = object_start.take() {
                        objects.push(&json[start..i + 1]);
                    }
                }
            }
        }
        prev = ch;
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- extract_string ---

    #[test]
    fn extract_string_present() {
        let json = r#"{"access_token":"abc123","refresh_token":"r1"}"#;
        assert_eq!(extract_string(json, "access_token"), Some("abc123"));
        assert_eq!(extract_string(json, "refresh_token"), Some("r1"));
    }

    #[test]
    fn extract_string_absent() {
        assert_eq!(extract_string(r#"{"a":"b"}"#, "missing"), None);
    }

    #[test]
    fn extract_string_allows_whitespace_around_colon() {
        assert_eq!(extract_string("{\"name\" :\n \"tea\"}", "name"), Some("tea"));
    }

    #[test]
    fn extract_string_takes_first_occurrence() {
        let json = r#"{"email":"first@x.com","user":{"email":"second@x.com"}}"#;
        assert_eq!(extract_string(json, "email"), Some("first@x.com"));
    }

    #[test]
    fn extract_string_skips_non_string_values() {
        // The first "count" is numeric; the scan moves on to the next site.
        let json = r#"{"count":3,"nested":{"count":"three"}}"#;
        assert_eq!(extract_string(json, "count"), Some("three"));
    }

    #[test]
    fn extract_string_empty_value() {
        assert_eq!(extract_string(r#"{"email":""}"#, "email"), Some(""));
    }

    #[test]
    fn extract_string_stops_at_escaped_quote() {
        // Escape-blind by contract: the value is cut at the first quote.
        let json = r#"{"note":"say \"hi\""}"#;
        assert_eq!(extract_string(json, "note"), Some("say \\"));
    }

    // --- extract_int / extract_double ---

    #[test]
    fn extract_int_present_and_absent() {
        assert_eq!(extract_int(r#"{"quantity":42}"#, "quantity"), 42);
        assert_eq!(extract_int(r#"{"quantity":-7}"#, "quantity"), -7);
        assert_eq!(extract_int(r#"{"qty":5}"#, "quantity"), 0);
    }

    #[test]
    fn extract_int_ignores_string_values() {
        assert_eq!(extract_int(r#"{"quantity":"12"}"#, "quantity"), 0);
    }

    #[test]
    fn extract_int_stops_before_fraction() {
        assert_eq!(extract_int(r#"{"quantity":3.9}"#, "quantity"), 3);
    }

    #[test]
    fn extract_double_variants() {
        assert_eq!(extract_double(r#"{"price":19.99}"#, "price"), 19.99);
        assert_eq!(extract_double(r#"{"price":-0.5}"#, "price"), -0.5);
        assert_eq!(extract_double(r#"{"price":7}"#, "price"), 7.0);
        assert_eq!(extract_double(r#"{"other":1.0}"#, "price"), 0.0);
    }

    #[test]
    fn extract_double_ignores_exponent_suffix() {
        // Scientific notation is out of contract; the span stops at 'e'.
        assert_eq!(extract_double(r#"{"price":1e5}"#, "price"), 1.0);
    }

    #[test]
    fn extract_double_bare_minus_is_absent() {
        assert_eq!(extract_double(r#"{"price":-}"#, "price"), 0.0);
    }

    // --- extract_user_id ---

    #[test]
    fn user_id_from_nested_user_object() {
        let json = r#"{"access_token":"a","user":{"id":"u-1","email":"x@y.z"}}"#;
        assert_eq!(extract_user_id(json), Some("u-1"));
    }

    #[test]
    fn user_id_nested_wins_over_flat() {
        let json = r#"{"user_id":"flat","user":{"id":"nested"}}"#;
        assert_eq!(extract_user_id(json), Some("nested"));
    }

    #[test]
    fn user_id_falls_back_to_flat_field() {
        assert_eq!(extract_user_id(r#"{"user_id":"u-2"}"#), Some("u-2"));
    }

    #[test]
    fn user_id_nested_must_precede_closing_brace() {
        // "id" appears only after the user object's first '}', so the nested
        // lookup fails and the flat fallback applies.
        let json = r#"{"user":{"role":"admin"},"id":"outer","user_id":"u-3"}"#;
        assert_eq!(extract_user_id(json), Some("u-3"));
    }

    #[test]
    fn user_id_empty_nested_id_is_rejected() {
        assert_eq!(extract_user_id(r#"{"user":{"id":""}}"#), None);
    }

    #[test]
    fn user_id_absent() {
        assert_eq!(extract_user_id(r#"{"access_token":"a"}"#), None);
    }

    // --- split_top_level_objects ---

    #[test]
    fn split_empty_inputs() {
        assert!(split_top_level_objects("").is_empty());
        assert!(split_top_level_objects("   \n").is_empty());
        assert!(split_top_level_objects("[]").is_empty());
    }

    #[test]
    fn split_preserves_order_and_reparseability() {
        let json = r#"[{"item_name":"a","quantity":1},{"item_name":"b","quantity":2}]"#;
        let objects = split_top_level_objects(json);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0], r#"{"item_name":"a","quantity":1}"#);
        assert_eq!(objects[1], r#"{"item_name":"b","quantity":2}"#);
        assert_eq!(extract_string(objects[1], "item_name"), Some("b"));
    }

    #[test]
    fn split_keeps_nested_objects_inline() {
        let json = r#"[{"a":{"b":1}},{"c":2}]"#;
        let objects = split_top_level_objects(json);
        assert_eq!(objects, vec![r#"{"a":{"b":1}}"#, r#"{"c":2}"#]);
    }

    #[test]
    fn split_ignores_braces_inside_strings() {
        let json = r#"[{"note":"{not a} brace"},{"note":"ok"}]"#;
        let objects = split_top_level_objects(json);
        assert_eq!(objects.len(), 2);
        assert_eq!(extract_string(objects[0], "note"), Some("{not a} brace"));
    }

    #[test]
    fn split_single_object_without_array() {
        let objects = split_top_level_objects(r#"{"only":"one"}"#);
        assert_eq!(objects, vec![r#"{"only":"one"}"#]);
    }

    #[test]
    fn split_tolerates_unbalanced_input() {
        assert!(split_top_level_objects(r#"[{"a":1"#).is_empty());
        // A stray closing brace before any opening one yields nothing.
        assert!(split_top_level_objects("}{").is_empty());
    }
}
