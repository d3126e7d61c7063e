//! Contact extraction from OSM tags.
//!
//! OSM data is messy: phone numbers arrive with bidi control marks,
//! `tel:` URIs, and multi-value separators; email tags carry `mailto:`
//! and stray punctuation. This module normalizes the common variants
//! into `(contact_type, value)` pairs.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Bidi isolate/direction marks that wrap phone numbers in some exports.
const BIDI_MARKS: &[char] = &[
    '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}', '\u{200e}', '\u{200f}',
];

const INVALID_VALUES: &[&str] = &["-", "n/a", "na", "none", "null", "unknown", "0"];

const PHONE_KEYS: &[&str] = &[
    "phone",
    "contact:phone",
    "mobile",
    "contact:mobile",
    "telephone",
    "contact:telephone",
    "tel",
    "contact:tel",
    "whatsapp",
    "contact:whatsapp",
];

const EMAIL_KEYS: &[&str] = &["email", "contact:email"];

fn phone_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "a;b", "a, b", "a / b", occasionally "a: b" or "a or b".
    RE.get_or_init(|| Regex::new(r"(?i)(?:\s*/\s*)|(?:\s*[,;:\n]\s*)|\s+or\s+").expect("static"))
}

fn email_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,\s;\n]+").expect("static"))
}

fn clean_value(raw: &str) -> Option<String> {
    let text: String = raw.chars().filter(|c| !BIDI_MARKS.contains(c)).collect();
    let text = text.trim();
    if text.is_empty() || INVALID_VALUES.contains(&text.to_lowercase().as_str()) {
        return None;
    }
    Some(text.to_string())
}

fn is_phone_key(key: &str) -> bool {
    if PHONE_KEYS.contains(&key) {
        return true;
    }
    if let Some(rest) = key.strip_prefix("contact:") {
        let first = rest.split(':').next().unwrap_or("");
        return matches!(first, "phone" | "mobile" | "telephone" | "tel" | "whatsapp");
    }
    key.starts_with("phone:") || key.starts_with("mobile:") || key.starts_with("telephone:")
}

fn is_email_key(key: &str) -> bool {
    if EMAIL_KEYS.contains(&key) {
        return true;
    }
    if let Some(rest) = key.strip_prefix("contact:") {
        return rest.split(':').next() == Some("email");
    }
    key.starts_with("email:")
}

/// Extract `(contact_type, value)` pairs from an OSM tags map. Only
/// phone and email are outreach-ready contact types.
pub fn extract_osm_contacts(tags: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    let mut contacts: Vec<(String, String)> = Vec::new();
    let mut push = |pair: (String, String), contacts: &mut Vec<(String, String)>| {
        if !contacts.contains(&pair) {
            contacts.push(pair);
        }
    };

    for (key, value) in tags {
        let Some(value) = value.as_str() else { continue };
        let normalized_key = key.trim().to_lowercase();

        if is_phone_key(&normalized_key) {
            let Some(mut cleaned) = clean_value(value) else { continue };
            if cleaned.to_lowercase().starts_with("tel:") {
                cleaned = cleaned[4..].trim().to_string();
            }
            for part in phone_split_re().split(&cleaned) {
                if let Some(part) = clean_value(part) {
                    push(("phone".to_string(), part), &mut contacts);
                }
            }
        } else if is_email_key(&normalized_key) {
            let Some(mut cleaned) = clean_value(value) else { continue };
            if cleaned.to_lowercase().starts_with("mailto:") {
                cleaned = cleaned[7..].trim().to_string();
            }
            for part in email_split_re().split(&cleaned) {
                let Some(part) = clean_value(part) else { continue };
                let normalized = part.to_lowercase();
                let normalized = normalized.trim_matches(|c| c == ';' || c == ',');
                if normalized.contains('@') {
                    push(("email".to_string(), normalized.to_string()), &mut contacts);
                }
            }
        }
    }

    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(pairs: &[(&str, &str)]) -> serde_json::Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn splits_multi_value_phones() {
        let contacts = extract_osm_contacts(&tags(&[("phone", "+971 4 555 0100; +971 4 555 0101")]));
        assert_eq!(
            contacts,
            vec![
                ("phone".to_string(), "+971 4 555 0100".to_string()),
                ("phone".to_string(), "+971 4 555 0101".to_string()),
            ]
        );
    }

    #[test]
    fn strips_tel_and_mailto_prefixes() {
        let contacts = extract_osm_contacts(&tags(&[
            ("contact:phone", "tel:+14165550100"),
            ("contact:email", "mailto:Info@Acme.CA"),
        ]));
        assert!(contacts.contains(&("phone".to_string(), "+14165550100".to_string())));
        assert!(contacts.contains(&("email".to_string(), "info@acme.ca".to_string())));
    }

    #[test]
    fn drops_placeholder_values_and_bidi_marks() {
        let contacts = extract_osm_contacts(&tags(&[
            ("phone", "n/a"),
            ("mobile", "\u{2066}+971501234567\u{2069}"),
            ("email", "-"),
        ]));
        assert_eq!(
            contacts,
            vec![("phone".to_string(), "+971501234567".to_string())]
        );
    }

    #[test]
    fn ignores_non_contact_tags_and_dedupes() {
        let contacts = extract_osm_contacts(&tags(&[
            ("name", "Acme"),
            ("phone", "+1 416 555 0100"),
            ("contact:phone", "+1 416 555 0100"),
        ]));
        assert_eq!(contacts.len(), 1);
    }

    #[test]
    fn email_without_at_sign_is_dropped() {
        let contacts = extract_osm_contacts(&tags(&[("email", "not-an-email")]));
        assert!(contacts.is_empty());
    }
}
