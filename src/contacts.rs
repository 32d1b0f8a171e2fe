//! vCard-backed contact name resolution.
//!
//! The directory is built once at startup and shared read-only for the
//! process lifetime. A missing or unreadable vCard file yields an empty
//! directory, never an error; resolution then falls back to backend-provided
//! names or raw identifiers at the call sites.

use std::collections::HashMap;
use std::path::Path;

/// Canonicalizes a raw phone number into a directory lookup key.
///
/// Keeps a leading `+` when present and strips every other non-digit
/// character. Idempotent. May return an empty string; callers must discard
/// empty results rather than register them.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let (prefix, digits) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut normalized = String::with_capacity(trimmed.len());
    normalized.push_str(prefix);
    normalized.extend(digits.chars().filter(char::is_ascii_digit));
    normalized
}

/// Immutable identifier → display-name mapping.
///
/// Keys are canonical: normalized phone numbers and lower-cased email
/// addresses. No entry is added or removed after construction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContactDirectory {
    names: HashMap<String, String>,
}

impl ContactDirectory {
    /// Builds a directory from an optional vCard file path.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_vcf_text(&text),
            Err(_) => Self::default(),
        }
    }

    /// Parses vCard text: entries are terminated by `END:VCARD` and
    /// contribute only when they carry an `FN` field. Every `TEL`/`EMAIL`
    /// value of an entry maps to that entry's full name; later duplicate
    /// keys overwrite earlier ones.
    #[must_use]
    pub fn from_vcf_text(text: &str) -> Self {
        let mut directory = Self::default();
        let mut entry: Vec<&str> = Vec::new();

        for line in text.lines() {
            if line.trim().eq_ignore_ascii_case("END:VCARD") {
                directory.ingest_entry(&entry);
                entry.clear();
            } else {
                entry.push(line);
            }
        }

        // Trailing lines without an end marker never form a complete entry.
        directory
    }

    fn ingest_entry(&mut self, lines: &[&str]) {
        let Some(name) = lines
            .iter()
            .find_map(|line| field_remainder(line, "FN"))
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            return;
        };
        let name = name.to_string();

        for line in lines {
            if let Some(value) = field_remainder(line, "TEL") {
                let normalized = normalize_phone(unqualified_value(value));
                if !normalized.is_empty() {
                    self.names.insert(normalized, name.clone());
                }
            } else if let Some(value) = field_remainder(line, "EMAIL") {
                let address = unqualified_value(value).trim();
                if !address.is_empty() {
                    self.names.insert(address.to_lowercase(), name.clone());
                }
            }
        }
    }

    /// Resolves a raw identifier to a display name.
    ///
    /// Tries an exact case-insensitive match first (emails), then the
    /// normalized-phone form. Returns `None` when neither is registered.
    #[must_use]
    pub fn resolve(&self, identifier: &str) -> Option<&str> {
        if self.names.is_empty() || identifier.is_empty() {
            return None;
        }

        if let Some(name) = self.names.get(&identifier.to_lowercase()) {
            return Some(name);
        }

        self.names
            .get(&normalize_phone(identifier))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Returns the text after `NAME:` or `NAME;` when `line` starts with the
/// field name (case-insensitive), mirroring vCard's parameter syntax.
fn field_remainder<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let line = line.trim_start();
    let prefix = line.get(..name.len())?;
    if !prefix.eq_ignore_ascii_case(name) {
        return None;
    }

    let mut chars = line[name.len()..].chars();
    match chars.next() {
        Some(':') | Some(';') => Some(chars.as_str()),
        _ => None,
    }
}

/// Strips any parameter qualification, keeping only the substring after the
/// last colon (e.g. `type=CELL:+1 555 123` → `+1 555 123`).
fn unqualified_value(value: &str) -> &str {
    match value.rfind(':') {
        Some(index) => &value[index + 1..],
        None => value,
    }
    .trim()
}

#[cfg(test)]
mod tests {
    use super::{normalize_phone, ContactDirectory};

    const ALICE_VCF: &str = "BEGIN:VCARD\n\
        VERSION:3.0\n\
        FN: Alice\n\
        TEL: +1 (555) 123-4567\n\
        TEL;type=CELL: 555.987.6543\n\
        EMAIL;type=HOME: Alice@Example.COM\n\
        END:VCARD\n";

    #[test]
    fn normalize_keeps_plus_and_strips_punctuation() {
        assert_eq!(normalize_phone("+1 (555) 123-4567"), "+15551234567");
        assert_eq!(normalize_phone("555.987.6543"), "5559876543");
        assert_eq!(normalize_phone("  +44 20 7946 0958  "), "+442079460958");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["+1 (555) 123-4567", "555.987.6543", "ext. 42", "", "+", "abc"] {
            let once = normalize_phone(raw);
            assert_eq!(normalize_phone(&once), once, "raw input: {raw:?}");
        }
    }

    #[test]
    fn normalize_may_return_empty_string() {
        assert_eq!(normalize_phone("ext"), "");
        assert_eq!(normalize_phone("+"), "+");
    }

    #[test]
    fn alice_entry_resolves_both_numbers_and_email() {
        let directory = ContactDirectory::from_vcf_text(ALICE_VCF);

        assert_eq!(directory.resolve("+15551234567"), Some("Alice"));
        assert_eq!(directory.resolve("5559876543"), Some("Alice"));
        assert_eq!(directory.resolve("alice@example.com"), Some("Alice"));
    }

    #[test]
    fn email_resolution_is_case_insensitive() {
        let directory = ContactDirectory::from_vcf_text(ALICE_VCF);

        assert_eq!(directory.resolve("ALICE@EXAMPLE.COM"), Some("Alice"));
        assert_eq!(directory.resolve("Alice@Example.com"), Some("Alice"));
    }

    #[test]
    fn unnormalized_phone_input_still_resolves() {
        let directory = ContactDirectory::from_vcf_text(ALICE_VCF);
        assert_eq!(directory.resolve("(555) 987-6543"), Some("Alice"));
    }

    #[test]
    fn entry_without_full_name_contributes_nothing() {
        let vcf = "BEGIN:VCARD\nTEL:+15550001111\nEMAIL:ghost@example.com\nEND:VCARD\n";
        let directory = ContactDirectory::from_vcf_text(vcf);

        assert!(directory.is_empty());
        assert_eq!(directory.resolve("+15550001111"), None);
    }

    #[test]
    fn later_entries_overwrite_earlier_duplicate_keys() {
        let vcf = "FN:Old Name\nTEL:+15550001111\nEND:VCARD\n\
                   FN:New Name\nTEL:+1 555 000 1111\nEND:VCARD\n";
        let directory = ContactDirectory::from_vcf_text(vcf);

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.resolve("+15550001111"), Some("New Name"));
    }

    #[test]
    fn tel_value_that_normalizes_to_empty_is_discarded() {
        let vcf = "FN:Nobody\nTEL;type=FAX:ext\nEND:VCARD\n";
        let directory = ContactDirectory::from_vcf_text(vcf);

        assert!(directory.is_empty());
    }

    #[test]
    fn load_reads_vcard_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("contacts.vcf");
        std::fs::write(&path, ALICE_VCF).expect("fixture written");

        let directory = ContactDirectory::load(Some(&path));
        assert_eq!(directory.resolve("+15551234567"), Some("Alice"));
        assert_eq!(directory.resolve("alice@example.com"), Some("Alice"));
    }

    #[test]
    fn missing_or_unreadable_file_yields_empty_directory() {
        let directory = ContactDirectory::load(Some(std::path::Path::new(
            "/nonexistent/contacts.vcf",
        )));
        assert!(directory.is_empty());

        assert!(ContactDirectory::load(None).is_empty());
    }

    #[test]
    fn resolve_on_empty_directory_or_identifier_is_none() {
        let directory = ContactDirectory::default();
        assert_eq!(directory.resolve("+15551234567"), None);

        let directory = ContactDirectory::from_vcf_text(ALICE_VCF);
        assert_eq!(directory.resolve(""), None);
    }

    #[test]
    fn trailing_entry_without_end_marker_is_ignored() {
        let vcf = "FN:Alice\nTEL:+15551234567\n";
        let directory = ContactDirectory::from_vcf_text(vcf);

        assert!(directory.is_empty());
    }
}
