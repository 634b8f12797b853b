//! Restricted YAML reader for incident logs.
//!
//! Reading happens in two passes over the first document of the stream.
//! A yaml-rust2 event scan refuses any alias before anything is built. Then
//! hand-written serde visitors walk the document instead of loading it into a
//! generic value tree, so only the shapes the log needs are ever built: the
//! top-level mapping, the `incidents` sequence, each entry mapping and the
//! `date` string. Everything else is skipped with [`IgnoredAny`]. Explicitly
//! tagged values on the path to a date are refused outright, so a document
//! cannot ask for any other type to be constructed.

use std::fmt;

use chrono::NaiveDate;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use yaml_rust2::parser::{Event, Parser};

use super::{IncidentLog, IncidentRecord};
use crate::error::IncidentError;

const INCIDENTS_KEY: &str = "incidents";
const DATE_KEY: &str = "date";

/// Parse incident log text.
///
/// Only the first document of a multi-document stream is read. Fails when that
/// document is not YAML at all, when its top level is not a mapping, or when
/// it contains an alias or a tag on the date path. Entries without a usable
/// date are dropped.
pub fn parse_incident_log(text: &str) -> Result<IncidentLog, IncidentError> {
    if is_blank(text) {
        return Ok(IncidentLog::default());
    }

    refuse_aliases(text)?;

    let Some(first) = serde_yaml::Deserializer::from_str(text).next() else {
        return Ok(IncidentLog::default());
    };
    let document = Option::<IncidentDocument>::deserialize(first)?;
    Ok(document.map(|doc| doc.log).unwrap_or_default())
}

/// Scan the first document's events and fail on the first alias.
fn refuse_aliases(text: &str) -> Result<(), IncidentError> {
    let mut parser = Parser::new_from_str(text);
    loop {
        let (event, _) = parser
            .next_token()
            .map_err(|e| IncidentError::MalformedDocument(e.to_string()))?;
        match event {
            Event::Alias(_) => {
                return Err(IncidentError::MalformedDocument(
                    "aliases are not allowed".to_string(),
                ))
            }
            Event::DocumentEnd | Event::StreamEnd => return Ok(()),
            _ => {}
        }
    }
}

/// True for text with no content besides whitespace and comments.
fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim_start();
        line.is_empty() || line.starts_with('#')
    })
}

/// Strict `YYYY-MM-DD`. Shorter fields, times and offsets are not accepted.
fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Mapping keys the reader cares about.
enum Key {
    Incidents,
    Date,
    Other,
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KeyVisitor)
    }
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = Key;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping key")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Key, E> {
        Ok(match value {
            INCIDENTS_KEY => Key::Incidents,
            DATE_KEY => Key::Date,
            _ => Key::Other,
        })
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Key, E> {
        Ok(Key::Other)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Key, E> {
        Ok(Key::Other)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Key, E> {
        Ok(Key::Other)
    }

    fn visit_i128<E: de::Error>(self, _: i128) -> Result<Key, E> {
        Ok(Key::Other)
    }

    fn visit_u128<E: de::Error>(self, _: u128) -> Result<Key, E> {
        Ok(Key::Other)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Key, E> {
        Ok(Key::Other)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Key, E> {
        Ok(Key::Other)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Key, A::Error> {
        IgnoredAny.visit_seq(seq)?;
        Ok(Key::Other)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Key, A::Error> {
        IgnoredAny.visit_map(map)?;
        Ok(Key::Other)
    }
}

/// Top level: must be a mapping. Only `incidents` is read.
struct IncidentDocument {
    log: IncidentLog,
}

impl<'de> Deserialize<'de> for IncidentDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = IncidentDocument;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping with an `incidents` key")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<IncidentDocument, A::Error> {
        let mut log = IncidentLog::default();
        while let Some(key) = map.next_key::<Key>()? {
            match key {
                Key::Incidents => log = map.next_value::<IncidentList>()?.0,
                Key::Date | Key::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(IncidentDocument { log })
    }
}

/// The `incidents` value. Anything other than a sequence reads as empty.
struct IncidentList(IncidentLog);

impl<'de> Deserialize<'de> for IncidentList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ListVisitor)
    }
}

struct ListVisitor;

impl ListVisitor {
    fn empty() -> IncidentList {
        IncidentList(IncidentLog::default())
    }
}

impl<'de> Visitor<'de> for ListVisitor {
    type Value = IncidentList;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sequence of incidents")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<IncidentList, A::Error> {
        let mut records = Vec::new();
        while let Some(IncidentEntry(date)) = seq.next_element()? {
            if let Some(date) = date {
                records.push(IncidentRecord { date });
            }
        }
        Ok(IncidentList(IncidentLog::new(records)))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<IncidentList, A::Error> {
        IgnoredAny.visit_map(map)?;
        Ok(Self::empty())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_i128<E: de::Error>(self, _: i128) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_u128<E: de::Error>(self, _: u128) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_unit<E: de::Error>(self) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }

    fn visit_none<E: de::Error>(self) -> Result<IncidentList, E> {
        Ok(Self::empty())
    }
}

/// One element of `incidents`: its date if it is a mapping with a valid `date`.
struct IncidentEntry(Option<NaiveDate>);

impl<'de> Deserialize<'de> for IncidentEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EntryVisitor)
    }
}

struct EntryVisitor;

impl<'de> Visitor<'de> for EntryVisitor {
    type Value = IncidentEntry;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an incident mapping")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<IncidentEntry, A::Error> {
        let mut date = None;
        while let Some(key) = map.next_key::<Key>()? {
            match key {
                Key::Date => date = map.next_value::<DateValue>()?.0,
                Key::Incidents | Key::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(IncidentEntry(date))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<IncidentEntry, A::Error> {
        IgnoredAny.visit_seq(seq)?;
        Ok(IncidentEntry(None))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_i128<E: de::Error>(self, _: i128) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_u128<E: de::Error>(self, _: u128) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_unit<E: de::Error>(self) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }

    fn visit_none<E: de::Error>(self) -> Result<IncidentEntry, E> {
        Ok(IncidentEntry(None))
    }
}

/// The `date` field. Only strings become dates; other scalars and collections are dropped.
struct DateValue(Option<NaiveDate>);

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DateVisitor)
    }
}

struct DateVisitor;

impl<'de> Visitor<'de> for DateVisitor {
    type Value = DateValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an untagged YYYY-MM-DD date")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<DateValue, E> {
        Ok(DateValue(parse_iso_date(value)))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_i128<E: de::Error>(self, _: i128) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_u128<E: de::Error>(self, _: u128) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_unit<E: de::Error>(self) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_none<E: de::Error>(self) -> Result<DateValue, E> {
        Ok(DateValue(None))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<DateValue, A::Error> {
        IgnoredAny.visit_seq(seq)?;
        Ok(DateValue(None))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<DateValue, A::Error> {
        IgnoredAny.visit_map(map)?;
        Ok(DateValue(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dates(log: &IncidentLog) -> Vec<NaiveDate> {
        log.records().iter().map(|r| r.date).collect()
    }

    #[test]
    fn test_unquoted_and_quoted_dates_normalize_alike() {
        let log = parse_incident_log(
            "incidents:\n  - date: 2024-01-15\n  - date: \"2024-01-15\"\n  - date: '2024-01-15'\n",
        )
        .unwrap();
        assert_eq!(dates(&log), vec![date("2024-01-15"); 3]);
    }

    #[test]
    fn test_other_fields_are_ignored() {
        let text = r#"
title: Ops log
incidents:
  - date: 2024-01-15
    severity: 3
    resolved: true
    summary: "Database failover"
    tags: [db, failover]
    details:
      duration_minutes: 42
      owner: ~
  - date: "2024-02-01"
    note: !custom anything
"#;
        let log = parse_incident_log(text).unwrap();
        assert_eq!(dates(&log), vec![date("2024-01-15"), date("2024-02-01")]);
        assert_eq!(log.latest(), Some(date("2024-02-01")));
    }

    #[test]
    fn test_invalid_date_strings_are_dropped() {
        let text = r#"
incidents:
  - date: "2024-13-01"
  - date: "2024-02-30"
  - date: "yesterday"
  - date: "2024-1-5"
  - date: "2024-01-05T10:00:00"
  - date: " 2024-01-05"
  - date: "2023-06-01"
"#;
        let log = parse_incident_log(text).unwrap();
        assert_eq!(dates(&log), vec![date("2023-06-01")]);
    }

    #[test]
    fn test_wrong_typed_dates_are_dropped() {
        let text = r#"
incidents:
  - date: 20240115
  - date: 2024.5
  - date: true
  - date: ~
  - date: [2024-01-15]
  - date: {year: 2024}
  - severity: high
  - "2024-01-15"
  - [2024-01-15]
  - date: 2022-02-02
"#;
        let log = parse_incident_log(text).unwrap();
        assert_eq!(dates(&log), vec![date("2022-02-02")]);
    }

    #[test]
    fn test_missing_and_empty_incidents_are_equivalent() {
        let missing = parse_incident_log("title: nothing here\n").unwrap();
        let empty = parse_incident_log("incidents: []\n").unwrap();
        let null = parse_incident_log("incidents:\n").unwrap();
        assert!(missing.records().is_empty());
        assert_eq!(missing, empty);
        assert_eq!(missing, null);
    }

    #[test]
    fn test_non_sequence_incidents_read_as_empty() {
        for text in [
            "incidents: not a list\n",
            "incidents: 7\n",
            "incidents:\n  date: 2024-01-15\n",
        ] {
            assert!(parse_incident_log(text).unwrap().records().is_empty(), "{text}");
        }
    }

    #[test]
    fn test_blank_documents_are_empty() {
        assert!(parse_incident_log("").unwrap().records().is_empty());
        assert!(parse_incident_log("   \n\n").unwrap().records().is_empty());
        assert!(parse_incident_log("# nothing yet\n  # still nothing\n").unwrap().records().is_empty());
        assert!(parse_incident_log("~\n").unwrap().records().is_empty());
    }

    #[test]
    fn test_non_mapping_top_level_is_malformed() {
        for text in ["- date: 2024-01-15\n", "just a string\n", "42\n"] {
            let err = parse_incident_log(text).unwrap_err();
            assert!(matches!(err, IncidentError::MalformedDocument(_)), "{text}");
        }
    }

    #[test]
    fn test_invalid_yaml_is_malformed() {
        let err = parse_incident_log("incidents: [\n  - date: 2024-01-15\n").unwrap_err();
        assert!(matches!(err, IncidentError::MalformedDocument(_)));
    }

    #[test]
    fn test_tagged_date_is_refused() {
        let text = "incidents:\n  - date: !ruby/object:Date 2024-01-15\n";
        let err = parse_incident_log(text).unwrap_err();
        assert!(matches!(err, IncidentError::MalformedDocument(_)));
    }

    fn assert_malformed(text: &str) {
        let err = parse_incident_log(text).unwrap_err();
        assert!(matches!(err, IncidentError::MalformedDocument(_)), "{text}");
    }

    #[test]
    fn test_alias_amplification_is_refused() {
        assert_malformed(
            r#"
a: &a ["lol","lol","lol","lol","lol","lol","lol","lol","lol"]
b: &b [*a,*a,*a,*a,*a,*a,*a,*a,*a]
c: &c [*b,*b,*b,*b,*b,*b,*b,*b,*b]
d: &d [*c,*c,*c,*c,*c,*c,*c,*c,*c]
e: &e [*d,*d,*d,*d,*d,*d,*d,*d,*d]
f: &f [*e,*e,*e,*e,*e,*e,*e,*e,*e]
g: &g [*f,*f,*f,*f,*f,*f,*f,*f,*f]
h: &h [*g,*g,*g,*g,*g,*g,*g,*g,*g]
i: &i [*h,*h,*h,*h,*h,*h,*h,*h,*h]
incidents: *i
"#,
        );
    }

    #[test]
    fn test_aliases_are_refused_anywhere() {
        for text in [
            // aliased entry
            "base: &base {date: 2024-03-03}\nincidents:\n  - *base\n  - date: 2024-01-01\n",
            // aliased date scalar
            "d: &d 2024-03-03\nincidents:\n  - date: *d\n",
            // alias in a field that is otherwise ignored
            "incidents:\n  - date: 2024-01-01\n    owner: &o ops\n    backup: *o\n",
        ] {
            assert_malformed(text);
        }
    }

    #[test]
    fn test_anchor_without_alias_is_accepted() {
        let text = "base: &base {owner: ops}\nincidents:\n  - date: 2024-01-15\n";
        assert_eq!(dates(&parse_incident_log(text).unwrap()), vec![date("2024-01-15")]);
    }

    #[test]
    fn test_only_first_document_is_read() {
        let text = "incidents:\n  - date: 2024-01-15\n---\nnotes: second\n";
        assert_eq!(dates(&parse_incident_log(text).unwrap()), vec![date("2024-01-15")]);

        let text = "---\nincidents:\n  - date: 2024-01-15\n...\n---\n- not: a mapping\n";
        assert_eq!(dates(&parse_incident_log(text).unwrap()), vec![date("2024-01-15")]);
    }

    const ODD_SCALARS: [&str; 7] = [
        "99999999999999999999",
        "-99999999999999999999",
        ".nan",
        "-.inf",
        "0x1F",
        "1.5e300",
        "0o17",
    ];

    const ODD_COLLECTIONS: [&str; 3] = ["[[1, [2]], {a: [b]}]", "{a: {b: [c, {d: e}]}}", "[]"];

    #[test]
    fn test_odd_date_values_drop_only_their_entry() {
        for value in ODD_SCALARS.iter().chain(ODD_COLLECTIONS.iter()) {
            let text = format!("incidents:\n  - date: {value}\n  - date: 2024-01-15\n");
            let log = parse_incident_log(&text).unwrap_or_else(|e| panic!("{value}: {e}"));
            assert_eq!(dates(&log), vec![date("2024-01-15")], "{value}");
        }
    }

    #[test]
    fn test_odd_entries_are_dropped() {
        for value in ODD_SCALARS.iter().chain(ODD_COLLECTIONS.iter()) {
            let text = format!("incidents:\n  - {value}\n  - date: 2024-01-15\n");
            let log = parse_incident_log(&text).unwrap_or_else(|e| panic!("{value}: {e}"));
            assert_eq!(dates(&log), vec![date("2024-01-15")], "{value}");
        }
    }

    #[test]
    fn test_odd_incidents_values_read_as_empty() {
        for value in ODD_SCALARS {
            let text = format!("incidents: {value}\n");
            let log = parse_incident_log(&text).unwrap_or_else(|e| panic!("{value}: {e}"));
            assert!(log.records().is_empty(), "{value}");
        }
        let log = parse_incident_log("incidents: {a: {b: [c, {d: e}]}}\n").unwrap();
        assert!(log.records().is_empty());
    }

    #[test]
    fn test_odd_keys_are_ignored() {
        for key in ODD_SCALARS {
            let text = format!("{key}: x\nincidents:\n  - {key}: y\n    date: 2024-01-15\n");
            let log = parse_incident_log(&text).unwrap_or_else(|e| panic!("{key}: {e}"));
            assert_eq!(dates(&log), vec![date("2024-01-15")], "{key}");
        }
    }

    #[test]
    fn test_odd_values_in_ignored_fields_never_fail() {
        let extras = ODD_SCALARS
            .iter()
            .chain(ODD_COLLECTIONS.iter())
            .copied()
            .chain(["!!binary aGVsbG8=", "!custom {a: 1}", "~"]);
        for value in extras {
            let text = format!(
                "title: {value}\nincidents:\n  - date: 2024-01-15\n    extra: {value}\n"
            );
            let log = parse_incident_log(&text).unwrap_or_else(|e| panic!("{value}: {e}"));
            assert_eq!(dates(&log), vec![date("2024-01-15")], "{value}");
        }
    }

    #[test]
    fn test_parse_iso_date_strictness() {
        assert_eq!(parse_iso_date("2024-02-29"), Some(date("2024-02-29")));
        assert_eq!(parse_iso_date("2023-02-29"), None);
        assert_eq!(parse_iso_date("2024/02/01"), None);
        assert_eq!(parse_iso_date("+2024-02-01"), None);
        assert_eq!(parse_iso_date("20240201"), None);
    }
}
