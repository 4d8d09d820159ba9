//! Insertion-ordered QSO record with case-insensitive field access.

use std::fmt;

use hashbrown::HashMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{EOH_MARKER, EOR_MARKER, FieldToken, ParseError, format_field, parse_field};

/// One QSO record (or one file header): an ordered mapping of uppercase
/// field names to text values.
///
/// Duplicate names overwrite the stored value but keep the original
/// position. An empty value is stored, not removed; [`Record::remove`] is
/// the explicit deletion operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    order: Vec<String>,
    values: HashMap<String, String>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one record starting at `offset`: fields up to and including
    /// the `<EOR>` marker. Returns the record and the offset just past the
    /// marker.
    pub fn parse(text: &str, offset: usize) -> Result<(Self, usize), ParseError> {
        Self::parse_until(text, offset, EOR_MARKER)
    }

    /// Parses a header block: fields up to and including the `<EOH>`
    /// marker.
    pub fn parse_header(text: &str, offset: usize) -> Result<(Self, usize), ParseError> {
        Self::parse_until(text, offset, EOH_MARKER)
    }

    fn parse_until(
        text: &str,
        mut offset: usize,
        terminator: &str,
    ) -> Result<(Self, usize), ParseError> {
        let mut record = Self::new();
        loop {
            let rest = &text[offset..];
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                return Err(ParseError::MissingTerminator { offset: text.len() });
            }
            offset += rest.len() - trimmed.len();

            match parse_field(text, offset)? {
                FieldToken::Field {
                    name, value, next, ..
                } => {
                    record.insert_canonical(name, value);
                    offset = next;
                }
                FieldToken::Marker { name, next } => {
                    if name == terminator {
                        return Ok((record, next));
                    }
                    // A stray marker inside this region is structural
                    // corruption, not an alternate terminator.
                    return Err(ParseError::MalformedTag { offset });
                }
            }
        }
    }

    /// Renders the record as fields in insertion order followed by `<EOR>`.
    pub fn to_adif(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            out.push_str(&format_field(name, value));
            out.push(' ');
        }
        out.push_str("<EOR>");
        out
    }

    /// Returns the value of `name` (case-insensitive), if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&canonical(name)).map(String::as_str)
    }

    /// Returns the value of `name`, or `default` when absent.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Sets `name` (canonicalized to uppercase) to `value`, overwriting any
    /// existing value in place. Setting an empty value preserves field
    /// presence.
    pub fn set(&mut self, name: &str, value: &str) {
        self.insert_canonical(canonical(name), value.to_string());
    }

    /// True when the record contains `name` (case-insensitive).
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(&canonical(name))
    }

    /// Removes `name` from the record, returning its value if it was
    /// present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let key = canonical(name);
        let removed = self.values.remove(&key)?;
        if let Some(pos) = self.order.iter().position(|n| *n == key) {
            self.order.remove(pos);
        }
        Some(removed)
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v.as_str())))
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when the record holds no fields.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn insert_canonical(&mut self, name: String, value: String) {
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }
}

fn canonical(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_adif())
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.set(&name, &value);
        }
        record
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Record {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    record.set(&name, &value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_are_case_insensitive() {
        let mut record = Record::new();
        record.set("Call", "W1AW");
        assert_eq!(record.get("CALL"), Some("W1AW"));
        assert_eq!(record.get("call"), Some("W1AW"));
        assert!(record.has("cAlL"));
        assert_eq!(record.get_or("band", "none"), "none");
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut record = Record::new();
        record.set("CALL", "W1AW");
        record.set("BAND", "20m");
        record.set("call", "K1ABC");
        assert_eq!(record.names().collect::<Vec<_>>(), ["CALL", "BAND"]);
        assert_eq!(record.get("CALL"), Some("K1ABC"));
    }

    #[test]
    fn empty_value_keeps_presence() {
        let mut record = Record::new();
        record.set("NOTES", "");
        assert!(record.has("NOTES"));
        assert_eq!(record.get("NOTES"), Some(""));

        assert_eq!(record.remove("NOTES"), Some(String::new()));
        assert!(!record.has("NOTES"));
        assert!(record.is_empty());
    }

    #[test]
    fn parse_stops_at_eor() {
        let text = "<CALL:4>W1AW <BAND:3>20m <EOR> <CALL:5>K1ABC <EOR>";
        let (record, next) = Record::parse(text, 0).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("CALL"), Some("W1AW"));

        let (second, _) = Record::parse(text, next).unwrap();
        assert_eq!(second.get("CALL"), Some("K1ABC"));
    }

    #[test]
    fn missing_eor_reports_end_offset() {
        let text = "<CALL:4>W1AW <BAND:3>20m";
        assert_eq!(
            Record::parse(text, 0),
            Err(ParseError::MissingTerminator { offset: text.len() })
        );
    }

    #[test]
    fn stray_eoh_in_record_region_is_malformed() {
        let text = "<CALL:4>W1AW <EOH> <EOR>";
        assert_eq!(
            Record::parse(text, 0),
            Err(ParseError::MalformedTag { offset: 13 })
        );
    }

    #[test]
    fn header_parse_stops_at_eoh() {
        let text = "<ADIF_VER:5>3.1.4 <PROGRAMID:7>masterlog<EOH>";
        // PROGRAMID declares 7 but the remaining text is longer; the span
        // simply covers "masterl" and parsing continues after it.
        let err = Record::parse_header(text, 0).unwrap_err();
        assert!(matches!(err, ParseError::MalformedTag { .. }));

        let text = "<ADIF_VER:5>3.1.4 <PROGRAMID:9>masterlog <EOH>";
        let (header, _) = Record::parse_header(text, 0).unwrap();
        assert_eq!(header.get("ADIF_VER"), Some("3.1.4"));
        assert_eq!(header.get("PROGRAMID"), Some("masterlog"));
    }

    #[test]
    fn serde_round_trip_preserves_order() {
        let record: Record = [("CALL", "W1AW"), ("BAND", "20m"), ("MODE", "CW")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"CALL":"W1AW","BAND":"20m","MODE":"CW"}"#);
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
