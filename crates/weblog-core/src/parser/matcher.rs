// Line matcher: apply a compiled format to one raw line

use super::format::CompiledFormat;
use crate::error::ParseError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Raw captures for one matched line, keyed by field identifier.
///
/// Values are the exact captured text, minus the surrounding quotes or
/// brackets. Nothing is converted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFieldRecord<'a> {
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> RawFieldRecord<'a> {
    pub fn get(&self, identifier: &str) -> Option<&'a str> {
        self.fields
            .iter()
            .find(|(id, _)| *id == identifier)
            .map(|(_, value)| *value)
    }

    /// `(identifier, value)` pairs in format order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.fields.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_owned_map(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(id, value)| (id.to_string(), value.to_string()))
            .collect()
    }
}

impl Serialize for RawFieldRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (id, value) in &self.fields {
            map.serialize_entry(id, value)?;
        }
        map.end()
    }
}

impl CompiledFormat {
    /// Match one line against the format.
    ///
    /// A trailing line terminator is ignored; anything else that keeps the
    /// whole line from matching (wrong field count, broken quoting, stray
    /// whitespace) is a `ParseError` carrying the line.
    pub fn match_line<'a>(&'a self, line: &'a str) -> Result<RawFieldRecord<'a>, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = self
            .regex()
            .captures(line)
            .ok_or_else(|| ParseError::new(line))?;

        // every group participates in a match, so positions line up with
        // the identifiers
        let fields = self
            .identifiers()
            .enumerate()
            .map(|(i, id)| (id, caps.get(i + 1).map_or("", |m| m.as_str())))
            .collect();

        Ok(RawFieldRecord { fields })
    }
}
