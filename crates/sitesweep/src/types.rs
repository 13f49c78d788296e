//! Core data types: field schemas, records, requests and results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::collect::StopReason;

/// The fixed, ordered field set a plugin emits, plus its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub fields: &'static [&'static str],
    /// Value written when a field cannot be extracted.
    pub placeholder: &'static str,
}

impl FieldSchema {
    pub const fn new(fields: &'static [&'static str], placeholder: &'static str) -> Self {
        Self {
            fields,
            placeholder,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains(&name)
    }

    /// A record holding the placeholder in every field.
    pub fn blank_record(&self) -> Record {
        Record::from_pairs(self.fields.iter().map(|f| (*f, self.placeholder)))
    }
}

/// One extracted listing: an ordered sequence of `(field, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::default();
        for (k, v) in pairs {
            record.set(k, v);
        }
        record
    }

    /// Set a field, replacing any existing value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when the record has exactly the schema's fields in schema order.
    pub fn conforms_to(&self, schema: &FieldSchema) -> bool {
        self.fields.len() == schema.len()
            && self
                .fields
                .iter()
                .zip(schema.fields)
                .all(|((k, _), f)| k == f)
    }

    /// Values laid out in schema order; absent fields become the placeholder.
    pub fn row(&self, schema: &FieldSchema) -> Vec<String> {
        schema
            .fields
            .iter()
            .map(|f| self.get(f).unwrap_or(schema.placeholder).to_string())
            .collect()
    }
}

/// One dispatched collection run. Immutable once handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub site: String,
    pub query: String,
    /// Client-side cap on emitted records. Zero or negative collects nothing.
    pub limit: Option<i64>,
    pub output_path: PathBuf,
}

impl CollectionRequest {
    pub fn new(
        site: impl Into<String>,
        query: impl Into<String>,
        output_path: impl Into<PathBuf>,
        limit: Option<i64>,
    ) -> Self {
        Self {
            site: site.into(),
            query: query.into(),
            limit,
            output_path: output_path.into(),
        }
    }

    /// The limit as a record cap; non-positive limits clamp to zero.
    pub fn cap(&self) -> Option<usize> {
        self.limit.map(|l| usize::try_from(l).unwrap_or(0))
    }
}

/// What a plugin reports back after one `collect` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectOutcome {
    pub record_count: usize,
    pub warnings: Vec<String>,
    /// Why the loading loop stopped; `None` when it never ran.
    pub stop: Option<StopReason>,
}

/// The authoritative result of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionResult {
    pub site: String,
    pub record_count: usize,
    pub output_path: PathBuf,
    pub warnings: Vec<String>,
    pub stop: Option<StopReason>,
    pub elapsed_ms: u64,
}
