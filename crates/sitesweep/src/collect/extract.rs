//! Per-candidate extraction with field- and record-level isolation.

use crate::browser::{BrowserResult, BrowserSession};
use crate::error::BrowserError;
use crate::types::{FieldSchema, Record};

use super::Collector;

/// Collects one candidate's fields into a schema-shaped record.
///
/// Every field starts as the placeholder. Reads that fail on a single
/// element are logged and leave the placeholder in place. Only a detached
/// candidate element and fatal browser errors are handed back to the caller.
pub struct FieldReader<'a> {
    schema: &'a FieldSchema,
    /// Selector matching one element per candidate.
    candidates: &'a str,
    index: usize,
    record: Record,
    warnings: Vec<String>,
}

impl<'a> FieldReader<'a> {
    pub fn new(schema: &'a FieldSchema, candidates: &'a str, index: usize) -> Self {
        Self {
            schema,
            candidates,
            index,
            record: schema.blank_record(),
            warnings: Vec::new(),
        }
    }

    /// Zero-based candidate index this reader fills.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Store the outcome of one browser read under `field`.
    pub fn take(&mut self, field: &str, read: BrowserResult<Option<String>>) -> BrowserResult<()> {
        debug_assert!(self.schema.contains(field), "field '{field}' not in schema");
        match read {
            Ok(Some(value)) => {
                let value = value.trim();
                if !value.is_empty() {
                    self.record.set(field, value);
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => self.absorb(&[field], err),
        }
    }

    /// Leave `fields` at the placeholder because of `err`, unless the error
    /// means the whole candidate (or the browser) is gone.
    ///
    /// A detached page-level element, such as a missing detail-pane span,
    /// only costs the fields being read.
    pub fn absorb(&mut self, fields: &[&str], err: BrowserError) -> BrowserResult<()> {
        if err.is_fatal() || self.is_own_detach(&err) {
            return Err(err);
        }
        for field in fields {
            let message = format!("listing {}: field '{field}' unavailable: {err}", self.index + 1);
            tracing::warn!("{message}");
            self.warnings.push(message);
        }
        Ok(())
    }

    fn is_own_detach(&self, err: &BrowserError) -> bool {
        matches!(
            err,
            BrowserError::Detached { selector, index }
                if selector == self.candidates && *index == self.index
        )
    }

    fn finish(self) -> (Record, Vec<String>) {
        (self.record, self.warnings)
    }
}

/// Extract up to `cap` of the `available` candidates.
///
/// A candidate whose extraction fails is skipped with a warning; only
/// fatal browser errors abort the loop.
pub async fn extract_candidates<C: Collector + ?Sized>(
    plugin: &C,
    session: &mut dyn BrowserSession,
    available: usize,
    cap: Option<usize>,
    warnings: &mut Vec<String>,
) -> BrowserResult<Vec<Record>> {
    let schema = plugin.descriptor().schema;
    let candidates = plugin.profile().candidates;
    let total = cap.map_or(available, |cap| available.min(cap));
    tracing::info!("Total listings found: {available}, extracting {total}");

    let mut records = Vec::with_capacity(total);
    for index in 0..total {
        let mut fields = FieldReader::new(&schema, candidates, index);
        match plugin.extract(session, &mut fields).await {
            Ok(()) => {
                let (record, field_warnings) = fields.finish();
                records.push(record);
                warnings.extend(field_warnings);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                let message = format!("failed to extract listing {}: {err}", index + 1);
                tracing::warn!("{message}");
                warnings.push(message);
            }
        }
    }

    Ok(records)
}
