//! Topcoder BasicData XML feeds.
//!
//! Every feed is a root element holding one element per record, whose
//! children are `<field>text</field>` pairs.

use std::collections::{BTreeMap, HashMap};

use crate::errors::{Result, StandingsError};

/// One feed record: field name to text.
pub type Record = BTreeMap<String, String>;

/// Parses a feed into records; empty fields are left out.
pub fn parse_records(xml: &str) -> Result<Vec<Record>> {
    let document = roxmltree::Document::parse(xml)
        .map_err(|e| StandingsError::parse("basic data feed", e.to_string()))?;
    Ok(document
        .root_element()
        .children()
        .filter(roxmltree::Node::is_element)
        .map(|record| {
            record
                .children()
                .filter(roxmltree::Node::is_element)
                .filter_map(|field| {
                    let text = field.text()?.trim();
                    (!text.is_empty()).then(|| (field.tag_name().name().to_string(), text.to_string()))
                })
                .collect()
        })
        .collect())
}

/// Indexes records by their `handle` field; records without one are dropped.
pub fn by_handle(records: Vec<Record>) -> HashMap<String, Record> {
    records
        .into_iter()
        .filter_map(|mut record| record.remove("handle").map(|h| (h, record)))
        .collect()
}
