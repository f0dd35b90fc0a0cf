//! Parsing of "weight processed" audit-trail descriptions.
//!
//! When the host application processes an incoming online form that
//! carries a weight, it writes an audit row against the
//! `onlineformincoming` table whose free-text description holds the animal
//! name and the submitted weight at fixed positions. This module is the
//! only place that knows that layout.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::types::Timestamp;

/// `audittrail.tablename` of rows written by online form processing.
pub const ONLINE_FORM_TABLE: &str = "onlineformincoming";

/// Substring marking a weight form.
pub const WEIGHT_MARKER: &str = "Weight";

/// Substring marking a form that has finished processing.
pub const PROCESSED_MARKER: &str = "=Processed=";

/// A weight value must consist of digits and dots only.
static WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9.]+$").expect("valid regex"));

/// Checkpoint used when nothing has been processed yet.
pub fn initial_checkpoint() -> Timestamp {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Layout versions of the description text.
///
/// Version 1: the description is split on single spaces; field 3 is the
/// animal name and field 5 the weight (1-based), each with commas removed.
/// Animal names containing spaces cannot be recovered from this layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptionPattern {
    #[default]
    V1,
}

impl DescriptionPattern {
    fn name_field(self) -> usize {
        match self {
            DescriptionPattern::V1 => 3,
        }
    }

    fn weight_field(self) -> usize {
        match self {
            DescriptionPattern::V1 => 5,
        }
    }

    /// Extract a weight reading from `description`.
    pub fn parse(self, description: &str) -> ParsedDescription {
        if !description.contains(WEIGHT_MARKER) || !description.contains(PROCESSED_MARKER) {
            return ParsedDescription::Unmatched(UnmatchedReason::MissingMarkers);
        }

        let animal_name = split_field(description, self.name_field());
        if animal_name.is_empty() {
            return ParsedDescription::Unmatched(UnmatchedReason::MissingName);
        }

        let weight_text = split_field(description, self.weight_field());
        if weight_text.is_empty() {
            return ParsedDescription::Unmatched(UnmatchedReason::MissingWeight);
        }

        match parse_weight(&weight_text) {
            Some(weight) => ParsedDescription::Matched(WeightReading {
                animal_name,
                weight_text,
                weight,
            }),
            None => ParsedDescription::Unmatched(UnmatchedReason::InvalidWeight(weight_text)),
        }
    }
}

/// Name and weight pulled out of a description.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightReading {
    pub animal_name: String,
    /// The weight exactly as written in the description, commas removed.
    pub weight_text: String,
    /// `weight_text` as a number, in whatever unit the form used.
    pub weight: f64,
}

/// Outcome of parsing one description.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDescription {
    Matched(WeightReading),
    Unmatched(UnmatchedReason),
}

/// Why a description did not yield a weight reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmatchedReason {
    MissingMarkers,
    MissingName,
    MissingWeight,
    InvalidWeight(String),
}

impl std::fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnmatchedReason::MissingMarkers => write!(
                f,
                "description lacks '{WEIGHT_MARKER}' or '{PROCESSED_MARKER}'"
            ),
            UnmatchedReason::MissingName => write!(f, "no animal name in description"),
            UnmatchedReason::MissingWeight => write!(f, "no weight in description"),
            UnmatchedReason::InvalidWeight(text) => write!(f, "weight '{text}' is not a number"),
        }
    }
}

/// Parse with the current layout version.
pub fn parse_description(description: &str) -> ParsedDescription {
    DescriptionPattern::default().parse(description)
}

/// 1-based field of `s` split on single spaces, commas removed.
///
/// Consecutive spaces produce empty fields and a missing field is empty.
fn split_field(s: &str, field: usize) -> String {
    s.split(' ')
        .nth(field.saturating_sub(1))
        .unwrap_or("")
        .replace(',', "")
}

fn parse_weight(text: &str) -> Option<f64> {
    if !WEIGHT_RE.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|w| w.is_finite())
}
