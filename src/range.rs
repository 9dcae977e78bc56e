//! Reference-range expressions and result classification.
//!
//! Report editing, report display and every export share [`classify`], so a
//! value flagged abnormal on screen is flagged abnormal on paper.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::numeric::parse_number;

/// `min - max`, hyphen or en-dash, both bounds non-negative decimals.
static BETWEEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*[-–]\s*(\d+(?:\.\d+)?)").expect("Invalid range regex")
});

static BELOW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<\s*(\d+(?:\.\d+)?)").expect("Invalid upper bound regex"));

static ABOVE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s*(\d+(?:\.\d+)?)").expect("Invalid lower bound regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    InRange,
    OutOfRange,
    Indeterminate,
}

impl Verdict {
    /// Badge text used by report display and exports.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Verdict::InRange => Some("Normal"),
            Verdict::OutOfRange => Some("Abnormal"),
            Verdict::Indeterminate => None,
        }
    }

    pub fn is_abnormal(&self) -> bool {
        matches!(self, Verdict::OutOfRange)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeExpression {
    /// Inclusive on both ends.
    Between { min: f64, max: f64 },
    /// Strict upper bound.
    Below(f64),
    /// Strict lower bound.
    Above(f64),
    Unclassifiable,
}

impl RangeExpression {
    pub fn parse(expression: &str) -> Self {
        if let Some(caps) = BETWEEN_REGEX.captures(expression) {
            if let (Some(min), Some(max)) = (parse_number(&caps[1]), parse_number(&caps[2])) {
                return RangeExpression::Between { min, max };
            }
        }
        if let Some(max) = BELOW_REGEX.captures(expression).and_then(|c| parse_number(&c[1])) {
            return RangeExpression::Below(max);
        }
        if let Some(min) = ABOVE_REGEX.captures(expression).and_then(|c| parse_number(&c[1])) {
            return RangeExpression::Above(min);
        }
        RangeExpression::Unclassifiable
    }

    pub fn evaluate(&self, value: f64) -> Verdict {
        let in_range = match *self {
            RangeExpression::Between { min, max } => value >= min && value <= max,
            RangeExpression::Below(max) => value < max,
            RangeExpression::Above(min) => value > min,
            RangeExpression::Unclassifiable => return Verdict::Indeterminate,
        };

        if in_range {
            Verdict::InRange
        } else {
            Verdict::OutOfRange
        }
    }
}

/// Classify an entered value against its reference-range text.
pub fn classify(value: &str, range: &str) -> Verdict {
    match parse_number(value) {
        Some(v) => RangeExpression::parse(range).evaluate(v),
        None => Verdict::Indeterminate,
    }
}
