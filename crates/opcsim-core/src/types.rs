// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types: tags, their value ranges and per-tick reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// TagRange
// =============================================================================

/// A half-open value range `[min, max)`.
///
/// # Examples
///
/// ```
/// use opcsim_core::types::TagRange;
///
/// let range = TagRange::new(20.0, 30.0).unwrap();
/// assert!(range.contains(20.0));
/// assert!(!range.contains(30.0));
/// assert!(TagRange::new(5.0, 5.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct TagRange {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawRange {
    min: f64,
    max: f64,
}

impl TryFrom<RawRange> for TagRange {
    type Error = ConfigError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        TagRange::new(raw.min, raw.max)
    }
}

impl TagRange {
    /// Creates a range, rejecting empty and non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::invalid_range(min, max, "Bounds must be finite"));
        }
        if min >= max {
            return Err(ConfigError::invalid_range(min, max, "min must be below max"));
        }
        Ok(Self { min, max })
    }

    /// Creates a range from compile-time bounds known to satisfy `min < max`.
    pub(crate) const fn from_static(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Lower bound (inclusive).
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound (exclusive).
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `true` if `value` lies in `[min, max)`.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value < self.max
    }
}

impl fmt::Display for TagRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

// =============================================================================
// Tag
// =============================================================================

/// A named scalar data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    name: String,
    display_name: String,
    value: f64,
    range: Option<TagRange>,
    writable: bool,
}

impl Tag {
    /// Creates an unbounded tag whose display name equals its name.
    pub fn new(name: impl Into<String>, value: f64, writable: bool) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            value,
            range: None,
            writable,
        }
    }

    /// Returns the tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display name used in log lines.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns the declared range, if any.
    pub fn range(&self) -> Option<TagRange> {
        self.range
    }

    /// Returns `true` if the tag accepts writes.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub(crate) fn set_range(&mut self, range: TagRange) {
        self.range = Some(range);
    }

    pub(crate) fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }
}

// =============================================================================
// TickReport
// =============================================================================

/// The values observed or produced during one tick, in tag order.
///
/// Displays as `Temperature: 25.00, Pressure: 1000.00, Flow Rate: 10.00`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    entries: Vec<(String, f64)>,
}

impl TickReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `(display name, value)` entry.
    pub fn push(&mut self, display_name: impl Into<String>, value: f64) {
        self.entries.push((display_name.into(), value));
    }

    /// Returns the entries in order.
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// Returns the values in order.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    /// Returns the value recorded under `display_name`.
    pub fn get(&self, display_name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == display_name)
            .map(|(_, v)| *v)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the report is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.2}", name, value)?;
        }
        Ok(())
    }
}

// =============================================================================
// RunSummary
// =============================================================================

/// Outcome of a loop that ran until shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed ticks.
    pub ticks: u64,
}

// =============================================================================
// Tests
// =============================================================================
