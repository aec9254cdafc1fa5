//! # Sequence Code Formatting
//!
//! Pure formatting of business codes (receipt numbers, check-out numbers,
//! invoice numbers) from a template, an interval scope, and a raw counter
//! value.
//!
//! ## Code Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Business Code Anatomy                            │
//! │                                                                         │
//! │      CO-2403070042/W1                                                   │
//! │      ──┬───┬───┬────┬──                                                 │
//! │        │   │   │    └── suffix        (template, may be empty)         │
//! │        │   │   └── counter, padded    (width fixed per scope)          │
//! │        │   └── interval component     (derived from scope)             │
//! │        └── prefix                     (template, may be empty)         │
//! │                                                                         │
//! │  Scope      Interval component   Counter pad                           │
//! │  ─────      ──────────────────   ───────────                           │
//! │  Day        yy mm dd             4 digits                              │
//! │  Month      yy mm                6 digits                              │
//! │  Year       yy                   8 digits                              │
//! │  None       (empty)              8 digits                              │
//! │                                                                         │
//! │  yy = calendar year modulo 2000 (2024 → "24")                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scope a counter uses doubles as its reset granularity: a day-scoped
//! counter gets a fresh row per day, a year-scoped one per year. This module
//! only formats - counter rows live in the database layer.

use serde::{Deserialize, Serialize};

// =============================================================================
// Sequence Template
// =============================================================================

/// Prefix/suffix pair wrapped around the numeric segment of a code.
///
/// Empty strings render as nothing - a template with no prefix and no suffix
/// yields the bare numeric segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceTemplate {
    pub prefix: String,
    pub suffix: String,
}

impl SequenceTemplate {
    /// Creates a template from prefix and suffix parts.
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        SequenceTemplate {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Template with no prefix or suffix.
    pub fn bare() -> Self {
        SequenceTemplate::default()
    }
}

// =============================================================================
// Interval Scope
// =============================================================================

/// Calendar interval a counter is scoped to.
///
/// Which variant applies is derived from which interval fields are present
/// on the counter row: all three → `Day`, year+month → `Month`, year alone →
/// `Year`, none → `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalScope {
    /// Resets daily; codes carry yy+mm+dd and a 4-digit counter.
    Day { year: i32, month: u32, day: u32 },
    /// Resets monthly; codes carry yy+mm and a 6-digit counter.
    Month { year: i32, month: u32 },
    /// Resets yearly; codes carry yy and an 8-digit counter.
    Year { year: i32 },
    /// Never resets; codes carry only an 8-digit counter.
    None,
}

impl IntervalScope {
    /// Derives the scope from optional interval fields, most specific first.
    ///
    /// A day field without a month, or a month without a year, has no
    /// meaningful scope and degrades to the next coarser one.
    pub fn from_parts(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Self {
        match (year, month, day) {
            (Some(y), Some(m), Some(d)) => IntervalScope::Day {
                year: y,
                month: m,
                day: d,
            },
            (Some(y), Some(m), _) => IntervalScope::Month { year: y, month: m },
            (Some(y), _, _) => IntervalScope::Year { year: y },
            _ => IntervalScope::None,
        }
    }

    /// Number of digits the counter segment is padded to for this scope.
    #[inline]
    pub const fn counter_width(&self) -> usize {
        match self {
            IntervalScope::Day { .. } => 4,
            IntervalScope::Month { .. } => 6,
            IntervalScope::Year { .. } | IntervalScope::None => 8,
        }
    }

    /// Renders the interval component (empty for `None`).
    fn interval_component(&self) -> String {
        match *self {
            IntervalScope::Day { year, month, day } => {
                format!("{:02}{:02}{:02}", year % 2000, month, day)
            }
            IntervalScope::Month { year, month } => format!("{:02}{:02}", year % 2000, month),
            IntervalScope::Year { year } => format!("{:02}", year % 2000),
            IntervalScope::None => String::new(),
        }
    }
}

// =============================================================================
// Code Formatter
// =============================================================================

/// Formats a business code from template, scope, and raw counter value.
///
/// Pure and total: never touches storage, never fails. Widths are fixed per
/// scope; a counter that outgrows its pad width simply renders wider.
///
/// ## Example
/// ```rust
/// use atlas_core::sequence::{format_code, IntervalScope, SequenceTemplate};
///
/// let template = SequenceTemplate::new("CO-", "");
/// let scope = IntervalScope::Day { year: 2024, month: 3, day: 7 };
/// assert_eq!(format_code(&template, scope, 42), "CO-2403070042");
/// ```
pub fn format_code(template: &SequenceTemplate, scope: IntervalScope, number: i64) -> String {
    format!(
        "{}{}{:0width$}{}",
        template.prefix,
        scope.interval_component(),
        number,
        template.suffix,
        width = scope.counter_width()
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
