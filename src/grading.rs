use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const MIN_MARKS: f64 = 0.0;
pub const MAX_MARKS: f64 = 100.0;

/// One closed percentage interval mapped to a grade label and grade point.
/// Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRange {
    pub grade: String,
    pub min_marks: f64,
    pub max_marks: f64,
    pub grade_point: f64,
    #[serde(default)]
    pub display_order: i64,
}

impl GradeRange {
    pub fn new(grade: impl Into<String>, min_marks: f64, max_marks: f64, grade_point: f64) -> Self {
        Self {
            grade: grade.into(),
            min_marks,
            max_marks,
            grade_point,
            display_order: 0,
        }
    }

    pub fn with_display_order(mut self, display_order: i64) -> Self {
        self.display_order = display_order;
        self
    }

    pub fn contains(&self, percentage: f64) -> bool {
        percentage >= self.min_marks && percentage <= self.max_marks
    }

    /// `min_marks >= 0` and `max_marks <= 100`. NaN fails.
    fn in_domain(&self) -> bool {
        self.min_marks >= MIN_MARKS && self.max_marks <= MAX_MARKS
    }
}

/// The label/bounds of a range as it appears in error messages: `B1 (71-80)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRef {
    pub grade: String,
    pub min_marks: f64,
    pub max_marks: f64,
}

impl From<&GradeRange> for RangeRef {
    fn from(r: &GradeRange) -> Self {
        Self {
            grade: r.grade.clone(),
            min_marks: r.min_marks,
            max_marks: r.max_marks,
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}-{})", self.grade, self.min_marks, self.max_marks)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradeError {
    #[error("At least one grade range is required")]
    EmptyRangeSet,
    #[error("Grade marks must be within 0-100: {0}")]
    BoundsOutOfDomain(RangeRef),
    #[error("Minimum marks exceed maximum marks: {0}")]
    InvertedBounds(RangeRef),
    #[error("Grade ranges overlap: {first} and {second}")]
    OverlappingRanges { first: RangeRef, second: RangeRef },
    #[error("Grade label at position {position} is blank")]
    BlankGrade { position: usize },
    #[error("Grade {grade} appears more than once")]
    DuplicateGrade { grade: String },
}

impl GradeError {
    /// Stable identifier used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyRangeSet => "emptyRangeSet",
            Self::BoundsOutOfDomain(_) => "boundsOutOfDomain",
            Self::InvertedBounds(_) => "invertedBounds",
            Self::OverlappingRanges { .. } => "overlappingRanges",
            Self::BlankGrade { .. } => "blankGrade",
            Self::DuplicateGrade { .. } => "duplicateGrade",
        }
    }

    /// Grade labels the error is about, in message order.
    pub fn grades(&self) -> Vec<String> {
        match self {
            Self::EmptyRangeSet | Self::BlankGrade { .. } => Vec::new(),
            Self::BoundsOutOfDomain(r) | Self::InvertedBounds(r) => vec![r.grade.clone()],
            Self::OverlappingRanges { first, second } => {
                vec![first.grade.clone(), second.grade.clone()]
            }
            Self::DuplicateGrade { grade } => vec![grade.clone()],
        }
    }
}

/// Ascending by `min_marks`; ties by `max_marks`, then input order.
fn sorted_by_min(ranges: &[GradeRange]) -> Vec<&GradeRange> {
    let mut sorted: Vec<&GradeRange> = ranges.iter().collect();
    sorted.sort_by(|a, b| {
        a.min_marks
            .total_cmp(&b.min_marks)
            .then_with(|| a.max_marks.total_cmp(&b.max_marks))
    });
    sorted
}

fn collect_violations(ranges: &[GradeRange], first_only: bool) -> Vec<GradeError> {
    if ranges.is_empty() {
        return vec![GradeError::EmptyRangeSet];
    }

    let mut out: Vec<GradeError> = Vec::new();
    // Range with the greatest max_marks seen so far. Comparing against it
    // rather than the immediate predecessor also catches nested intervals.
    let mut reach: Option<&GradeRange> = None;

    for range in sorted_by_min(ranges) {
        if !range.in_domain() {
            out.push(GradeError::BoundsOutOfDomain(range.into()));
        } else if range.min_marks > range.max_marks {
            out.push(GradeError::InvertedBounds(range.into()));
        } else {
            if let Some(prev) = reach {
                if range.min_marks <= prev.max_marks {
                    out.push(GradeError::OverlappingRanges {
                        first: range.into(),
                        second: prev.into(),
                    });
                }
            }
            if reach.map(|p| range.max_marks > p.max_marks).unwrap_or(true) {
                reach = Some(range);
            }
        }

        if first_only && !out.is_empty() {
            break;
        }
    }
    out
}

/// Checks bounds and overlap over a sorted copy of `ranges` and reports the
/// first violation.
pub fn validate(ranges: &[GradeRange]) -> Result<(), GradeError> {
    match collect_violations(ranges, true).into_iter().next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Same rules as [`validate`], but keeps going and returns every violation.
pub fn validate_all(ranges: &[GradeRange]) -> Vec<GradeError> {
    collect_violations(ranges, false)
}

/// Range rules plus label rules: labels must be non-blank and unique.
pub fn check_definition(ranges: &[GradeRange]) -> Result<(), GradeError> {
    validate(ranges)?;
    let mut seen: HashSet<&str> = HashSet::new();
    for (position, r) in ranges.iter().enumerate() {
        let label = r.grade.trim();
        if label.is_empty() {
            return Err(GradeError::BlankGrade { position });
        }
        if !seen.insert(label) {
            return Err(GradeError::DuplicateGrade {
                grade: label.to_string(),
            });
        }
    }
    Ok(())
}

/// First range in input order whose interval contains `percentage`.
/// Does not clamp and does not assume the ranges are valid.
pub fn resolve(ranges: &[GradeRange], percentage: f64) -> Option<&GradeRange> {
    ranges.iter().find(|r| r.contains(percentage))
}

/// Like [`resolve`], but falls back to the range with the lowest `min_marks`
/// when nothing contains `percentage`.
pub fn resolve_or_lowest(ranges: &[GradeRange], percentage: f64) -> Option<&GradeRange> {
    resolve(ranges, percentage)
        .or_else(|| ranges.iter().min_by(|a, b| a.min_marks.total_cmp(&b.min_marks)))
}

/// Arithmetic mean of grade points; 0 for an empty input.
pub fn compute_aggregate<I>(grade_points: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0_f64;
    let mut count: usize = 0;
    for gp in grade_points {
        sum += gp;
        count += 1;
    }
    if count > 0 {
        sum / (count as f64)
    } else {
        0.0
    }
}

/// Half-up rounding to one decimal: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn round_to(x: f64, decimals: u8) -> f64 {
    let factor = 10_f64.powi(i32::from(decimals));
    (x * factor).round() / factor
}
