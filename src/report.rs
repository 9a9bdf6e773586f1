use crate::config::CalcConfig;
use crate::grading::{
    compute_aggregate, resolve, resolve_or_lowest, round_off_1_decimal, round_to, GradeRange,
};
use serde::{Deserialize, Serialize};

/// A subject result as entered: either a percentage, or a total out of a maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScore {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of: Option<f64>,
}

impl SubjectScore {
    pub fn from_percentage(subject: impl Into<String>, percentage: f64) -> Self {
        Self {
            subject: subject.into(),
            percentage: Some(percentage),
            total: None,
            out_of: None,
        }
    }

    pub fn from_total(subject: impl Into<String>, total: f64, out_of: f64) -> Self {
        Self {
            subject: subject.into(),
            percentage: None,
            total: Some(total),
            out_of: Some(out_of),
        }
    }

    /// An explicit percentage wins over `total`/`out_of`.
    pub fn percentage(&self) -> Option<f64> {
        if let Some(p) = self.percentage {
            return Some(p);
        }
        match (self.total, self.out_of) {
            (Some(total), Some(out_of)) if out_of > 0.0 => Some(100.0 * total / out_of),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub subject: String,
    pub percentage: Option<f64>,
    pub grade: Option<String>,
    pub grade_point: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub rows: Vec<ReportRow>,
    pub cgpa: f64,
    pub graded_count: usize,
    pub ungraded_count: usize,
}

pub fn build_report_card(
    ranges: &[GradeRange],
    subjects: &[SubjectScore],
    config: &CalcConfig,
) -> ReportCard {
    let mut rows: Vec<ReportRow> = Vec::with_capacity(subjects.len());
    for s in subjects {
        let percentage = s.percentage().map(|p| {
            if config.roff {
                round_off_1_decimal(p)
            } else {
                p
            }
        });
        let resolved = percentage.and_then(|p| {
            if config.fallback_to_lowest {
                resolve_or_lowest(ranges, p)
            } else {
                resolve(ranges, p)
            }
        });
        rows.push(ReportRow {
            subject: s.subject.clone(),
            percentage,
            grade: resolved.map(|g| g.grade.clone()),
            grade_point: resolved.map(|g| g.grade_point),
        });
    }

    let graded_count = rows.iter().filter(|r| r.grade.is_some()).count();
    let cgpa = compute_aggregate(rows.iter().filter_map(|r| r.grade_point));
    ReportCard {
        cgpa: round_to(cgpa, config.cgpa_decimals),
        graded_count,
        ungraded_count: rows.len() - graded_count,
        rows,
    }
}
