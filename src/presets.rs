use crate::grading::GradeRange;
use serde::{Deserialize, Serialize};

/// Built-in grade scales offered as starting templates. `Custom` marks
/// user-entered definitions and has no preset ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Cbse,
    Icse,
    StateBoard,
    Gpa4,
    Custom,
}

impl Scale {
    pub const PRESETS: [Scale; 4] = [Scale::Cbse, Scale::Icse, Scale::StateBoard, Scale::Gpa4];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cbse" => Some(Self::Cbse),
            "icse" => Some(Self::Icse),
            "state_board" | "stateboard" | "state" => Some(Self::StateBoard),
            "gpa4" | "gpa_4" => Some(Self::Gpa4),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Cbse => "cbse",
            Self::Icse => "icse",
            Self::StateBoard => "state_board",
            Self::Gpa4 => "gpa4",
            Self::Custom => "custom",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cbse => "CBSE",
            Self::Icse => "ICSE",
            Self::StateBoard => "State Board",
            Self::Gpa4 => "GPA 4.0",
            Self::Custom => "Custom",
        }
    }

    /// Preset ranges, highest grade first, `display_order` numbered from 1.
    pub fn ranges(self) -> Vec<GradeRange> {
        let rows: &[(&str, f64, f64, f64)] = match self {
            Self::Cbse => &[
                ("A1", 91.0, 100.0, 10.0),
                ("A2", 81.0, 90.0, 9.0),
                ("B1", 71.0, 80.0, 8.0),
                ("B2", 61.0, 70.0, 7.0),
                ("C1", 51.0, 60.0, 6.0),
                ("C2", 41.0, 50.0, 5.0),
                ("D", 33.0, 40.0, 4.0),
                ("E1", 21.0, 32.0, 0.0),
                ("E2", 0.0, 20.0, 0.0),
            ],
            Self::Icse => &[
                ("A+", 90.0, 100.0, 10.0),
                ("A", 80.0, 89.0, 9.0),
                ("B+", 70.0, 79.0, 8.0),
                ("B", 60.0, 69.0, 7.0),
                ("C+", 50.0, 59.0, 6.0),
                ("C", 40.0, 49.0, 5.0),
                ("D", 33.0, 39.0, 4.0),
                ("E", 0.0, 32.0, 0.0),
            ],
            Self::StateBoard => &[
                ("A", 80.0, 100.0, 9.0),
                ("B", 70.0, 79.0, 7.0),
                ("C", 60.0, 69.0, 5.0),
                ("D", 50.0, 59.0, 3.0),
                ("E", 35.0, 49.0, 1.0),
                ("F", 0.0, 34.0, 0.0),
            ],
            Self::Gpa4 => &[
                ("A", 90.0, 100.0, 4.0),
                ("B", 80.0, 89.0, 3.0),
                ("C", 70.0, 79.0, 2.0),
                ("D", 60.0, 69.0, 1.0),
                ("F", 0.0, 59.0, 0.0),
            ],
            Self::Custom => &[],
        };
        rows.iter()
            .enumerate()
            .map(|(i, (grade, min, max, gp))| {
                GradeRange::new(*grade, *min, *max, *gp).with_display_order(i as i64 + 1)
            })
            .collect()
    }
}
