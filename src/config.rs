use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings key under which the workspace stores [`CalcConfig`].
pub const CALC_CONFIG_KEY: &str = "calc.config";

/// Per-workspace calculation settings applied when grading subject scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcConfig {
    /// Round percentages to one decimal before resolving a grade.
    pub roff: bool,
    /// Give unmatched percentages the lowest grade instead of none.
    pub fallback_to_lowest: bool,
    pub cgpa_decimals: u8,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            roff: false,
            fallback_to_lowest: true,
            cgpa_decimals: 2,
        }
    }
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

impl CalcConfig {
    /// Applies a partial update. Nothing is changed if any field is invalid.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.clone();
        for (k, v) in patch {
            match k.as_str() {
                "roff" => next.roff = parse_bool(v, k)?,
                "fallbackToLowest" => next.fallback_to_lowest = parse_bool(v, k)?,
                "cgpaDecimals" => {
                    next.cgpa_decimals = parse_i64_range(v, k, 0, 4)? as u8;
                }
                _ => return Err(format!("unknown calc config field: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }

    /// Defaults overlaid with whatever saved fields still parse.
    pub fn from_saved(saved: Option<&Value>) -> Self {
        let mut config = Self::default();
        let Some(obj) = saved.and_then(|v| v.as_object()) else {
            return config;
        };
        for (k, v) in obj {
            let mut single = Map::new();
            single.insert(k.clone(), v.clone());
            // Malformed fields keep their default.
            let _ = config.apply_patch(&single);
        }
        config
    }
}
