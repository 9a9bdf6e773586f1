use crate::config::{CalcConfig, CALC_CONFIG_KEY};
use crate::db;
use crate::grading::{check_definition, GradeError, GradeRange};
use crate::presets::Scale;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] GradeError),
    #[error("invalid definition name: {0}")]
    BadName(String),
    #[error("grade definition not found: {0}")]
    NotFound(String),
    #[error("grade definition {id} was superseded by {superseded_by}")]
    Superseded { id: String, superseded_by: String },
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid_ranges",
            Self::BadName(_) => "bad_params",
            Self::NotFound(_) => "not_found",
            Self::Superseded { .. } => "superseded",
            Self::Db(_) | Self::Other(_) => "store_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDefinition {
    pub id: String,
    pub name: String,
    pub scale: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    pub ranges: Vec<GradeRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSummary {
    pub id: String,
    pub name: String,
    pub scale: String,
    pub created_at: String,
    pub range_count: usize,
}

impl From<&GradeDefinition> for DefinitionSummary {
    fn from(d: &GradeDefinition) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            scale: d.scale.clone(),
            created_at: d.created_at.clone(),
            range_count: d.ranges.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDefinition {
    pub name: String,
    pub scale: String,
    pub ranges: Vec<GradeRange>,
}

/// A definition read back from a bundle. The recorded scale is re-derived
/// from the ranges.
impl From<GradeDefinition> for NewDefinition {
    fn from(d: GradeDefinition) -> Self {
        Self {
            scale: scale_for_ranges(&d.scale, &d.ranges),
            name: d.name,
            ranges: d.ranges,
        }
    }
}

impl NewDefinition {
    /// Name and range checks, without modifying anything.
    pub fn check(&self) -> Result<(), StoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StoreError::BadName("name must not be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(StoreError::BadName(format!(
                "name length must be <= {}",
                MAX_NAME_LEN
            )));
        }
        check_definition(&self.ranges)?;
        Ok(())
    }

    /// Checks, then trims the name and grade labels.
    fn checked(mut self) -> Result<Self, StoreError> {
        self.check()?;
        self.name = self.name.trim().to_string();
        for r in &mut self.ranges {
            r.grade = r.grade.trim().to_string();
        }
        Ok(self)
    }
}

/// A preset scale holds only while the ranges are still the preset's;
/// anything else, unknown keys included, is `custom`.
fn scale_for_ranges(claimed: &str, ranges: &[GradeRange]) -> String {
    match Scale::parse(claimed) {
        Some(scale) if scale != Scale::Custom && scale.ranges() == ranges => {
            scale.key().to_string()
        }
        _ => Scale::Custom.key().to_string(),
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Persistence for grade definitions and calculation settings.
///
/// Stored definitions are immutable: `replace` writes a new definition and
/// marks the old one superseded. Only current definitions are listed.
pub trait GradeStore {
    fn list(&self) -> Result<Vec<DefinitionSummary>, StoreError>;
    fn get(&self, id: &str) -> Result<GradeDefinition, StoreError>;
    fn create(&mut self, def: NewDefinition) -> Result<String, StoreError>;
    /// Creates every definition or none of them.
    fn create_many(&mut self, defs: Vec<NewDefinition>) -> Result<Vec<String>, StoreError>;
    fn replace(
        &mut self,
        id: &str,
        name: Option<String>,
        ranges: Vec<GradeRange>,
    ) -> Result<String, StoreError>;
    /// Removes a current definition together with every definition it superseded.
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
    fn load_config(&self) -> Result<CalcConfig, StoreError>;
    fn save_config(&mut self, config: &CalcConfig) -> Result<(), StoreError>;
}

fn ensure_current(def: &GradeDefinition) -> Result<(), StoreError> {
    match &def.superseded_by {
        Some(next) => Err(StoreError::Superseded {
            id: def.id.clone(),
            superseded_by: next.clone(),
        }),
        None => Ok(()),
    }
}

/// Scratch store used until a workspace is selected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    definitions: Vec<GradeDefinition>,
    config: CalcConfig,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_checked(&mut self, def: NewDefinition) -> String {
        let id = Uuid::new_v4().to_string();
        self.definitions.push(GradeDefinition {
            id: id.clone(),
            name: def.name,
            scale: def.scale,
            created_at: now_rfc3339(),
            superseded_by: None,
            ranges: def.ranges,
        });
        id
    }

    fn find(&self, id: &str) -> Result<&GradeDefinition, StoreError> {
        self.definitions
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl GradeStore for MemoryStore {
    fn list(&self) -> Result<Vec<DefinitionSummary>, StoreError> {
        let mut out: Vec<DefinitionSummary> = self
            .definitions
            .iter()
            .filter(|d| d.superseded_by.is_none())
            .map(DefinitionSummary::from)
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn get(&self, id: &str) -> Result<GradeDefinition, StoreError> {
        self.find(id).cloned()
    }

    fn create(&mut self, def: NewDefinition) -> Result<String, StoreError> {
        let def = def.checked()?;
        Ok(self.push_checked(def))
    }

    fn create_many(&mut self, defs: Vec<NewDefinition>) -> Result<Vec<String>, StoreError> {
        let checked = defs
            .into_iter()
            .map(NewDefinition::checked)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(checked.into_iter().map(|d| self.push_checked(d)).collect())
    }

    fn replace(
        &mut self,
        id: &str,
        name: Option<String>,
        ranges: Vec<GradeRange>,
    ) -> Result<String, StoreError> {
        let old = self.find(id)?;
        ensure_current(old)?;
        let next = NewDefinition {
            name: name.unwrap_or_else(|| old.name.clone()),
            scale: scale_for_ranges(&old.scale, &ranges),
            ranges,
        };
        let new_id = self.create(next)?;
        for d in self.definitions.iter_mut().filter(|d| d.id == id) {
            d.superseded_by = Some(new_id.clone());
        }
        Ok(new_id)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        ensure_current(self.find(id)?)?;
        let mut doomed: Vec<String> = vec![id.to_string()];
        let mut frontier: Vec<String> = vec![id.to_string()];
        while !frontier.is_empty() {
            let older: Vec<String> = self
                .definitions
                .iter()
                .filter(|d| {
                    d.superseded_by
                        .as_ref()
                        .map(|next| frontier.contains(next))
                        .unwrap_or(false)
                })
                .map(|d| d.id.clone())
                .collect();
            doomed.extend(older.iter().cloned());
            frontier = older;
        }
        self.definitions.retain(|d| !doomed.contains(&d.id));
        Ok(())
    }

    fn load_config(&self) -> Result<CalcConfig, StoreError> {
        Ok(self.config.clone())
    }

    fn save_config(&mut self, config: &CalcConfig) -> Result<(), StoreError> {
        self.config = config.clone();
        Ok(())
    }
}

/// Workspace store backed by the workspace SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Takes a connection whose schema was created by [`db::init_schema`].
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn load_ranges(&self, definition_id: &str) -> Result<Vec<GradeRange>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT grade, min_marks, max_marks, grade_point, display_order
             FROM grade_ranges
             WHERE definition_id = ?
             ORDER BY idx",
        )?;
        let ranges = stmt
            .query_map([definition_id], |r| {
                Ok(GradeRange {
                    grade: r.get(0)?,
                    min_marks: r.get(1)?,
                    max_marks: r.get(2)?,
                    grade_point: r.get(3)?,
                    display_order: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ranges)
    }

    fn load_head(&self, id: &str) -> Result<GradeDefinition, StoreError> {
        let row: Option<(String, String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT name, scale, created_at, superseded_by
                 FROM grade_definitions
                 WHERE id = ?",
                [id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
        let Some((name, scale, created_at, superseded_by)) = row else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        Ok(GradeDefinition {
            id: id.to_string(),
            name,
            scale,
            created_at,
            superseded_by,
            ranges: Vec::new(),
        })
    }
}

fn insert_definition(
    tx: &rusqlite::Transaction<'_>,
    def: &NewDefinition,
) -> Result<String, StoreError> {
    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO grade_definitions(id, name, scale, created_at, superseded_by)
         VALUES(?, ?, ?, ?, NULL)",
        (&id, &def.name, &def.scale, now_rfc3339()),
    )?;
    for (idx, r) in def.ranges.iter().enumerate() {
        tx.execute(
            "INSERT INTO grade_ranges(id, definition_id, idx, grade, min_marks, max_marks, grade_point, display_order)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                &id,
                idx as i64,
                &r.grade,
                r.min_marks,
                r.max_marks,
                r.grade_point,
                r.display_order,
            ),
        )?;
    }
    Ok(id)
}

impl GradeStore for SqliteStore {
    fn list(&self) -> Result<Vec<DefinitionSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT
               d.id,
               d.name,
               d.scale,
               d.created_at,
               (SELECT COUNT(*) FROM grade_ranges r WHERE r.definition_id = d.id) AS range_count
             FROM grade_definitions d
             WHERE d.superseded_by IS NULL
             ORDER BY d.name",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(DefinitionSummary {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    scale: r.get(2)?,
                    created_at: r.get(3)?,
                    range_count: r.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: &str) -> Result<GradeDefinition, StoreError> {
        let mut def = self.load_head(id)?;
        def.ranges = self.load_ranges(id)?;
        Ok(def)
    }

    fn create(&mut self, def: NewDefinition) -> Result<String, StoreError> {
        let def = def.checked()?;
        let tx = self.conn.transaction()?;
        let id = insert_definition(&tx, &def)?;
        tx.commit()?;
        tracing::info!(definition_id = %id, name = %def.name, "grade definition created");
        Ok(id)
    }

    fn create_many(&mut self, defs: Vec<NewDefinition>) -> Result<Vec<String>, StoreError> {
        let checked = defs
            .into_iter()
            .map(NewDefinition::checked)
            .collect::<Result<Vec<_>, _>>()?;
        let tx = self.conn.transaction()?;
        let ids = checked
            .iter()
            .map(|d| insert_definition(&tx, d))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;
        tracing::info!(count = ids.len(), "grade definitions created");
        Ok(ids)
    }

    fn replace(
        &mut self,
        id: &str,
        name: Option<String>,
        ranges: Vec<GradeRange>,
    ) -> Result<String, StoreError> {
        let old = self.load_head(id)?;
        ensure_current(&old)?;
        let next = NewDefinition {
            name: name.unwrap_or(old.name),
            scale: scale_for_ranges(&old.scale, &ranges),
            ranges,
        }
        .checked()?;

        let tx = self.conn.transaction()?;
        let new_id = insert_definition(&tx, &next)?;
        tx.execute(
            "UPDATE grade_definitions SET superseded_by = ? WHERE id = ?",
            (&new_id, id),
        )?;
        tx.commit()?;
        tracing::info!(definition_id = %new_id, supersedes = %id, "grade definition replaced");
        Ok(new_id)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        ensure_current(&self.load_head(id)?)?;
        let tx = self.conn.transaction()?;
        let mut frontier: Vec<String> = vec![id.to_string()];
        let mut removed: usize = 0;
        while let Some(current) = frontier.pop() {
            let older: Vec<String> = {
                let mut stmt =
                    tx.prepare("SELECT id FROM grade_definitions WHERE superseded_by = ?")?;
                let ids = stmt
                    .query_map([&current], |r| r.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            };
            tx.execute(
                "DELETE FROM grade_ranges WHERE definition_id = ?",
                [&current],
            )?;
            tx.execute("DELETE FROM grade_definitions WHERE id = ?", [&current])?;
            removed += 1;
            frontier.extend(older);
        }
        tx.commit()?;
        tracing::info!(definition_id = %id, removed, "grade definition deleted");
        Ok(())
    }

    fn load_config(&self) -> Result<CalcConfig, StoreError> {
        let saved = db::settings_get_json(&self.conn, CALC_CONFIG_KEY)?;
        Ok(CalcConfig::from_saved(saved.as_ref()))
    }

    fn save_config(&mut self, config: &CalcConfig) -> Result<(), StoreError> {
        let value = serde_json::to_value(config).map_err(anyhow::Error::from)?;
        db::settings_set_json(&self.conn, CALC_CONFIG_KEY, &value)?;
        Ok(())
    }
}
