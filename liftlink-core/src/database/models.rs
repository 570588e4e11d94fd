//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to the mobile shell.
//!
//! Workouts and sets each come in two roles that share a table, split
//! by an `is_entry` column. That column stays internal: rows convert
//! into the [`Workout`] and [`Set`] enums before they leave this crate,
//! so a dated template or an undated log entry is unrepresentable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StoreError;

/// A training plan owning template workouts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub is_current: bool,
    /// Round-robin cursor into the program's template workouts
    pub current_workout_id: Option<i64>,
}

/// A reusable planned session belonging to a program
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutTemplate {
    pub id: i64,
    pub program_id: i64,
    pub name: String,
}

/// A timestamped record of a performed session
///
/// The name is denormalized at logging time; renaming a template later
/// does not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutEntry {
    pub id: i64,
    pub program_id: i64,
    pub name: String,
    pub performed_at: DateTime<Utc>,
}

/// Either role a workout row can take
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workout {
    Template(WorkoutTemplate),
    Entry(WorkoutEntry),
}

impl Workout {
    pub fn id(&self) -> i64 {
        match self {
            Workout::Template(t) => t.id,
            Workout::Entry(e) => e.id,
        }
    }

    pub fn program_id(&self) -> i64 {
        match self {
            Workout::Template(t) => t.program_id,
            Workout::Entry(e) => e.program_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Workout::Template(t) => &t.name,
            Workout::Entry(e) => &e.name,
        }
    }

    pub fn as_template(&self) -> Option<&WorkoutTemplate> {
        match self {
            Workout::Template(t) => Some(t),
            Workout::Entry(_) => None,
        }
    }

    pub fn as_entry(&self) -> Option<&WorkoutEntry> {
        match self {
            Workout::Template(_) => None,
            Workout::Entry(e) => Some(e),
        }
    }
}

/// Raw workout row as stored
#[derive(Debug, FromRow)]
pub(crate) struct WorkoutRow {
    pub id: i64,
    pub program_id: i64,
    pub name: String,
    pub is_entry: bool,
    pub performed_at: Option<DateTime<Utc>>,
}

impl TryFrom<WorkoutRow> for Workout {
    type Error = StoreError;

    fn try_from(row: WorkoutRow) -> Result<Self, StoreError> {
        if row.is_entry {
            let performed_at = row.performed_at.ok_or_else(|| {
                StoreError::Integrity(format!("workout entry {} has no date", row.id))
            })?;
            Ok(Workout::Entry(WorkoutEntry {
                id: row.id,
                program_id: row.program_id,
                name: row.name,
                performed_at,
            }))
        } else {
            Ok(Workout::Template(WorkoutTemplate {
                id: row.id,
                program_id: row.program_id,
                name: row.name,
            }))
        }
    }
}

/// Planned weight and reps inside a template workout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedSet {
    pub id: i64,
    pub workout_id: i64,
    /// None only on rows predating the exercise catalog
    pub exercise_id: Option<i64>,
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i64,
}

/// Logged weight and reps inside a workout entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformedSet {
    pub id: i64,
    pub workout_id: i64,
    /// None only on rows predating the exercise catalog
    pub exercise_id: Option<i64>,
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i64,
}

/// Either role a set row can take
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Set {
    Planned(PlannedSet),
    Performed(PerformedSet),
}

impl Set {
    pub fn id(&self) -> i64 {
        match self {
            Set::Planned(s) => s.id,
            Set::Performed(s) => s.id,
        }
    }

    pub fn workout_id(&self) -> i64 {
        match self {
            Set::Planned(s) => s.workout_id,
            Set::Performed(s) => s.workout_id,
        }
    }

    pub fn exercise_name(&self) -> &str {
        match self {
            Set::Planned(s) => &s.exercise_name,
            Set::Performed(s) => &s.exercise_name,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Set::Planned(s) => s.weight,
            Set::Performed(s) => s.weight,
        }
    }

    pub fn reps(&self) -> i64 {
        match self {
            Set::Planned(s) => s.reps,
            Set::Performed(s) => s.reps,
        }
    }

    pub fn as_planned(&self) -> Option<&PlannedSet> {
        match self {
            Set::Planned(s) => Some(s),
            Set::Performed(_) => None,
        }
    }

    pub fn as_performed(&self) -> Option<&PerformedSet> {
        match self {
            Set::Planned(_) => None,
            Set::Performed(s) => Some(s),
        }
    }
}

/// Raw set row as stored
#[derive(Debug, FromRow)]
pub(crate) struct SetRow {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: Option<i64>,
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i64,
    pub is_entry: bool,
}

impl SetRow {
    pub(crate) fn into_planned(self) -> PlannedSet {
        PlannedSet {
            id: self.id,
            workout_id: self.workout_id,
            exercise_id: self.exercise_id,
            exercise_name: self.exercise_name,
            weight: self.weight,
            reps: self.reps,
        }
    }

    pub(crate) fn into_performed(self) -> PerformedSet {
        PerformedSet {
            id: self.id,
            workout_id: self.workout_id,
            exercise_id: self.exercise_id,
            exercise_name: self.exercise_name,
            weight: self.weight,
            reps: self.reps,
        }
    }
}

impl From<SetRow> for Set {
    fn from(row: SetRow) -> Self {
        if row.is_entry {
            Set::Performed(row.into_performed())
        } else {
            Set::Planned(row.into_planned())
        }
    }
}

/// Catalog entry for a distinct exercise name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
}

/// Best logged weight for one exercise
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersonalRecord {
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i64,
    /// Date of the workout entry the record was set in
    pub performed_at: DateTime<Utc>,
}

/// A workout entry with its logged set count, for the history screen
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutLogEntry {
    pub id: i64,
    pub program_id: i64,
    pub name: String,
    pub performed_at: DateTime<Utc>,
    pub set_count: i64,
}

/// Program structure produced by the authoring screen
///
/// Weight and reps arrive as raw strings. Saving parses them and skips
/// items that do not parse, so one bad row never loses the whole draft.
#[derive(Debug, Deserialize)]
pub struct ProgramDraft {
    pub name: String,
    pub workouts: Vec<WorkoutDraft>,
}

/// One planned workout inside a draft
#[derive(Debug, Deserialize)]
pub struct WorkoutDraft {
    pub name: String,
    pub sets: Vec<SetDraft>,
}

/// One planned or performed set, as typed into the form
#[derive(Debug, Deserialize)]
pub struct SetDraft {
    pub exercise: String,
    pub weight: String,
    pub reps: String,
}

impl SetDraft {
    /// Parse weight and reps, returning none when either is not a
    /// usable non-negative number.
    pub(crate) fn parse(&self) -> Option<(f64, i64)> {
        let weight = self.weight.trim().parse::<f64>().ok()?;
        let reps = self.reps.trim().parse::<i64>().ok()?;

        if !weight.is_finite() || weight < 0.0 || reps < 0 {
            return None;
        }

        Some((weight, reps))
    }
}
