//! Repository layer for database operations
//!
//! All data access goes through [`Repository`]. Multi-step mutations
//! run inside explicit transactions so a failure cannot leave partial
//! state behind.

use super::models::*;
use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new program.
    pub async fn create_program(&self, name: &str) -> Result<Program> {
        let name = validated_name(name)?;

        let program = sqlx::query_as::<_, Program>(
            r#"
            INSERT INTO programs (name) VALUES (?)
            RETURNING *
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created program: {}", program.id);
        Ok(program)
    }

    /// List all programs, most recently created first.
    pub async fn list_programs(&self) -> Result<Vec<Program>> {
        let programs = sqlx::query_as::<_, Program>(
            r#"
            SELECT * FROM programs ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(programs)
    }

    /// Get a program by ID.
    pub async fn get_program(&self, id: i64) -> Result<Option<Program>> {
        let program = sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(program)
    }

    /// Mark a program as the single current one.
    ///
    /// Clears the flag everywhere, sets it on the target and points the
    /// round-robin cursor at the program's first template workout. Runs
    /// in one transaction; at no point can two programs be current.
    /// Returns false when the program does not exist, in which case the
    /// flag stays cleared everywhere.
    pub async fn set_current_program(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE programs SET is_current = 0 WHERE is_current = 1")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("UPDATE programs SET is_current = 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            tx.commit().await?;
            tracing::warn!("Set current program: {} not found, flag cleared", id);
            return Ok(false);
        }

        let first_template: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM workouts
            WHERE program_id = ? AND is_entry = 0
            ORDER BY id ASC LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query("UPDATE programs SET current_workout_id = ? WHERE id = ?")
            .bind(first_template)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Set current program: {}", id);
        Ok(true)
    }

    /// Point a program's round-robin cursor at one of its template
    /// workouts, or clear it with `None`.
    ///
    /// Returns false when the program does not exist.
    pub async fn set_current_workout(
        &self,
        program_id: i64,
        workout_id: Option<i64>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if let Some(workout_id) = workout_id {
            let belongs: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM workouts WHERE id = ? AND program_id = ? AND is_entry = 0",
            )
            .bind(workout_id)
            .bind(program_id)
            .fetch_optional(&mut *tx)
            .await?;

            if belongs.is_none() {
                return Err(StoreError::Validation(format!(
                    "workout {} is not a template workout of program {}",
                    workout_id, program_id
                )));
            }
        }

        let rows = sqlx::query("UPDATE programs SET current_workout_id = ? WHERE id = ?")
            .bind(workout_id)
            .bind(program_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        tracing::debug!("Set program {} cursor to {:?}", program_id, workout_id);
        Ok(rows > 0)
    }

    /// Advance the round-robin cursor to the next template workout in
    /// creation order, wrapping to the first after the last.
    ///
    /// A cleared cursor restarts at the first template workout. A stale
    /// cursor is cleared and reported as no advancement, as is a program
    /// with no template workouts. Returns the workout now under the
    /// cursor.
    pub async fn advance_current_workout(&self, program_id: i64) -> Result<Option<WorkoutTemplate>> {
        let mut tx = self.pool.begin().await?;

        let program = sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE id = ?")
            .bind(program_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(program) = program else {
            tracing::warn!("Advance workout: program {} not found", program_id);
            return Ok(None);
        };

        let templates = sqlx::query_as::<_, WorkoutTemplate>(
            r#"
            SELECT id, program_id, name FROM workouts
            WHERE program_id = ? AND is_entry = 0
            ORDER BY id ASC
            "#,
        )
        .bind(program_id)
        .fetch_all(&mut *tx)
        .await?;

        if templates.is_empty() {
            sqlx::query("UPDATE programs SET current_workout_id = NULL WHERE id = ?")
                .bind(program_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(None);
        }

        let next = match program.current_workout_id {
            // No cursor yet; start the cycle at the first template.
            None => templates[0].clone(),
            Some(current) => match templates.iter().position(|w| w.id == current) {
                Some(pos) => templates[(pos + 1) % templates.len()].clone(),
                // Stale cursor; clear it and report no advancement.
                // The next call restarts the cycle.
                None => {
                    sqlx::query("UPDATE programs SET current_workout_id = NULL WHERE id = ?")
                        .bind(program_id)
                        .execute(&mut *tx)
                        .await?;
                    tx.commit().await?;
                    tracing::warn!("Advance workout: program {} cursor was stale", program_id);
                    return Ok(None);
                }
            },
        };

        sqlx::query("UPDATE programs SET current_workout_id = ? WHERE id = ?")
            .bind(next.id)
            .bind(program_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Advanced program {} cursor to workout {}", program_id, next.id);
        Ok(Some(next))
    }

    /// Delete a program and, through cascades, everything it owns.
    ///
    /// Returns false when the program does not exist.
    pub async fn delete_program(&self, id: i64) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM programs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            tracing::warn!("Delete program: {} not found", id);
            return Ok(false);
        }

        tracing::debug!("Deleted program: {}", id);
        Ok(true)
    }

    /// Save an authored program draft in one transaction.
    ///
    /// Workouts with blank names and sets with a blank exercise or
    /// unparsable numbers are skipped; everything else commits together.
    /// A blank program name rejects the whole draft.
    pub async fn create_program_with_schedule(&self, draft: ProgramDraft) -> Result<Program> {
        let program_name = validated_name(&draft.name)?;

        let mut tx = self.pool.begin().await?;

        let program =
            sqlx::query_as::<_, Program>("INSERT INTO programs (name) VALUES (?) RETURNING *")
                .bind(program_name)
                .fetch_one(&mut *tx)
                .await?;

        let mut skipped = 0usize;

        for workout in &draft.workouts {
            let workout_name = workout.name.trim();
            if workout_name.is_empty() {
                skipped += 1;
                continue;
            }

            let workout_id: i64 = sqlx::query_scalar(
                "INSERT INTO workouts (program_id, name, is_entry) VALUES (?, ?, 0) RETURNING id",
            )
            .bind(program.id)
            .bind(workout_name)
            .fetch_one(&mut *tx)
            .await?;

            for set in &workout.sets {
                let exercise_name = set.exercise.trim();
                if exercise_name.is_empty() {
                    skipped += 1;
                    continue;
                }
                let Some((weight, reps)) = set.parse() else {
                    skipped += 1;
                    continue;
                };

                let exercise = find_or_create_exercise_on(&mut tx, exercise_name).await?;
                insert_set_on(&mut tx, workout_id, &exercise, weight, reps, false).await?;
            }
        }

        tx.commit().await?;

        if skipped > 0 {
            tracing::warn!(
                "Saved program {} with {} invalid draft items skipped",
                program.id,
                skipped
            );
        }
        tracing::debug!("Created program: {} from draft", program.id);
        Ok(program)
    }

    /// Create a template workout under a program.
    pub async fn create_template_workout(
        &self,
        program_id: i64,
        name: &str,
    ) -> Result<WorkoutTemplate> {
        let name = validated_name(name)?;

        let workout = sqlx::query_as::<_, WorkoutTemplate>(
            r#"
            INSERT INTO workouts (program_id, name, is_entry) VALUES (?, ?, 0)
            RETURNING id, program_id, name
            "#,
        )
        .bind(program_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Created template workout: {} in program: {}",
            workout.id,
            program_id
        );
        Ok(workout)
    }

    /// Log a workout entry.
    ///
    /// The name is stored as given so renaming a template later does not
    /// rewrite history. `performed_at` defaults to now.
    pub async fn create_workout_entry(
        &self,
        program_id: i64,
        name: &str,
        performed_at: Option<DateTime<Utc>>,
    ) -> Result<WorkoutEntry> {
        let name = validated_name(name)?;
        let performed_at = performed_at.unwrap_or_else(Utc::now);

        let entry = sqlx::query_as::<_, WorkoutEntry>(
            r#"
            INSERT INTO workouts (program_id, name, is_entry, performed_at) VALUES (?, ?, 1, ?)
            RETURNING id, program_id, name, performed_at
            "#,
        )
        .bind(program_id)
        .bind(name)
        .bind(performed_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Created workout entry: {} in program: {}",
            entry.id,
            program_id
        );
        Ok(entry)
    }

    /// Log a completed session and its performed sets in one
    /// transaction.
    ///
    /// Sets with a blank exercise or unparsable numbers are skipped,
    /// mirroring the draft-save behavior.
    pub async fn record_session(
        &self,
        program_id: i64,
        name: &str,
        performed_at: Option<DateTime<Utc>>,
        sets: Vec<SetDraft>,
    ) -> Result<WorkoutEntry> {
        let name = validated_name(name)?;
        let performed_at = performed_at.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;

        let entry = sqlx::query_as::<_, WorkoutEntry>(
            r#"
            INSERT INTO workouts (program_id, name, is_entry, performed_at) VALUES (?, ?, 1, ?)
            RETURNING id, program_id, name, performed_at
            "#,
        )
        .bind(program_id)
        .bind(name)
        .bind(performed_at)
        .fetch_one(&mut *tx)
        .await?;

        let mut skipped = 0usize;

        for set in &sets {
            let exercise_name = set.exercise.trim();
            if exercise_name.is_empty() {
                skipped += 1;
                continue;
            }
            let Some((weight, reps)) = set.parse() else {
                skipped += 1;
                continue;
            };

            let exercise = find_or_create_exercise_on(&mut tx, exercise_name).await?;
            insert_set_on(&mut tx, entry.id, &exercise, weight, reps, true).await?;
        }

        tx.commit().await?;

        if skipped > 0 {
            tracing::warn!(
                "Recorded session {} with {} invalid sets skipped",
                entry.id,
                skipped
            );
        }
        tracing::debug!("Recorded session: {} in program: {}", entry.id, program_id);
        Ok(entry)
    }

    /// List a program's template workouts in day order.
    pub async fn list_template_workouts(&self, program_id: i64) -> Result<Vec<WorkoutTemplate>> {
        let workouts = sqlx::query_as::<_, WorkoutTemplate>(
            r#"
            SELECT id, program_id, name FROM workouts
            WHERE program_id = ? AND is_entry = 0
            ORDER BY id ASC
            "#,
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(workouts)
    }

    /// List all logged workout entries across programs, most recent
    /// first.
    pub async fn list_workout_entries(&self) -> Result<Vec<WorkoutEntry>> {
        let entries = sqlx::query_as::<_, WorkoutEntry>(
            r#"
            SELECT id, program_id, name, performed_at FROM workouts
            WHERE is_entry = 1
            ORDER BY performed_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// List every workout under a program, templates and entries alike,
    /// in creation order.
    pub async fn list_workouts(&self, program_id: i64) -> Result<Vec<Workout>> {
        let rows = sqlx::query_as::<_, WorkoutRow>(
            r#"
            SELECT * FROM workouts WHERE program_id = ? ORDER BY id ASC
            "#,
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Workout::try_from).collect()
    }

    /// Get a workout by ID, regardless of role.
    pub async fn get_workout(&self, id: i64) -> Result<Option<Workout>> {
        let row = sqlx::query_as::<_, WorkoutRow>("SELECT * FROM workouts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Workout::try_from).transpose()
    }

    /// Add a planned set to a template workout.
    ///
    /// The exercise is resolved through the catalog; the set stores the
    /// catalog ID plus the name it had at creation time.
    pub async fn create_template_set(
        &self,
        workout_id: i64,
        exercise: &str,
        weight: f64,
        reps: i64,
    ) -> Result<PlannedSet> {
        let row = self.create_set(workout_id, exercise, weight, reps, false).await?;

        tracing::debug!("Created planned set: {} in workout: {}", row.id, workout_id);
        Ok(row.into_planned())
    }

    /// Log a performed set under a workout entry.
    pub async fn create_performed_set(
        &self,
        workout_id: i64,
        exercise: &str,
        weight: f64,
        reps: i64,
    ) -> Result<PerformedSet> {
        let row = self.create_set(workout_id, exercise, weight, reps, true).await?;

        tracing::debug!("Created performed set: {} in workout: {}", row.id, workout_id);
        Ok(row.into_performed())
    }

    async fn create_set(
        &self,
        workout_id: i64,
        exercise: &str,
        weight: f64,
        reps: i64,
        is_entry: bool,
    ) -> Result<SetRow> {
        let name = validated_name(exercise)?;
        validated_measurements(weight, reps)?;

        let mut tx = self.pool.begin().await?;

        // A set's role must match its workout's role. A missing workout
        // falls through to the insert, which reports the foreign key
        // violation.
        if let Some(role) = workout_role_on(&mut tx, workout_id).await? {
            if role != is_entry {
                let message = if is_entry {
                    "cannot log a performed set on a template workout"
                } else {
                    "cannot plan a set on a logged workout entry"
                };
                return Err(StoreError::Validation(message.to_string()));
            }
        }

        let exercise = find_or_create_exercise_on(&mut tx, name).await?;
        let row = insert_set_on(&mut tx, workout_id, &exercise, weight, reps, is_entry).await?;

        tx.commit().await?;

        Ok(row)
    }

    /// List a workout's sets in creation order.
    ///
    /// Joined against the catalog so a renamed exercise shows its
    /// current name; rows predating the catalog fall back to the name
    /// stored on the set.
    pub async fn list_sets_for_workout(&self, workout_id: i64) -> Result<Vec<Set>> {
        let rows = sqlx::query_as::<_, SetRow>(
            r#"
            SELECT s.id, s.workout_id, s.exercise_id,
                   COALESCE(e.name, s.exercise_name) AS exercise_name,
                   s.weight, s.reps, s.is_entry
            FROM sets s
            LEFT JOIN exercises e ON e.id = s.exercise_id
            WHERE s.workout_id = ?
            ORDER BY s.id ASC
            "#,
        )
        .bind(workout_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Set::from).collect())
    }

    /// Get a set by ID.
    pub async fn get_set(&self, id: i64) -> Result<Option<Set>> {
        let row = sqlx::query_as::<_, SetRow>(
            r#"
            SELECT s.id, s.workout_id, s.exercise_id,
                   COALESCE(e.name, s.exercise_name) AS exercise_name,
                   s.weight, s.reps, s.is_entry
            FROM sets s
            LEFT JOIN exercises e ON e.id = s.exercise_id
            WHERE s.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Set::from))
    }

    /// List the exercise catalog alphabetically.
    pub async fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let exercises = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(exercises)
    }

    /// Get a catalog entry by ID.
    pub async fn get_exercise(&self, id: i64) -> Result<Option<Exercise>> {
        let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(exercise)
    }

    /// Exact-name catalog lookup.
    pub async fn find_exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE name = ?")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(exercise)
    }

    /// Return the catalog entry for a name, inserting it if absent.
    pub async fn find_or_create_exercise(&self, name: &str) -> Result<Exercise> {
        let name = validated_name(name)?;

        let mut conn = self.pool.acquire().await?;
        let exercise = find_or_create_exercise_on(&mut conn, name).await?;

        Ok(exercise)
    }

    /// Best logged weight per exercise, heaviest first.
    ///
    /// Only performed sets count. Ties on weight go to the higher rep
    /// count, then to the most recently logged set.
    pub async fn personal_records(&self) -> Result<Vec<PersonalRecord>> {
        let records = sqlx::query_as::<_, PersonalRecord>(
            r#"
            SELECT exercise_name, weight, reps, performed_at
            FROM (
                SELECT COALESCE(e.name, s.exercise_name) AS exercise_name,
                       s.weight, s.reps, w.performed_at,
                       ROW_NUMBER() OVER (
                           PARTITION BY COALESCE(e.name, s.exercise_name)
                           ORDER BY s.weight DESC, s.reps DESC, s.id DESC
                       ) AS rn
                FROM sets s
                JOIN workouts w ON w.id = s.workout_id
                LEFT JOIN exercises e ON e.id = s.exercise_id
                WHERE s.is_entry = 1
            )
            WHERE rn = 1
            ORDER BY weight DESC, exercise_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Workout entries with their logged set counts, most recent first.
    pub async fn workout_log(&self) -> Result<Vec<WorkoutLogEntry>> {
        let log = sqlx::query_as::<_, WorkoutLogEntry>(
            r#"
            SELECT w.id, w.program_id, w.name, w.performed_at,
                   COUNT(s.id) AS set_count
            FROM workouts w
            LEFT JOIN sets s ON s.workout_id = w.id AND s.is_entry = 1
            WHERE w.is_entry = 1
            GROUP BY w.id
            ORDER BY w.performed_at DESC, w.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(log)
    }
}

/// Trim a user-supplied name, rejecting empty results.
fn validated_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("name must not be empty".to_string()));
    }
    Ok(trimmed)
}

/// Reject negative or non-finite measurements.
fn validated_measurements(weight: f64, reps: i64) -> Result<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(StoreError::Validation(format!(
            "weight must be a non-negative number, got {}",
            weight
        )));
    }
    if reps < 0 {
        return Err(StoreError::Validation(format!(
            "reps must be non-negative, got {}",
            reps
        )));
    }
    Ok(())
}

/// Look up a workout's role before attaching a set.
async fn workout_role_on(conn: &mut SqliteConnection, workout_id: i64) -> Result<Option<bool>> {
    let is_entry: Option<bool> = sqlx::query_scalar("SELECT is_entry FROM workouts WHERE id = ?")
        .bind(workout_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(is_entry)
}

/// Find or insert the catalog row for a trimmed exercise name.
///
/// Insert-if-absent followed by the lookup, so concurrent calls for
/// the same name converge on one row.
async fn find_or_create_exercise_on(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Exercise> {
    let inserted = sqlx::query("INSERT OR IGNORE INTO exercises (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    if inserted > 0 {
        tracing::debug!("Created exercise: {}", exercise.id);
    }

    Ok(exercise)
}

async fn insert_set_on(
    conn: &mut SqliteConnection,
    workout_id: i64,
    exercise: &Exercise,
    weight: f64,
    reps: i64,
    is_entry: bool,
) -> Result<SetRow> {
    let row = sqlx::query_as::<_, SetRow>(
        r#"
        INSERT INTO sets (workout_id, exercise_id, exercise_name, weight, reps, is_entry)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(workout_id)
    .bind(exercise.id)
    .bind(&exercise.name)
    .bind(weight)
    .bind(reps)
    .bind(is_entry)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}
