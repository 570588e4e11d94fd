//! Application configuration constants
//!
//! Central location for configuration constants and validation
//! boundaries used throughout the persistence core.

// ===== Storage Locations =====

/// Directory created under the platform data directory.
pub const DATA_DIR_NAME: &str = "liftlink";

/// Database file name inside the application data directory.
pub const DB_FILE_NAME: &str = "liftlink.db";

// ===== Connection Pool =====

/// Maximum connections in the application pool.
pub const MAX_POOL_CONNECTIONS: u32 = 5;

/// How long a connection waits on SQLite's write lock before giving up.
pub const BUSY_TIMEOUT_SECS: u64 = 5;

// ===== Default Exercise Catalog =====

/// Seeded into the exercise catalog at initialization so autocomplete
/// has suggestions on a fresh install. Seeding is insert-if-absent;
/// user-added entries are never overwritten.
pub const DEFAULT_EXERCISES: &[&str] = &[
    "Barbell Bench Press",
    "Barbell Curl",
    "Barbell Deadlift",
    "Barbell Overhead Press",
    "Barbell Romanian Deadlift",
    "Barbell Row",
    "Barbell Squat",
    "Dumbbell Bench Press",
    "Dumbbell Curl",
    "Dumbbell Lateral Raise",
    "Dumbbell Row",
    "Lat Pulldown",
    "Leg Press",
    "Pull-Up",
    "Push-Up",
    "Triceps Pushdown",
];
