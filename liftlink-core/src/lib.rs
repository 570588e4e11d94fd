//! LiftLink persistence core
//!
//! Local storage for training programs, workouts, sets and the exercise
//! catalog. The mobile shell embeds this crate and talks to it through
//! [`database::Repository`].

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
