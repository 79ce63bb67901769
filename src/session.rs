//! Per-calculation UI state.
//!
//! A session moves through idle → calculating → (result shown, insight
//! loading) → (insight shown | insight unavailable). Every calculation bumps
//! the generation; insight outcomes carry the generation they were started
//! for, so anything that resolves after a newer calculation is dropped.

use chrono::{NaiveDate, NaiveDateTime};

use crate::age::{AgeResult, compute_age};
use crate::insight::InsightUnavailable;
use crate::validate::{InvalidBirthDate, parse_birth_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Calculating,
    Shown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightSlot {
    Idle,
    Loading,
    Ready(String),
    Unavailable,
}

/// A calculation whose insight is still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub generation: u64,
    pub birth_date: NaiveDate,
}

#[derive(Debug)]
pub struct Session {
    generation: u64,
    phase: Phase,
    result: Option<AgeResult>,
    insight: InsightSlot,
    error: Option<InvalidBirthDate>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            generation: 0,
            phase: Phase::Idle,
            result: None,
            insight: InsightSlot::Idle,
            error: None,
        }
    }

    /// Starts a new calculation for `input`, clearing the previous result,
    /// insight and error first.
    ///
    /// On success the result is shown with the insight loading and the
    /// returned [`Cycle`] identifies the fetch to start.
    pub fn submit(&mut self, input: &str, now: NaiveDateTime) -> Result<Cycle, InvalidBirthDate> {
        self.generation += 1;
        self.phase = Phase::Calculating;
        self.result = None;
        self.insight = InsightSlot::Idle;
        self.error = None;

        let birth = match parse_birth_date(input, now) {
            Ok(birth) => birth,
            Err(error) => {
                match &error {
                    InvalidBirthDate::Missing => {
                        tracing::debug!(generation = self.generation, "birth date missing")
                    }
                    InvalidBirthDate::Malformed { input } => {
                        tracing::debug!(generation = self.generation, %input, "birth date malformed")
                    }
                    InvalidBirthDate::InFuture { date } => {
                        tracing::debug!(generation = self.generation, %date, "birth date in the future")
                    }
                }
                self.phase = Phase::Idle;
                self.error = Some(error.clone());
                return Err(error);
            }
        };

        self.result = Some(compute_age(birth, now));
        self.insight = InsightSlot::Loading;
        self.phase = Phase::Shown;

        Ok(Cycle {
            generation: self.generation,
            birth_date: birth.date(),
        })
    }

    /// Records the insight outcome for `generation`. Returns `false` and
    /// leaves the state untouched when a newer calculation has started.
    pub fn resolve_insight(
        &mut self,
        generation: u64,
        outcome: Result<String, InsightUnavailable>,
    ) -> bool {
        if generation != self.generation || self.insight != InsightSlot::Loading {
            tracing::debug!(
                generation,
                current = self.generation,
                "discarding stale insight"
            );
            return false;
        }

        self.insight = match outcome {
            Ok(text) => InsightSlot::Ready(text),
            Err(InsightUnavailable) => InsightSlot::Unavailable,
        };
        true
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> Option<&AgeResult> {
        self.result.as_ref()
    }

    pub fn insight(&self) -> &InsightSlot {
        &self.insight
    }

    pub fn error(&self) -> Option<&InvalidBirthDate> {
        self.error.as_ref()
    }
}
