//! Scheduler module for the stars search pipeline.
//!
//! Computes when the next refresh run is due from a cron expression
//! evaluated in a fixed timezone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::PipelineError;

/// A cron schedule bound to a timezone.
///
/// Standard 5-field expressions (`minute hour day month weekday`) are
/// accepted and run at second zero. 6- and 7-field expressions with a
/// leading seconds field and `@daily`-style shorthands are passed through.
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    cron: cron::Schedule,
    timezone: Tz,
}

impl Schedule {
    /// Parse `expression` evaluated in the IANA `timezone`.
    ///
    /// # Returns
    ///
    /// * `Ok(Schedule)` - A schedule ready to compute trigger times
    /// * `Err(PipelineError::ScheduleError)` - If the expression or timezone is invalid
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, PipelineError> {
        let timezone = Tz::from_str(timezone.trim()).map_err(|e| {
            PipelineError::schedule(format!("invalid timezone {}: {}", timezone, e))
        })?;

        let normalized = normalize(expression)?;
        let cron = cron::Schedule::from_str(&normalized).map_err(|e| {
            PipelineError::schedule(format!("invalid schedule {}: {}", expression, e))
        })?;

        Ok(Self {
            expression: expression.trim().to_string(),
            cron,
            timezone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First trigger time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron
            .after(&now.with_timezone(&self.timezone))
            .next()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Time left until the next trigger after `now`.
    pub fn until_next(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.next_after(now)
            .map(|at| (at - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Prepend a seconds field to 5-field expressions.
fn normalize(expression: &str) -> Result<String, PipelineError> {
    let expression = expression.trim();
    if expression.starts_with('@') {
        return Ok(expression.to_string());
    }

    match expression.split_whitespace().count() {
        5 => Ok(format!("0 {}", expression)),
        6 | 7 => Ok(expression.to_string()),
        n => Err(PipelineError::schedule(format!(
            "invalid schedule {}: expected 5 to 7 fields, got {}",
            expression, n
        ))),
    }
}
