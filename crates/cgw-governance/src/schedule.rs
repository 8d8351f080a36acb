//! # Review Schedule
//!
//! `next_review = last_review + cadence_days`, recomputed on every
//! completed review.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use cgw_core::GovernanceSettings;

use crate::error::GovernanceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSchedule {
    pub cadence_days: u32,
    pub last_review: NaiveDate,
    pub next_review: NaiveDate,
}

impl ReviewSchedule {
    pub fn new(cadence_days: u32, last_review: NaiveDate) -> Self {
        let cadence_days = cadence_days.max(1);
        Self {
            cadence_days,
            last_review,
            next_review: add_days(last_review, cadence_days),
        }
    }

    /// Build from settings. Without a configured last review, `today` is used.
    pub fn from_settings(settings: &GovernanceSettings, today: NaiveDate) -> Self {
        Self::new(
            settings.review_cadence_days,
            settings.last_review.unwrap_or(today),
        )
    }

    /// Record a review held on `on`.
    pub fn complete_review(&mut self, on: NaiveDate) -> Result<(), GovernanceError> {
        if on < self.last_review {
            return Err(GovernanceError::ReviewOutOfOrder {
                last: self.last_review,
                requested: on,
            });
        }
        self.last_review = on;
        self.next_review = add_days(on, self.cadence_days);
        tracing::info!(last_review = %on, next_review = %self.next_review, "governance review completed");
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        today > self.next_review
    }

    /// Days until the next review; negative once overdue.
    pub fn days_until_next(&self, today: NaiveDate) -> i64 {
        (self.next_review - today).num_days()
    }
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}
