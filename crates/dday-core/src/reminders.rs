//! Reminder offsets, scheduling dates and the notification copy users see.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How many days before a contract's end date a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ReminderOffset {
    OneDay,
    ThreeDays,
    OneWeek,
    TwoWeeks,
    OneMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported reminder offset: {0} days (expected one of 1, 3, 7, 14, 30)")]
pub struct InvalidOffset(pub i32);

/// Why a textual offset such as a CLI argument was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseOffsetError {
    #[error("reminder offset must be a whole number of days, got `{0}`")]
    NotANumber(String),
    #[error(transparent)]
    Unsupported(#[from] InvalidOffset),
}

impl ReminderOffset {
    pub const ALL: [ReminderOffset; 5] = [
        ReminderOffset::OneDay,
        ReminderOffset::ThreeDays,
        ReminderOffset::OneWeek,
        ReminderOffset::TwoWeeks,
        ReminderOffset::OneMonth,
    ];

    #[must_use]
    pub fn days(self) -> i32 {
        match self {
            ReminderOffset::OneDay => 1,
            ReminderOffset::ThreeDays => 3,
            ReminderOffset::OneWeek => 7,
            ReminderOffset::TwoWeeks => 14,
            ReminderOffset::OneMonth => 30,
        }
    }
}

impl TryFrom<i32> for ReminderOffset {
    type Error = InvalidOffset;

    fn try_from(days: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|offset| offset.days() == days)
            .ok_or(InvalidOffset(days))
    }
}

impl From<ReminderOffset> for i32 {
    fn from(offset: ReminderOffset) -> Self {
        offset.days()
    }
}

impl std::str::FromStr for ReminderOffset {
    type Err = ParseOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days = s
            .trim()
            .parse::<i32>()
            .map_err(|_| ParseOffsetError::NotANumber(s.trim().to_string()))?;
        Ok(Self::try_from(days)?)
    }
}

/// A reminder row to be written for a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedReminder {
    pub offset: ReminderOffset,
    pub scheduled_date: NaiveDate,
}

/// Computes `end_date - offset` for each distinct offset.
///
/// Dates earlier than `today` are dropped: they can never come due.
/// Output is ordered by scheduled date, earliest first.
#[must_use]
pub fn plan_reminders(
    end_date: NaiveDate,
    offsets: &[ReminderOffset],
    today: NaiveDate,
) -> Vec<PlannedReminder> {
    let distinct: BTreeSet<ReminderOffset> = offsets.iter().copied().collect();

    let mut planned: Vec<PlannedReminder> = distinct
        .into_iter()
        .filter_map(|offset| {
            let days = u64::from(offset.days().unsigned_abs());
            let scheduled_date = end_date.checked_sub_days(Days::new(days))?;
            (scheduled_date >= today).then_some(PlannedReminder {
                offset,
                scheduled_date,
            })
        })
        .collect();

    planned.sort_by_key(|p| p.scheduled_date);
    planned
}

pub const NOTICE_TITLE: &str = "계약 만료 알림";

/// Title and body of a push notification for one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotice {
    pub title: String,
    pub body: String,
}

/// Builds the notification copy for a contract expiring in `days_before` days.
///
/// One day out reads "tomorrow"; anything else names the day count.
#[must_use]
pub fn reminder_notice(contract_title: &str, days_before: i32) -> ReminderNotice {
    let body = if days_before == 1 {
        format!("\"{contract_title}\" 계약이 내일 만료됩니다.")
    } else {
        format!("\"{contract_title}\" 계약이 {days_before}일 후 만료됩니다.")
    };

    ReminderNotice {
        title: NOTICE_TITLE.to_string(),
        body,
    }
}
