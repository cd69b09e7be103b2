//! Remaining-time, due-date and display helpers for loans.

use crate::domain::{Decimal, TimeMs};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Time left until a loan is due, truncated to whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingTime {
    pub days: u64,
    /// 0..=23
    pub hours: u32,
    /// 0..=59
    pub minutes: u32,
    pub due: TimeMs,
    /// True once the due instant has been reached.
    pub overdue: bool,
}

impl RemainingTime {
    fn elapsed(due: TimeMs) -> Self {
        Self {
            days: 0,
            hours: 0,
            minutes: 0,
            due,
            overdue: true,
        }
    }
}

/// Compute the time remaining on a loan.
///
/// `start_time` and `loan_period` are whole seconds. A loan whose due instant is at
/// or before `now` reports all-zero components rather than negative values.
pub fn compute_remaining_time(start_time: i64, loan_period: i64, now: TimeMs) -> RemainingTime {
    let due = TimeMs::from_secs(start_time.saturating_add(loan_period));
    if due <= now {
        return RemainingTime::elapsed(due);
    }

    let diff = due.as_ms() - now.as_ms();
    RemainingTime {
        days: (diff / MS_PER_DAY) as u64,
        hours: ((diff % MS_PER_DAY) / MS_PER_HOUR) as u32,
        minutes: ((diff % MS_PER_HOUR) / MS_PER_MINUTE) as u32,
        due,
        overdue: false,
    }
}

/// Render a day count for display.
///
/// Only counts above one are pluralized; zero and negative counts keep the
/// singular form ("0 day", "-1 day").
pub fn format_remaining_days(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else if days <= 1 {
        format!("{} day", days)
    } else {
        format!("{} days", days)
    }
}

/// Format a due instant as a UTC calendar date, e.g. "Mar 05, 2025".
pub fn format_due_date(due: TimeMs) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(due.as_ms()).map(|dt| dt.format("%b %d, %Y").to_string())
}

/// Format a USD amount with two decimals and thousands separators, e.g. "$1,234.56".
pub fn format_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_negative() { "-" } else { "" };
    let plain = format!("{:.2}", rounded.abs().inner());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", sign, grouped, frac_part)
}

/// Loan variants handled by the repayment flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanKind {
    Standard,
    Legacy,
    Defaulted,
}

impl FromStr for LoanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(LoanKind::Standard),
            "legacy" => Ok(LoanKind::Legacy),
            "defaulted" => Ok(LoanKind::Defaulted),
            other => Err(format!("unknown loan kind: {}", other)),
        }
    }
}

/// On-chain loan timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub kind: LoanKind,
    /// Seconds since epoch.
    pub start_time: i64,
    /// Seconds.
    pub loan_period: i64,
}

impl Loan {
    pub fn new(kind: LoanKind, start_time: i64, loan_period: i64) -> Self {
        Self {
            kind,
            start_time,
            loan_period,
        }
    }

    pub fn due(&self) -> TimeMs {
        TimeMs::from_secs(self.start_time.saturating_add(self.loan_period))
    }

    /// Remaining time; a defaulted loan has none left regardless of its schedule.
    pub fn remaining(&self, now: TimeMs) -> RemainingTime {
        match self.kind {
            LoanKind::Defaulted => RemainingTime::elapsed(self.due()),
            LoanKind::Standard | LoanKind::Legacy => {
                compute_remaining_time(self.start_time, self.loan_period, now)
            }
        }
    }

    pub fn is_overdue(&self, now: TimeMs) -> bool {
        self.kind == LoanKind::Defaulted || self.due() <= now
    }
}
