//! Total-experience estimate from free-text date ranges such as `"03/2019 - Present"`.
//!
//! The estimate is deliberately coarse:
//! - two or more date tokens: first is the start, second the end, reversed ranges count 0
//! - exactly one token: the entry counts as one year
//! - no token: the entry counts nothing
//!
//! `now` is always passed in so results are reproducible.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::portfolio::ExperienceItem;

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(\d{1,2})/(\d{4}))|(\d{4})|(present|current)").unwrap()
});

const SINGLE_TOKEN_MONTHS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateToken {
    /// Month index counted from year 0: `year * 12 + (month - 1)`.
    Month(i64),
    Now,
}

impl DateToken {
    fn month_index(self, now: NaiveDate) -> i64 {
        match self {
            DateToken::Month(index) => index,
            DateToken::Now => i64::from(now.year()) * 12 + i64::from(now.month0()),
        }
    }
}

fn tokens(period: &str) -> Vec<DateToken> {
    let mut found: Vec<DateToken> = DATE_TOKEN
        .captures_iter(period)
        .filter_map(|caps| {
            if let (Some(month), Some(year)) = (caps.get(1), caps.get(2)) {
                let month: i64 = month.as_str().parse().ok()?;
                let year: i64 = year.as_str().parse().ok()?;
                Some(DateToken::Month(year * 12 + month - 1))
            } else if let Some(year) = caps.get(3) {
                let year: i64 = year.as_str().parse().ok()?;
                Some(DateToken::Month(year * 12))
            } else {
                caps.get(4).map(|_| DateToken::Now)
            }
        })
        .collect();

    // "Present - 2020" has no usable start.
    let leading_now = found.iter().take_while(|t| **t == DateToken::Now).count();
    found.drain(..leading_now);
    found
}

fn entry_months(period: &str, now: NaiveDate) -> i64 {
    let found = tokens(period.trim());
    match found.as_slice() {
        [] => 0,
        [_] => SINGLE_TOKEN_MONTHS,
        [start, end, ..] => (end.month_index(now) - start.month_index(now)).max(0),
    }
}

/// Whole years of experience across every entry's `period`.
pub fn estimate_years(entries: &[ExperienceItem], now: NaiveDate) -> u32 {
    let total: i64 = entries
        .iter()
        .filter_map(|e| e.period.as_deref())
        .map(|p| entry_months(p, now))
        .sum();
    u32::try_from(total / 12).unwrap_or(u32::MAX)
}

/// `"1 year"`, `"N years"`, or `""` when the estimate is zero.
pub fn experience_summary(years: u32) -> String {
    match years {
        0 => String::new(),
        1 => "1 year".to_string(),
        n => format!("{n} years"),
    }
}
