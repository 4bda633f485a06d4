// SPDX-License-Identifier: MIT OR Apache-2.0

//! Medication reminder records.
//!
//! Builds a reminder from user-entered fields and hands it to presentation
//! layers as JSON, so times never get spliced into markup or scripts as raw
//! strings.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// A time of day parsed from entries like `8am`, `2pm` or `7:30pm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderTime {
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
}

impl ReminderTime {
    /// Parses a 12-hour clock entry (`12am` is midnight, `12pm` noon).
    pub fn parse(input: &str) -> Result<Self> {
        let caps = time_pattern()
            .captures(input.trim())
            .with_context(|| format!("Invalid reminder time '{}'", input.trim()))?;

        let hour: u8 = caps[1]
            .parse()
            .with_context(|| format!("Invalid hour in '{}'", input.trim()))?;
        let minute: u8 = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse()
                .with_context(|| format!("Invalid minute in '{}'", input.trim()))?,
            None => 0,
        };
        if !(1..=12).contains(&hour) || minute > 59 {
            bail!("Reminder time '{}' is out of range", input.trim());
        }

        let pm = caps[3].eq_ignore_ascii_case("pm");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        Ok(Self { hour, minute })
    }

    /// 24-hour `HH:MM`.
    pub fn display_24h(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// A reminder to take `dose` of `medicine` at each of `reminder_times`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub medicine: String,
    pub dose: String,
    pub frequency: String,
    /// Entries as the user wrote them, trimmed
    pub reminder_times: Vec<String>,
    /// Parsed entries, same order
    pub schedule: Vec<ReminderTime>,
}

impl Reminder {
    /// Builds a reminder; `times` is a comma-separated list such as `8am,2pm,8pm`.
    pub fn new(medicine: &str, dose: &str, frequency: &str, times: &str) -> Result<Self> {
        let medicine = medicine.trim();
        let dose = dose.trim();
        if medicine.is_empty() {
            bail!("Medicine name is required");
        }
        if dose.is_empty() {
            bail!("Dose is required");
        }

        let reminder_times: Vec<String> = times
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if reminder_times.is_empty() {
            bail!("At least one reminder time is required");
        }
        let schedule = reminder_times
            .iter()
            .map(|t| ReminderTime::parse(t))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            medicine: medicine.to_string(),
            dose: dose.to_string(),
            frequency: frequency.trim().to_string(),
            reminder_times,
            schedule,
        })
    }

    /// JSON encoding for presentation layers.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize reminder")
    }
}

fn time_pattern() -> &'static Regex {
    static TIME: OnceLock<Regex> = OnceLock::new();
    TIME.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*(am|pm)$").expect("valid time regex")
    })
}
