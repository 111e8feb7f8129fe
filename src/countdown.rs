//! Countdown arithmetic: target time-of-day parsing, remaining time,
//! formatting and the last-ten-seconds urgency policy.
//!
//! Every operation takes the current local wall-clock time as an argument so
//! that nothing in here reads a clock on its own.

use crate::error::FormatError;
use chrono::{Days, NaiveDateTime, NaiveTime, Timelike};
use serde::{Serialize, Serializer};
use std::{fmt, time::Duration};

/// Target used until the user picks one (or one is restored from disk).
pub const DEFAULT_TARGET: TimeOfDay = TimeOfDay { hour: 11, minute: 29, second: 0 };
pub const URGENCY_WINDOW: Duration = Duration::from_secs(10);
const BLINK_HALF_PERIOD_NANOS: u128 = 500_000_000;
/// Shown when no target exists. Only ever non-zero for a plain seconds counter.
const FALLBACK_SECS: u64 = 0;

// ============================================================================
// Time of day
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
    second: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second)?;
        Some(Self { hour, minute, second })
    }

    /// Parses `HH:MM` or `HH:MM:SS` (24-hour) as typed into the target dialog.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        Self::parse_parts(text, &[2, 3])
    }

    /// Parses the strict `HH:MM:SS` form written to the config file.
    pub fn parse_persisted(text: &str) -> Result<Self, FormatError> {
        Self::parse_parts(text, &[3])
    }

    fn parse_parts(text: &str, allowed: &[usize]) -> Result<Self, FormatError> {
        let err = || FormatError::new(text);
        let parts = text
            .trim()
            .split(':')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| err())?;

        if !allowed.contains(&parts.len()) {
            return Err(err());
        }

        let second = parts.get(2).copied().unwrap_or(0);
        Self::new(parts[0], parts[1], second).ok_or_else(err)
    }

    fn as_naive(self) -> NaiveTime {
        // Components were range-checked in `new`.
        NaiveTime::from_hms_opt(self.hour, self.minute, self.second).unwrap_or_default()
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(t: NaiveTime) -> Self {
        Self { hour: t.hour(), minute: t.minute(), second: t.second() }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Today at `time`, or tomorrow if that moment is not strictly after `now`.
pub fn next_occurrence(time: TimeOfDay, now: NaiveDateTime) -> NaiveDateTime {
    let candidate = now.date().and_time(time.as_naive());
    if candidate <= now {
        candidate + Days::new(1)
    } else {
        candidate
    }
}

// ============================================================================
// Formatting & urgency
// ============================================================================

/// `HH:MM:SS.mmm` over whole milliseconds. Hours are not wrapped at 24.
pub fn format_countdown(remaining: Duration) -> String {
    let total_ms = remaining.as_millis();
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

fn format_fallback(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}.000", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Normal,
    Alert,
}

/// Blinks during the last ten seconds: `floor(r * 2) mod 2 == 0` is the alert
/// half of each second.
pub fn urgency_tone(remaining: Duration) -> Tone {
    if remaining.is_zero() || remaining > URGENCY_WINDOW {
        return Tone::Normal;
    }
    if (remaining.as_nanos() / BLINK_HALF_PERIOD_NANOS) % 2 == 0 {
        Tone::Alert
    } else {
        Tone::Normal
    }
}

// ============================================================================
// Countdown
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// No target set.
    Idle,
    Counting(Duration),
    /// Remaining time reached zero on this tick. Reported once per target.
    Finished,
    /// Already finished; nothing left to update until a new target is set.
    Expired,
}

#[derive(Clone, Debug, Default)]
pub struct Countdown {
    target: Option<NaiveDateTime>,
    expired: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize_default(&mut self, now: NaiveDateTime) {
        self.arm(DEFAULT_TARGET, now);
    }

    pub fn arm(&mut self, time: TimeOfDay, now: NaiveDateTime) -> NaiveDateTime {
        let target = next_occurrence(time, now);
        self.target = Some(target);
        self.expired = false;
        target
    }

    /// Parses `text` and re-arms the countdown. Leaves the current target
    /// alone when the text is rejected.
    pub fn set_target(&mut self, text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, FormatError> {
        let time = TimeOfDay::parse(text)?;
        Ok(self.arm(time, now))
    }

    pub fn target(&self) -> Option<NaiveDateTime> {
        self.target
    }

    pub fn target_time(&self) -> Option<TimeOfDay> {
        self.target.map(|t| t.time().into())
    }

    pub fn remaining(&self, now: NaiveDateTime) -> Duration {
        self.target
            .and_then(|target| (target - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    pub fn countdown_text(&self, now: NaiveDateTime) -> String {
        if self.target.is_some() {
            format_countdown(self.remaining(now))
        } else {
            format_fallback(FALLBACK_SECS)
        }
    }

    pub fn format_target(&self) -> String {
        self.target_time().map(|t| t.to_string()).unwrap_or_default()
    }

    /// Advances the expiry state machine for one refresh.
    pub fn tick(&mut self, now: NaiveDateTime) -> Tick {
        if self.target.is_none() {
            return Tick::Idle;
        }
        if self.expired {
            return Tick::Expired;
        }

        let remaining = self.remaining(now);
        if remaining.is_zero() {
            self.expired = true;
            Tick::Finished
        } else {
            Tick::Counting(remaining)
        }
    }
}
