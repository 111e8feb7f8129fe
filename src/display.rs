use crate::countdown::{format_countdown, urgency_tone, Countdown, Tick, Tone};
use chrono::NaiveDateTime;
use std::time::Duration;

pub const TICK_RATE: Duration = Duration::from_millis(100);
const CLOCK_FMT: &str = "%H:%M:%S";

/// Text and colour state of the panel, rebuilt on every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub clock: String,
    pub countdown: String,
    pub target: String,
    pub tone: Tone,
}

impl DisplayState {
    pub fn new(countdown: &Countdown, now: NaiveDateTime) -> Self {
        let mut state = Self {
            clock: now.format(CLOCK_FMT).to_string(),
            ..Self::default()
        };
        state.sync(countdown, now);
        state
    }

    /// One refresh. Returns `true` on the tick where the countdown finishes.
    pub fn refresh(&mut self, countdown: &mut Countdown, now: NaiveDateTime) -> bool {
        self.clock = now.format(CLOCK_FMT).to_string();
        self.target = countdown.format_target();

        match countdown.tick(now) {
            Tick::Counting(remaining) => {
                self.countdown = format_countdown(remaining);
                self.tone = urgency_tone(remaining);
                false
            }
            Tick::Finished => {
                self.countdown = format_countdown(Duration::ZERO);
                self.tone = Tone::Normal;
                true
            }
            // Frozen at zero until re-armed.
            Tick::Expired => false,
            Tick::Idle => {
                self.countdown = countdown.countdown_text(now);
                self.tone = Tone::Normal;
                false
            }
        }
    }

    /// Re-renders countdown and target right away, e.g. after a new target.
    pub fn sync(&mut self, countdown: &Countdown, now: NaiveDateTime) {
        self.countdown = countdown.countdown_text(now);
        self.target = countdown.format_target();
        self.tone = urgency_tone(countdown.remaining(now));
    }
}
