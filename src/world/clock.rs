//! World clock: subticks, play time and the in-game day cycle.
//!
//! One real second is one in-game minute, so a day lasts 24 real minutes.

pub const SUBTICKS_PER_SECOND: u32 = 60;
pub const MINUTES_PER_DAY: i64 = 24 * 60;
/// New worlds start at 08:00 on day 1
pub const START_TIME: i64 = 8 * 60;

const DAWN_START: i64 = 5 * 60;
const DAWN_END: i64 = 7 * 60;
const DUSK_START: i64 = 18 * 60;
const DUSK_END: i64 = 20 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPhase {
    Night,
    Dawn,
    Morning,
    Afternoon,
    Dusk,
}

impl DayPhase {
    fn at(minute_of_day: i64) -> Self {
        match minute_of_day {
            m if m < DAWN_START => DayPhase::Night,
            m if m < DAWN_END => DayPhase::Dawn,
            m if m < 12 * 60 => DayPhase::Morning,
            m if m < DUSK_START => DayPhase::Afternoon,
            m if m < DUSK_END => DayPhase::Dusk,
            _ => DayPhase::Night,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorldClock {
    subticks: u32,
    /// Clock seconds since the world began
    time: i64,
    /// Real seconds played
    play_time: i64,
    use_24h: bool,
    day: i64,
    clock_text: String,
    phase: DayPhase,
}

impl WorldClock {
    pub fn new(time: i64, play_time: i64, use_24h: bool) -> Self {
        let mut clock = Self {
            subticks: 0,
            time,
            play_time,
            use_24h,
            day: 0,
            clock_text: String::new(),
            phase: DayPhase::Night,
        };
        clock.refresh();
        clock
    }

    /// Advance one subtick. Returns true when a whole second elapsed.
    pub fn tick(&mut self) -> bool {
        self.subticks += 1;
        if self.subticks < SUBTICKS_PER_SECOND {
            return false;
        }
        self.subticks = 0;
        self.time += 1;
        self.play_time += 1;
        self.refresh();
        true
    }

    fn refresh(&mut self) {
        let minute = self.minute_of_day();
        self.day = self.time.div_euclid(MINUTES_PER_DAY) + 1;
        self.phase = DayPhase::at(minute);
        self.clock_text = format_clock(minute, self.use_24h);
    }

    pub fn set_24h(&mut self, use_24h: bool) {
        self.use_24h = use_24h;
        self.refresh();
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn play_time(&self) -> i64 {
        self.play_time
    }

    pub fn subticks(&self) -> u32 {
        self.subticks
    }

    pub fn minute_of_day(&self) -> i64 {
        self.time.rem_euclid(MINUTES_PER_DAY)
    }

    /// Day number, starting at 1
    pub fn day(&self) -> i64 {
        self.day
    }

    pub fn clock_text(&self) -> &str {
        &self.clock_text
    }

    pub fn phase(&self) -> DayPhase {
        self.phase
    }

    /// Daylight in 0..=1: dark at night, ramping up through dawn and down through dusk
    pub fn day_factor(&self) -> f32 {
        let minute = self.minute_of_day();
        let ramp = |from: i64, to: i64| (minute - from) as f32 / (to - from) as f32;
        match minute {
            m if m < DAWN_START => 0.0,
            m if m < DAWN_END => ramp(DAWN_START, DAWN_END),
            m if m < DUSK_START => 1.0,
            m if m < DUSK_END => 1.0 - ramp(DUSK_START, DUSK_END),
            _ => 0.0,
        }
    }
}

impl Default for WorldClock {
    fn default() -> Self {
        Self::new(START_TIME, 0, false)
    }
}

/// `h:MM AM` or `HH:MM`
pub fn format_clock(minute_of_day: i64, use_24h: bool) -> String {
    let hour = minute_of_day / 60;
    let minute = minute_of_day % 60;
    if use_24h {
        format!("{:02}:{:02}", hour, minute)
    } else {
        let suffix = if hour < 12 { "AM" } else { "PM" };
        let hour12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", hour12, minute, suffix)
    }
}
