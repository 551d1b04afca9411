use core::fmt::{Display, Formatter};

/// Speed of sound in dry air at 20 °C, mm/s.
pub const SPEED_OF_SOUND: u32 = 343_000;

const MM_PER_INCH_X10: u32 = 254;

const CLEAR_DISTANCE_INCHES: u32 = 5 * 12;
const CAUTION_DISTANCE_INCHES: u32 = 2 * 12;

const HEAT_ALERT_TENTHS_F: i32 = 900;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance {
    mm: u32,
}

impl Distance {
    pub const fn from_mm(mm: u32) -> Self {
        Distance { mm }
    }

    /// Distance to the target for a round trip echo of `ticks` counter
    /// ticks at `tick_hz`.
    pub fn from_echo(ticks: u32, tick_hz: u32) -> Self {
        // Use u64 to avoid overflow
        let mm = ticks as u64 * SPEED_OF_SOUND as u64 / (2 * tick_hz as u64);

        Distance {
            mm: mm.min(u32::MAX as u64) as u32,
        }
    }

    pub const fn mm(self) -> u32 {
        self.mm
    }

    pub const fn inches(self) -> u32 {
        (self.mm as u64 * 10 / MM_PER_INCH_X10 as u64) as u32
    }

    pub const fn feet_and_inches(self) -> (u32, u32) {
        let inches = self.inches();
        (inches / 12, inches % 12)
    }
}

impl Display for Distance {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let (feet, inches) = self.feet_and_inches();
        write!(f, "{} mm ({}'{}\")", self.mm, feet, inches)
    }
}

/// Distance bands driving the LEDs and the buzzer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    /// 5 ft and beyond.
    Clear,
    /// 2 to 5 ft.
    Caution,
    /// Under 2 ft.
    Danger,
}

impl Zone {
    pub const fn from_distance(distance: Distance) -> Self {
        let inches = distance.inches();

        if inches >= CLEAR_DISTANCE_INCHES {
            Zone::Clear
        } else if inches >= CAUTION_DISTANCE_INCHES {
            Zone::Caution
        } else {
            Zone::Danger
        }
    }
}

impl Display for Zone {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.pad(match *self {
            Zone::Clear => "clear",
            Zone::Caution => "caution",
            Zone::Danger => "danger",
        })
    }
}

/// Temperature in tenths of a degree Fahrenheit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temperature {
    tenths_f: i32,
}

impl Temperature {
    pub const fn from_tenths_f(tenths_f: i32) -> Self {
        Temperature { tenths_f }
    }

    pub const fn from_celsius(celsius: i32) -> Self {
        Temperature {
            tenths_f: celsius * 18 + 320,
        }
    }

    pub const fn tenths_f(self) -> i32 {
        self.tenths_f
    }

    pub const fn is_hot(self) -> bool {
        self.tenths_f >= HEAT_ALERT_TENTHS_F
    }
}

impl Display for Temperature {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let sign = if self.tenths_f < 0 { "-" } else { "" };
        let abs = self.tenths_f.unsigned_abs();
        write!(f, "{}{}.{} F", sign, abs / 10, abs % 10)
    }
}
