use crate::{Distance, Temperature};
use core::fmt::{Display, Formatter, Write};

const MAX_FEET: u32 = 99;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Digit {
    Blank,
    Value(u8),
}

impl Digit {
    const fn of(value: u32) -> Self {
        Digit::Value((value % 10) as u8)
    }
}

/// Four-digit seven-segment readout with a center colon.
/// Digit 0 is the rightmost one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Readout {
    digits: [Digit; 4],
    colon: bool,
}

impl Readout {
    pub const fn blank() -> Self {
        Readout {
            digits: [Digit::Blank; 4],
            colon: false,
        }
    }

    /// Feet left of the colon, inches right of it. Leading zeros are
    /// blanked, inches are zero padded once there is a feet value.
    pub fn distance(distance: Distance) -> Self {
        let (feet, inches) = distance.feet_and_inches();
        let feet = feet.min(MAX_FEET);

        let (feet_tens, feet_ones) = match feet {
            0 => (Digit::Blank, Digit::Blank),
            1..=9 => (Digit::Blank, Digit::of(feet)),
            _ => (Digit::of(feet / 10), Digit::of(feet)),
        };

        let inches_tens = if inches >= 10 {
            Digit::of(inches / 10)
        } else if feet == 0 {
            Digit::Blank
        } else {
            Digit::Value(0)
        };

        Readout {
            digits: [Digit::of(inches), inches_tens, feet_ones, feet_tens],
            colon: true,
        }
    }

    /// Whole degrees left of the colon, tenths in digit 1, digit 0 unused.
    /// Below freezing the sign is dropped.
    pub fn temperature(temperature: Temperature) -> Self {
        let tenths = temperature.tenths_f().unsigned_abs();
        let whole = tenths / 10;

        Readout {
            digits: [
                Digit::Blank,
                Digit::of(tenths),
                Digit::of(whole),
                Digit::of(whole / 10),
            ],
            colon: true,
        }
    }

    pub fn digits(&self) -> [Digit; 4] {
        self.digits
    }

    pub fn colon(&self) -> bool {
        self.colon
    }
}

impl Default for Readout {
    fn default() -> Self {
        Self::blank()
    }
}

// Rendered left to right as the display shows it, e.g. " 5:07".
impl Display for Readout {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        for (index, digit) in self.digits.iter().enumerate().rev() {
            match *digit {
                Digit::Blank => f.write_char(' ')?,
                Digit::Value(value) => f.write_char((b'0' + value) as char)?,
            }

            if index == 2 {
                f.write_char(if self.colon { ':' } else { ' ' })?;
            }
        }

        Ok(())
    }
}
