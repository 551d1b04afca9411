use crate::{Temperature, Zone};
use buzzer::{Note, Volume};
use core::fmt::{Display, Formatter};

const ALERT_NOTE: Note = Note::G4;

/// What the device is presenting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Distance,
    Heat,
}

impl Mode {
    pub const fn toggle(self) -> Self {
        match self {
            Mode::Distance => Mode::Heat,
            Mode::Heat => Mode::Distance,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.pad(match *self {
            Mode::Distance => "distance",
            Mode::Heat => "heat",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Leds {
    pub red: bool,
    pub green: bool,
}

/// Latest readings plus the selected mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Status {
    pub mode: Mode,
    /// None until the first echo arrives.
    pub zone: Option<Zone>,
    pub temperature: Option<Temperature>,
}

impl Status {
    pub const fn new() -> Self {
        Status {
            mode: Mode::Distance,
            zone: None,
            temperature: None,
        }
    }

    pub fn is_hot(&self) -> bool {
        self.temperature.map_or(false, Temperature::is_hot)
    }

    pub fn leds(&self) -> Leds {
        match self.mode {
            Mode::Distance => match self.zone {
                None => Leds::default(),
                Some(Zone::Clear) => Leds {
                    red: false,
                    green: true,
                },
                Some(Zone::Caution) => Leds {
                    red: true,
                    green: true,
                },
                Some(Zone::Danger) => Leds {
                    red: true,
                    green: false,
                },
            },
            Mode::Heat => Leds {
                red: self.is_hot(),
                green: !self.is_hot(),
            },
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sound {
    Off,
    Play(Note, Volume),
}

/// Buzzer pattern, stepped on a fixed period. Caution beeps on every
/// other step, danger and heat hold a loud tone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Alarm {
    beeping: bool,
}

impl Alarm {
    pub const fn new() -> Self {
        Alarm { beeping: false }
    }

    pub fn step(&mut self, status: &Status) -> Sound {
        let loud = Sound::Play(ALERT_NOTE, Volume::High);

        match status.mode {
            Mode::Distance => match status.zone {
                Some(Zone::Danger) => {
                    self.beeping = true;
                    loud
                }
                Some(Zone::Caution) => {
                    let sound = if self.beeping {
                        Sound::Off
                    } else {
                        Sound::Play(ALERT_NOTE, Volume::Low)
                    };
                    self.beeping = !self.beeping;
                    sound
                }
                Some(Zone::Clear) | None => {
                    self.beeping = false;
                    Sound::Off
                }
            },
            Mode::Heat => {
                if status.is_hot() {
                    loud
                } else {
                    Sound::Off
                }
            }
        }
    }
}
