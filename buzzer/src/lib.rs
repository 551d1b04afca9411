#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

use core::fmt::{Display, Formatter};

use embedded_hal::Pwm;
use fugit::HertzU32;
use num::rational::Ratio;

// A 16-bit timer reports a full-range period as zero max duty.
const FULL_RANGE_DUTY: u32 = 1 << 16;

/// Fourth octave, rounded to whole hertz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Note {
    C4,
    D4,
    E4,
    F4,
    G4,
    A4,
    B4,
}

impl Note {
    pub const fn frequency(self) -> HertzU32 {
        HertzU32::from_raw(match self {
            Note::C4 => 262,
            Note::D4 => 294,
            Note::E4 => 330,
            Note::F4 => 349,
            Note::G4 => 392,
            Note::A4 => 440,
            Note::B4 => 494,
        })
    }
}

/// Loudness as a fraction of the square wave period spent high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Volume {
    Low,
    Medium,
    High,
}

impl Volume {
    pub fn duty_cycle(self) -> Ratio<u32> {
        Ratio::new(
            match self {
                Volume::Low => 10,
                Volume::Medium => 20,
                Volume::High => 40,
            },
            100,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tone {
    pub note: Note,
    pub volume: Volume,
}

impl Display for Tone {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}@{:?}", self.note, self.volume)
    }
}

/// Piezo buzzer on one channel of a PWM timer. The timer period sets the
/// pitch, the duty cycle sets the volume.
pub struct Buzzer<PWM: Pwm> {
    pwm: PWM,
    channel: PWM::Channel,
    tone: Option<Tone>,
}

impl<PWM> Buzzer<PWM>
where
    PWM: Pwm<Duty = u16, Time = HertzU32>,
    PWM::Channel: Copy,
{
    pub fn new(mut pwm: PWM, channel: PWM::Channel) -> Self {
        pwm.set_duty(channel, 0);
        pwm.disable(channel);

        Buzzer {
            pwm,
            channel,
            tone: None,
        }
    }

    pub fn release(self) -> PWM {
        self.pwm
    }

    pub fn tone(&self) -> Option<Tone> {
        self.tone
    }

    fn calculate_duty(&self, volume: Volume) -> u16 {
        let max_duty = match self.pwm.get_max_duty() {
            0 => FULL_RANGE_DUTY,
            max_duty => max_duty as u32,
        };

        // Use u32 to avoid overflow
        let duty = Ratio::from_integer(max_duty) * volume.duty_cycle();

        // Volumes stay below 100%, so this fits.
        duty.to_integer() as u16
    }

    pub fn play(&mut self, note: Note, volume: Volume) {
        let tone = Tone { note, volume };
        if self.tone == Some(tone) {
            // Restarting the period would click.
            return;
        }

        // Period first, max duty depends on it.
        self.pwm.set_period(note.frequency());
        let duty = self.calculate_duty(volume);

        self.pwm.set_duty(self.channel, duty);
        self.pwm.enable(self.channel);
        self.tone = Some(tone);
    }

    pub fn off(&mut self) {
        self.pwm.disable(self.channel);
        self.pwm.set_duty(self.channel, 0);
        self.tone = None;
    }
}
