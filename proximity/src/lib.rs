#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

//! Presentation and alert policy for the proximity sensor: what the
//! readout shows, which LEDs light up, and what the buzzer plays.

mod alarm;
mod distance;
mod readout;

pub use crate::alarm::{Alarm, Leds, Mode, Sound, Status};
pub use crate::distance::{Distance, Temperature, Zone};
pub use crate::readout::{Digit, Readout};
