#![no_std]
#![deny(unsafe_code)]

use stm32f1xx_hal::gpio::{Alternate, Floating, Input, Output};
use stm32f1xx_hal::gpio::{PullDown, PushPull};
use stm32f1xx_hal::gpio::{PA0, PA6, PB0, PB1, PB5};
use stm32f1xx_hal::pac::TIM3;
use stm32f1xx_hal::timer::{Ch, PwmHz, Tim3NoRemap};

// Ranger signal line, TIM2_CH1. Trigger output and echo input share the pin.
pub type RangerTriggerPin = PA0<Alternate<PushPull>>;
pub type RangerEchoPin = PA0<Input<Floating>>;

pub type BuzzerPin = PA6<Alternate<PushPull>>;
pub type BuzzerPwm = PwmHz<TIM3, Tim3NoRemap, Ch<0>, BuzzerPin>;

pub type RedLed = PB0<Output<PushPull>>;
pub type GreenLed = PB1<Output<PushPull>>;
pub type Button = PB5<Input<PullDown>>;
