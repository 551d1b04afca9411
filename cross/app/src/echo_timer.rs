#![deny(unsafe_code)]

use crate::error::Error;

use board::{RangerEchoPin, RangerTriggerPin};
use cortex_m::peripheral::NVIC;
use ranger::{CaptureTimer, Ticks};
use stm32f1xx_hal::gpio::Cr;
use stm32f1xx_hal::pac::{Interrupt, TIM2};
use stm32f1xx_hal::rcc::Clocks;
use stm32f1xx_hal::timer::Timer;

/// Counter clock of the echo timer, one tick per microsecond.
pub const ECHO_TIMER_HZ: u32 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Off,
    Pulse,
    // Next acknowledge belongs to the pulse that just ended.
    CaptureArming,
    Capturing,
}

// Status flags retired by one write to SR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flags {
    Capture,
    Update,
    All,
}

enum SignalPin {
    Trigger(RangerTriggerPin),
    Echo(RangerEchoPin),
    Switching,
}

/// TIM2 channel 1 on PA0. Emits the trigger as a one-pulse PWM, then
/// captures both echo edges on the same pin.
pub struct EchoTimer {
    tim: TIM2,
    pin: SignalPin,
    crl: Cr<'A', false>,
    mode: Mode,
}

impl EchoTimer {
    pub fn new(
        tim: TIM2,
        pin: RangerEchoPin,
        crl: Cr<'A', false>,
        clocks: &Clocks,
    ) -> Result<Self, Error> {
        let timer_clock = clocks.pclk1_tim().raw();
        if timer_clock % ECHO_TIMER_HZ != 0 {
            return Err(Error::InvalidClock);
        }
        let prescaler = u16::try_from(timer_clock / ECHO_TIMER_HZ - 1)
            .map_err(|_| Error::InvalidClock)?;

        // Powers up and resets the peripheral.
        let tim = Timer::new(tim, clocks).release();

        tim.cr1.modify(|_, w| w.cen().disabled());
        tim.psc.write(|w| w.psc().bits(prescaler));
        // Prescaler is buffered, load it now.
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.modify(|_, w| w.uif().clear_bit());

        Ok(EchoTimer {
            tim,
            pin: SignalPin::Echo(pin),
            crl,
            mode: Mode::Off,
        })
    }

    fn stop(&mut self) {
        self.tim.cr1.modify(|_, w| w.cen().disabled());
        self.tim.ccer.modify(|_, w| w.cc1e().clear_bit());
    }

    // SR flags clear on writing 0 and ignore a written 1, so a plain write
    // never drops a flag raised after it was last read.
    fn clear_flags(&mut self, flags: Flags) {
        let capture = flags != Flags::Update;
        let update = flags != Flags::Capture;

        self.tim.sr.write(|w| {
            w.cc1if().bit(!capture);
            w.cc1of().bit(!capture);
            w.uif().bit(!update)
        });
    }

    fn pin_as_trigger(&mut self) {
        self.pin = match core::mem::replace(&mut self.pin, SignalPin::Switching) {
            SignalPin::Echo(pin) => SignalPin::Trigger(pin.into_alternate_push_pull(&mut self.crl)),
            pin => pin,
        };
    }

    fn pin_as_echo(&mut self) {
        self.pin = match core::mem::replace(&mut self.pin, SignalPin::Switching) {
            SignalPin::Trigger(pin) => SignalPin::Echo(pin.into_floating_input(&mut self.crl)),
            pin => pin,
        };
    }
}

impl CaptureTimer for EchoTimer {
    const MAX_TICK: Ticks = 0xFFFF;

    // PWM mode 2 keeps the output low until CCR1 matches, then high until
    // the update event. One-pulse mode stops the counter there. CC1IF marks
    // the rising edge, UIF the falling one.
    fn configure_as_pulse(&mut self, period: Ticks, pulse_width: Ticks) {
        debug_assert!(pulse_width > 0 && pulse_width < period);
        debug_assert!(period <= Self::MAX_TICK);

        self.stop();
        self.pin_as_trigger();

        let tim = &self.tim;
        tim.ccmr1_output()
            .modify(|_, w| w.cc1s().output().oc1pe().disabled().oc1m().pwm_mode2());
        tim.ccer.modify(|_, w| w.cc1p().clear_bit());
        tim.arr.write(|w| w.arr().bits((period - 1) as u16));
        tim.ccr[0].write(|w| w.ccr().bits((period - pulse_width) as u16));
        tim.cnt.reset();
        tim.cr1.modify(|_, w| w.opm().enabled());
        tim.dier.modify(|_, w| w.cc1ie().enabled().uie().enabled());

        self.clear_flags(Flags::All);
        // A capture latched while the caller held the critical section must
        // not reach the handler as a trigger edge.
        NVIC::unpend(Interrupt::TIM2);
        self.mode = Mode::Pulse;

        self.tim.ccer.modify(|_, w| w.cc1e().set_bit());
        self.tim.cr1.modify(|_, w| w.cen().enabled());
    }

    fn configure_as_capture(&mut self) {
        self.stop();
        self.pin_as_echo();

        let tim = &self.tim;
        tim.cr1.modify(|_, w| w.opm().disabled());
        tim.dier.modify(|_, w| w.uie().disabled().cc1ie().enabled());
        tim.ccmr1_input().modify(|_, w| w.cc1s().ti1());
        // Rising edge first. F1 timers capture one polarity at a time.
        tim.ccer.modify(|_, w| w.cc1p().clear_bit());
        tim.arr.write(|w| w.arr().bits(Self::MAX_TICK as u16));
        tim.cnt.reset();

        // The update flag of the finished pulse is still pending. Leave it
        // for the acknowledge that follows this call.
        self.mode = Mode::CaptureArming;

        self.tim.ccer.modify(|_, w| w.cc1e().set_bit());
        self.tim.cr1.modify(|_, w| w.cen().enabled());
    }

    fn current_counter_value(&self) -> Ticks {
        debug_assert!(self.mode == Mode::Capturing);
        self.tim.ccr[0].read().ccr().bits() as Ticks
    }

    fn acknowledge_notification(&mut self) {
        let flags = match self.mode {
            // Rise before fall. When the handler runs late both are set, UIF
            // stays pending and brings us back for the fall.
            Mode::Pulse => {
                if self.tim.sr.read().cc1if().bit_is_set() {
                    Flags::Capture
                } else {
                    Flags::Update
                }
            }
            Mode::CaptureArming => {
                self.mode = Mode::Capturing;
                Flags::Update
            }
            Mode::Capturing => {
                // Reading CCR1 already cleared CC1IF, flip on every edge.
                self.tim.ccer.modify(|r, w| w.cc1p().bit(!r.cc1p().bit()));
                Flags::Capture
            }
            Mode::Off => Flags::All,
        };

        self.clear_flags(flags);
    }

    fn listen(&mut self) {
        self.clear_flags(Flags::All);
        self.tim.dier.modify(|_, w| w.cc1ie().enabled());

        #[allow(unsafe_code)]
        // Handler only touches the ranger through its critical section.
        unsafe {
            NVIC::unmask(Interrupt::TIM2);
        }
    }
}
