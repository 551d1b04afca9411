#![deny(unsafe_code)]

use crate::echo_timer::EchoTimer;
use crate::error::Error;
use crate::system_time::Ticker;

use board::{BuzzerPin, BuzzerPwm, Button, GreenLed, RangerEchoPin, RedLed};
use rtt_target::rprintln;
use stm32f1xx_hal::adc::Adc;
use stm32f1xx_hal::device::ADC1;
use stm32f1xx_hal::pac;
use stm32f1xx_hal::prelude::*;
use stm32f1xx_hal::time::Hertz;

// Retuned per note by the buzzer, this only sets the initial period.
const BUZZER_FREQ: Hertz = Hertz::Hz(1000);

pub struct Board {
    pub ticker: Ticker,
    pub echo_timer: EchoTimer,
    pub buzzer_pwm: BuzzerPwm,
    pub red_led: RedLed,
    pub green_led: GreenLed,
    pub button: Button,
    pub adc: Adc<ADC1>,
}

impl Board {
    pub fn new(cp: pac::CorePeripherals, dp: pac::Peripherals) -> Result<Self, Error> {
        // Enable debug while sleeping to keep probe-rs happy while WFI
        dp.DBGMCU.cr.modify(|_, w| {
            w.dbg_sleep().set_bit();
            w.dbg_standby().set_bit();
            w.dbg_stop().set_bit()
        });

        // Configure the clock.
        let mut flash = dp.FLASH.constrain();
        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr.sysclk(64.MHz()).freeze(&mut flash.acr);
        rprintln!(
            "sysclk {} Hz, timer clock {} Hz",
            clocks.sysclk().raw(),
            clocks.pclk1_tim().raw()
        );

        let mut afio = dp.AFIO.constrain();

        // Acquire the GPIO peripherals.
        let mut gpioa = dp.GPIOA.split();
        let mut gpiob = dp.GPIOB.split();

        // Only the internal temperature channel is used.
        let adc = Adc::adc1(dp.ADC1, clocks);

        let red_led = gpiob.pb0.into_push_pull_output(&mut gpiob.crl);
        let green_led = gpiob.pb1.into_push_pull_output(&mut gpiob.crl);
        let button = gpiob.pb5.into_pull_down_input(&mut gpiob.crl);

        let buzzer_pin: BuzzerPin = gpioa.pa6.into_alternate_push_pull(&mut gpioa.crl);
        let buzzer_pwm = dp
            .TIM3
            .pwm_hz(buzzer_pin, &mut afio.mapr, BUZZER_FREQ, &clocks);

        // The echo timer reconfigures PA0 on every cycle and keeps CRL for that.
        let echo_pin: RangerEchoPin = gpioa.pa0.into_floating_input(&mut gpioa.crl);
        let echo_timer = EchoTimer::new(dp.TIM2, echo_pin, gpioa.crl, &clocks)?;

        let ticker = Ticker::new(cp.SYST, &clocks);

        Ok(Board {
            ticker,
            echo_timer,
            buzzer_pwm,
            red_led,
            green_led,
            button,
            adc,
        })
    }
}
