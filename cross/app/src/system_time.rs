#![deny(unsafe_code)]

use core::cell::Cell;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use cortex_m_rt::exception;
use critical_section::Mutex;
use stm32f1xx_hal::rcc::Clocks;

pub use event_queue::{Duration, Instant};

const TICK_HZ: u32 = 1_000;

static TICKS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

pub struct Ticker {
    syst: SYST,
}

impl Ticker {
    // Setup SysTick to tick at 1 kHz, one tick per event queue millisecond
    pub fn new(mut syst: SYST, clocks: &Clocks) -> Self {
        let reload = clocks.sysclk().raw() / TICK_HZ - 1;
        assert!(reload > 0 && reload < 0x0100_0000);

        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(reload);
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();

        Ticker { syst }
    }

    // Stop SysTick and release it
    #[allow(dead_code)]
    pub fn free(mut self) -> SYST {
        self.syst.disable_interrupt();
        self.syst.disable_counter();
        self.syst
    }

    // Get current tick count
    pub fn get_ticks(&self) -> u32 {
        critical_section::with(|cs| TICKS.borrow(cs).get())
    }

    // Get timestamp
    pub fn now(&self) -> Instant {
        Instant::from_ticks(self.get_ticks())
    }
}

#[exception]
fn SysTick() {
    critical_section::with(|cs| {
        let ticks = TICKS.borrow(cs).get();
        TICKS.borrow(cs).set(ticks.wrapping_add(1));
    });
}
