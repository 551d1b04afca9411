#![deny(unsafe_code)]
#![no_std]
#![no_main]

mod alerts;
mod board;
mod button;
mod echo_timer;
mod error;
mod event_queue;
mod ranging;
mod system_time;
mod temperature;

use panic_probe as _;
// use panic_halt as _;

use crate::board::Board;
use crate::event_queue::EventQueue;

use cortex_m_rt::entry;
use rtt_target::rprintln;
use rtt_target::rtt_init_print;
use stm32f1xx_hal::pac;

#[entry]
fn main() -> ! {
    rtt_init_print!();

    let cp = pac::CorePeripherals::take().unwrap();
    let dp = pac::Peripherals::take().unwrap();

    let board = Board::new(cp, dp).unwrap();
    let ticker = board.ticker;
    let mut event_queue = EventQueue::new(&ticker);
    let now = ticker.now();

    // Alerts first, the other tasks report into it.
    alerts::start(
        &mut event_queue,
        board.buzzer_pwm,
        board.red_led,
        board.green_led,
        now,
    )
    .unwrap();
    ranging::start(&mut event_queue, board.echo_timer, now).unwrap();
    temperature::start(&mut event_queue, board.adc, now).unwrap();
    button::start(&mut event_queue, board.button, now).unwrap();

    rprintln!("sonar-alert started");

    event_queue.run_forever();
}
