use crate::alerts;
use crate::echo_timer::{EchoTimer, ECHO_TIMER_HZ};
use crate::error::Error;
use crate::event_queue::{Event, EventQueue, ExtEvent};
use crate::system_time::{Duration, Instant};

use proximity::Distance;
use ranger::{Config, Phase, Ranger, SharedRanger};
use rtt_target::rprintln;
use stm32f1xx_hal::pac::interrupt;

const MEASUREMENT_PERIOD: Duration = Duration::millis(500);
const FIRST_MEASUREMENT_DELAY: Duration = Duration::millis(100);

static RANGER: SharedRanger<'static, EchoTimer> = SharedRanger::new();

static TRIGGER: Event = Event::new(&|event| trigger(event).unwrap());
static ECHO_READY: Event = Event::new(&|_| echo_ready().unwrap());

fn trigger(event: &Event) -> Result<(), Error> {
    event.reschedule(MEASUREMENT_PERIOD);

    let faults = RANGER.take_faults()?;
    if !faults.is_clear() {
        rprintln!("ranger faults {:?}", faults);
    }

    let phase = RANGER.phase()?;
    if phase != Phase::Idle {
        rprintln!("no echo, stuck in {}", phase);
    }

    RANGER.start_measurement()?;

    Ok(())
}

fn echo_ready() -> Result<(), Error> {
    // Next cycle may have started before we got here.
    if !RANGER.is_result_ready()? {
        return Ok(());
    }

    let ticks = RANGER.read_pulse_width()?;
    let distance = Distance::from_echo(ticks, ECHO_TIMER_HZ);
    rprintln!("echo {} us, {}", ticks, distance);

    alerts::report_distance(distance)
}

pub fn start(
    event_queue: &mut EventQueue<'_, 'static, 'static>,
    echo_timer: EchoTimer,
    now: Instant,
) -> Result<(), Error> {
    event_queue.bind(&TRIGGER);
    event_queue.bind(&ECHO_READY);

    RANGER.init(Ranger::new(echo_timer, Config::DEFAULT));
    RANGER.register_ready_callback(&ECHO_READY)?;

    TRIGGER.call_at(now + FIRST_MEASUREMENT_DELAY);

    Ok(())
}

#[interrupt]
fn TIM2() {
    RANGER.on_edge();
}
