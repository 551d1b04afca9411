use crate::alerts;
use crate::error::Error;
use crate::event_queue::{Event, EventQueue, ExtEvent};
use crate::system_time::{Duration, Instant};

use core::cell::{RefCell, RefMut};
use proximity::Temperature;
use rtt_target::rprintln;
use stm32f1xx_hal::adc::Adc;
use stm32f1xx_hal::pac::ADC1;

const SAMPLE_PERIOD: Duration = Duration::secs(4);

struct StaticState {
    adc: RefCell<Option<Adc<ADC1>>>,
}

impl StaticState {
    const fn new() -> Self {
        Self {
            adc: RefCell::new(None),
        }
    }

    fn get(&self) -> RefMut<Option<Adc<ADC1>>> {
        self.adc.borrow_mut()
    }
}

// STATE is only accessed from the main thread via EventQueue.
// Therefore, no locking is necessary.
#[allow(unsafe_code)]
unsafe impl Sync for StaticState {}

static STATE: StaticState = StaticState::new();

static SAMPLE: Event = Event::new(&|event| sample(event).unwrap());

fn sample(event: &Event) -> Result<(), Error> {
    event.reschedule(SAMPLE_PERIOD);

    let celsius = STATE
        .get()
        .as_mut()
        .ok_or(Error::Uninitialized)?
        .read_temp();

    let temperature = Temperature::from_celsius(celsius);
    rprintln!("temperature {}", temperature);

    alerts::report_temperature(temperature)
}

pub fn start(
    event_queue: &mut EventQueue<'_, 'static, 'static>,
    adc: Adc<ADC1>,
    now: Instant,
) -> Result<(), Error> {
    event_queue.bind(&SAMPLE);

    *STATE.get() = Some(adc);

    // First reading right away, the display is blank until then.
    SAMPLE.call_at(now);

    Ok(())
}
