use crate::error::Error;
use crate::event_queue::{Event, EventQueue, ExtEvent};
use crate::system_time::{Duration, Instant};

use board::{BuzzerPwm, GreenLed, RedLed};
use buzzer::Buzzer;
use core::cell::{RefCell, RefMut};
use proximity::{Alarm, Distance, Mode, Readout, Sound, Status, Temperature, Zone};
use rtt_target::rprintln;
use stm32f1xx_hal::gpio::PinState;
use stm32f1xx_hal::timer::Channel;

const ALARM_PERIOD: Duration = Duration::millis(500);

struct Alerts {
    status: Status,
    distance: Option<Distance>,
    alarm: Alarm,
    buzzer: Buzzer<BuzzerPwm>,
    red_led: RedLed,
    green_led: GreenLed,
    readout: Readout,
}

impl Alerts {
    fn report_distance(&mut self, distance: Distance) {
        let zone = Zone::from_distance(distance);
        if self.status.zone != Some(zone) {
            rprintln!("zone {}", zone);
        }

        self.distance = Some(distance);
        self.status.zone = Some(zone);
        self.refresh();
    }

    fn report_temperature(&mut self, temperature: Temperature) {
        if temperature.is_hot() && !self.status.is_hot() {
            rprintln!("heat alert at {}", temperature);
        }

        self.status.temperature = Some(temperature);
        self.refresh();
    }

    fn toggle_mode(&mut self) {
        self.status.mode = self.status.mode.toggle();
        rprintln!("mode {}", self.status.mode);
        self.refresh();
    }

    // Redraw LEDs and the readout from the current status.
    fn refresh(&mut self) {
        let leds = self.status.leds();
        self.red_led.set_state(pin_state(leds.red));
        self.green_led.set_state(pin_state(leds.green));

        let readout = match self.status.mode {
            Mode::Distance => self.distance.map(Readout::distance),
            Mode::Heat => self.status.temperature.map(Readout::temperature),
        }
        .unwrap_or_default();

        if readout != self.readout {
            rprintln!("display [{}]", readout);
            self.readout = readout;
        }
    }

    fn sound(&mut self) {
        let previous = self.buzzer.tone();

        match self.alarm.step(&self.status) {
            Sound::Off => self.buzzer.off(),
            Sound::Play(note, volume) => self.buzzer.play(note, volume),
        }

        let tone = self.buzzer.tone();
        if tone != previous {
            match tone {
                Some(tone) => rprintln!("buzzer {}", tone),
                None => rprintln!("buzzer off"),
            }
        }
    }
}

fn pin_state(on: bool) -> PinState {
    if on {
        PinState::High
    } else {
        PinState::Low
    }
}

struct StaticState {
    state: RefCell<Option<Alerts>>,
}

impl StaticState {
    const fn new() -> Self {
        Self {
            state: RefCell::new(None),
        }
    }

    fn get(&self) -> RefMut<Option<Alerts>> {
        self.state.borrow_mut()
    }

    fn with<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Alerts) -> Result<R, Error>,
    {
        let mut stref = self.get();
        let state = stref.as_mut().ok_or(Error::Uninitialized)?;

        f(state)
    }
}

// STATE is only accessed from the main thread via EventQueue.
// Therefore, no locking is necessary.
#[allow(unsafe_code)]
unsafe impl Sync for StaticState {}

static STATE: StaticState = StaticState::new();

static SOUND_ALARM: Event = Event::new(&|event| sound_alarm(event).unwrap());

fn sound_alarm(event: &Event) -> Result<(), Error> {
    event.reschedule(ALARM_PERIOD);

    STATE.with(|state| {
        state.sound();
        Ok(())
    })
}

pub fn report_distance(distance: Distance) -> Result<(), Error> {
    STATE.with(|state| {
        state.report_distance(distance);
        Ok(())
    })
}

pub fn report_temperature(temperature: Temperature) -> Result<(), Error> {
    STATE.with(|state| {
        state.report_temperature(temperature);
        Ok(())
    })
}

pub fn toggle_mode() -> Result<(), Error> {
    STATE.with(|state| {
        state.toggle_mode();
        Ok(())
    })
}

pub fn start(
    event_queue: &mut EventQueue<'_, 'static, 'static>,
    buzzer_pwm: BuzzerPwm,
    red_led: RedLed,
    green_led: GreenLed,
    now: Instant,
) -> Result<(), Error> {
    event_queue.bind(&SOUND_ALARM);

    let mut alerts = Alerts {
        status: Status::new(),
        distance: None,
        alarm: Alarm::new(),
        buzzer: Buzzer::new(buzzer_pwm, Channel::C1),
        red_led,
        green_led,
        readout: Readout::blank(),
    };
    alerts.refresh();

    *STATE.get() = Some(alerts);

    SOUND_ALARM.call_at(now + ALARM_PERIOD);

    Ok(())
}
