use crate::alerts;
use crate::error::Error;
use crate::event_queue::{Event, EventQueue, ExtEvent};
use crate::system_time::{Duration, Instant};

use board::Button;
use core::cell::{RefCell, RefMut};

// Slow enough to ride out contact bounce.
const POLL_PERIOD: Duration = Duration::millis(50);

struct ModeButton {
    button: Button,
    pressed: bool,
}

impl ModeButton {
    // True on the press edge only.
    fn poll(&mut self) -> bool {
        let pressed = self.button.is_high();
        let press = pressed && !self.pressed;
        self.pressed = pressed;

        press
    }
}

struct StaticState {
    state: RefCell<Option<ModeButton>>,
}

impl StaticState {
    const fn new() -> Self {
        Self {
            state: RefCell::new(None),
        }
    }

    fn get(&self) -> RefMut<Option<ModeButton>> {
        self.state.borrow_mut()
    }
}

// STATE is only accessed from the main thread via EventQueue.
// Therefore, no locking is necessary.
#[allow(unsafe_code)]
unsafe impl Sync for StaticState {}

static STATE: StaticState = StaticState::new();

static POLL: Event = Event::new(&|event| poll(event).unwrap());

fn poll(event: &Event) -> Result<(), Error> {
    event.reschedule(POLL_PERIOD);

    let press = STATE
        .get()
        .as_mut()
        .ok_or(Error::Uninitialized)?
        .poll();

    if press {
        alerts::toggle_mode()?;
    }

    Ok(())
}

pub fn start(
    event_queue: &mut EventQueue<'_, 'static, 'static>,
    button: Button,
    now: Instant,
) -> Result<(), Error> {
    event_queue.bind(&POLL);

    *STATE.get() = Some(ModeButton {
        button,
        pressed: false,
    });

    POLL.call_at(now + POLL_PERIOD);

    Ok(())
}
