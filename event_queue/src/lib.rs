#![cfg_attr(not(test), no_std)]

use core::cell::Cell;
use core::cell::RefCell;
use critical_section::Mutex;
use intrusive_collections::{intrusive_adapter, LinkedList, LinkedListLink};

// Millisecond-precision time. Good for 49 days before rollover.
pub type Instant = fugit::Instant<u32, 1, 1000>;
pub type Duration = fugit::MillisDurationU32;

/// Cooperative dispatcher. Handlers run to completion, in bind order,
/// from whatever context calls `run_once()`.
pub struct EventQueue<'e, 'h> {
    events: LinkedList<EventAdapter<'e, 'h>>,
}

intrusive_adapter!(EventAdapter<'e, 'h> = &'e Event<'h>: Event<'h> { link: LinkedListLink });

impl<'e, 'h> EventQueue<'e, 'h> {
    pub fn new() -> Self {
        EventQueue {
            events: LinkedList::new(EventAdapter::new()),
        }
    }

    pub fn bind(&mut self, event: &'e Event<'h>) {
        self.events.push_back(event);
    }

    // Check all registered events once and execute all pending handlers.
    pub fn run_once(&mut self, time: Instant) {
        let mut cursor = self.events.front();

        while let Some(event) = cursor.get() {
            // Claim the dispatch atomically so a post from an interrupt
            // between the check and the handler call is not lost.
            let due = critical_section::with(|cs| {
                let state = *event.state.borrow_ref(cs);
                let due = match state {
                    EventState::Done => None,
                    EventState::DispatchNow => Some(time),
                    EventState::DispatchAt(dispatch_time) if dispatch_time <= time => {
                        Some(dispatch_time)
                    }
                    EventState::DispatchAt(_) => None,
                };

                if let Some(due) = due {
                    event.state.replace(cs, EventState::Done);
                    event.scheduled.borrow(cs).set(due);
                }

                due
            });

            if due.is_some() {
                event.handler.borrow()(event);
            }

            cursor.move_next();
        }
    }
}

impl<'e, 'h> Default for EventQueue<'e, 'h> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventState {
    Done,
    DispatchNow,
    DispatchAt(Instant),
}

pub struct Event<'h> {
    // Only changes in EventQueue::bind()
    link: LinkedListLink,
    state: Mutex<RefCell<EventState>>,
    // Time the event was due when last dispatched.
    scheduled: Mutex<Cell<Instant>>,
    handler: RefCell<&'h dyn Fn(&Event<'h>)>, // Never changes
}

unsafe impl<'h> Sync for Event<'h> {}

impl<'h> Event<'h> {
    pub const fn new(handler: &'h dyn Fn(&Event<'h>)) -> Self {
        Self {
            link: LinkedListLink::new(),
            state: Mutex::new(RefCell::new(EventState::Done)),
            scheduled: Mutex::new(Cell::new(Instant::from_ticks(0))),
            handler: RefCell::new(handler),
        }
    }

    // Post event into message queue for immediate dispatch.
    // This function is interrupt-safe.
    pub fn call(&self) {
        critical_section::with(|cs| {
            self.state.replace(cs, EventState::DispatchNow);
        });
    }

    // Post an event into message queue with a delay before dispatching the event.
    // This function is interrupt-safe.
    pub fn call_at(&self, time: Instant) {
        critical_section::with(|cs| {
            self.state.replace(cs, EventState::DispatchAt(time));
        });
    }

    // Drop pending dispatch, if any.
    // This function is interrupt-safe.
    pub fn cancel(&self) {
        critical_section::with(|cs| {
            self.state.replace(cs, EventState::Done);
        });
    }

    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| *self.state.borrow_ref(cs) != EventState::Done)
    }

    /// Instant this event was due at its most recent dispatch. Periodic
    /// handlers reschedule relative to it to avoid drift.
    pub fn scheduled_time(&self) -> Instant {
        critical_section::with(|cs| self.scheduled.borrow(cs).get())
    }
}
