use crate::{CaptureTimer, Error, Faults, Notify, Phase, Ranger, Ticks};

use core::cell::RefCell;
use critical_section::Mutex;

/// Ranger shared between task code and the edge interrupt handler.
///
/// Every access runs in a critical section, so the interrupt never observes
/// a half-updated cycle and the task never reads edge times mid-update.
pub struct SharedRanger<'n, T: CaptureTimer> {
    ranger: Mutex<RefCell<Option<Ranger<'n, T>>>>,
}

impl<'n, T: CaptureTimer> SharedRanger<'n, T> {
    pub const fn new() -> Self {
        Self {
            ranger: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn init(&self, ranger: Ranger<'n, T>) {
        critical_section::with(|cs| {
            self.ranger.replace(cs, Some(ranger));
        });
    }

    fn with<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Ranger<'n, T>) -> R,
    {
        critical_section::with(|cs| {
            let mut ranger = self.ranger.borrow_ref_mut(cs);
            let ranger = ranger.as_mut().ok_or(Error::Uninitialized)?;

            Ok(f(ranger))
        })
    }

    pub fn start_measurement(&self) -> Result<(), Error> {
        self.with(|ranger| ranger.start_measurement())
    }

    pub fn is_result_ready(&self) -> Result<bool, Error> {
        self.with(|ranger| ranger.is_result_ready())
    }

    pub fn read_pulse_width(&self) -> Result<Ticks, Error> {
        self.with(|ranger| ranger.read_pulse_width())?
    }

    pub fn register_ready_callback(&self, target: &'n (dyn Notify + Sync)) -> Result<(), Error> {
        self.with(|ranger| ranger.register_ready_callback(target))
    }

    pub fn take_faults(&self) -> Result<Faults, Error> {
        self.with(|ranger| ranger.take_faults())
    }

    pub fn phase(&self) -> Result<Phase, Error> {
        self.with(|ranger| ranger.phase())
    }

    /// Call from the edge interrupt. Edges before `init()` are ignored, the
    /// timer cannot be listening yet.
    pub fn on_edge(&self) {
        let _ = self.with(|ranger| ranger.on_edge());
    }
}

impl<'n, T: CaptureTimer> Default for SharedRanger<'n, T> {
    fn default() -> Self {
        Self::new()
    }
}
