/// Raw counter value. Counters narrower than 32 bits are zero-extended.
pub type Ticks = u32;

/// The single counter/capture unit behind the ranging pin.
///
/// The unit runs in one of two mutually exclusive modes: pulse output for
/// the trigger, and edge capture for timing the echo. Implementations must
/// disable the counter before switching modes and re-enable it afterwards.
///
/// Nothing here can fail at runtime. A bad configuration is a programming
/// error and implementations only check for it with `debug_assert!`.
pub trait CaptureTimer {
    /// Largest value the counter reaches before wrapping to zero.
    const MAX_TICK: Ticks;

    /// Hold the pin low for `period - pulse_width` ticks, then drive it high
    /// for `pulse_width` ticks. Clears any pending notification.
    fn configure_as_pulse(&mut self, period: Ticks, pulse_width: Ticks);

    /// Free-run the counter and latch it on every edge of the input pin.
    /// Clears any pending notification.
    fn configure_as_capture(&mut self);

    /// Counter value latched by hardware at the most recent edge.
    fn current_counter_value(&self) -> Ticks;

    /// Clear the pending edge notification. Called exactly once per
    /// notification, after the latched value was consumed.
    fn acknowledge_notification(&mut self);

    /// Unmask the edge notification. Called once at initialization.
    fn listen(&mut self);
}
