//! Trigger-and-capture state machine for single-pin ultrasonic rangers.
//!
//! One counter/capture unit first emits the trigger pulse on the signal pin,
//! then times the echo pulse the sensor drives back on the same pin. Every
//! edge on the pin raises a notification; [`Ranger::on_edge`] advances the
//! cycle one step per notification:
//!
//! ```text
//! Idle -> AwaitingTriggerRise -> AwaitingTriggerFall -> AwaitingEchoRise -> AwaitingEchoFall -> Idle
//!      ^ start_measurement()                         ^ switch to capture                     ^ result ready
//! ```
//!
//! The result is the echo pulse width in raw counter ticks. Converting it
//! into a distance is left to the caller.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod error;
mod phase;
mod shared;
mod timer;

pub use crate::error::Error;
pub use crate::phase::{Action, Phase};
pub use crate::shared::SharedRanger;
pub use crate::timer::{CaptureTimer, Ticks};

use event_queue::Event;

/// Receiver of the "result ready" notification.
///
/// Called from interrupt context, so implementations must only post work
/// for later, never do it in place.
pub trait Notify {
    fn notify(&self);
}

impl<'h> Notify for Event<'h> {
    fn notify(&self) {
        self.call();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Trigger waveform period: leading low time plus pulse width.
    pub trigger_period: Ticks,
    pub trigger_width: Ticks,
    /// Longer echoes are treated as desynchronized and dropped.
    pub max_pulse_width: Ticks,
}

impl Config {
    /// Timing for a 1 MHz counter: 10 us low, 10 us trigger pulse, echoes
    /// up to 30 ms (a bit over 5 m).
    pub const DEFAULT: Config = Config::new(20, 10, 30_000);

    pub const fn new(trigger_period: Ticks, trigger_width: Ticks, max_pulse_width: Ticks) -> Self {
        Config {
            trigger_period,
            trigger_width,
            max_pulse_width,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Anomalies seen since the last `take_faults()`. Counters saturate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Faults {
    /// Edges that arrived while idle.
    pub spurious_edges: u16,
    /// Echoes longer than `Config::max_pulse_width`.
    pub implausible_echoes: u16,
    /// Cycles aborted by a new `start_measurement()`.
    pub restarted_cycles: u16,
}

impl Faults {
    pub const fn new() -> Self {
        Faults {
            spurious_edges: 0,
            implausible_echoes: 0,
            restarted_cycles: 0,
        }
    }

    pub fn is_clear(&self) -> bool {
        *self == Faults::new()
    }
}

pub struct Ranger<'n, T: CaptureTimer> {
    timer: T,
    config: Config,
    phase: Phase,
    rising_edge_time: Option<Ticks>,
    falling_edge_time: Option<Ticks>,
    result_ready: bool,
    notify_target: Option<&'n (dyn Notify + Sync)>,
    faults: Faults,
}

impl<'n, T: CaptureTimer> Ranger<'n, T> {
    pub fn new(mut timer: T, config: Config) -> Self {
        debug_assert!(config.trigger_width > 0);
        debug_assert!(config.trigger_width < config.trigger_period);

        timer.listen();

        Ranger {
            timer,
            config,
            phase: Phase::Idle,
            rising_edge_time: None,
            falling_edge_time: None,
            result_ready: false,
            notify_target: None,
            faults: Faults::new(),
        }
    }

    pub fn release(self) -> T {
        self.timer
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Begin a new cycle. A cycle still in flight is abandoned together
    /// with its partial data.
    pub fn start_measurement(&mut self) {
        if !self.phase.is_idle() {
            self.faults.restarted_cycles = self.faults.restarted_cycles.saturating_add(1);
        }

        self.rising_edge_time = None;
        self.falling_edge_time = None;
        self.result_ready = false;
        self.phase = Phase::AwaitingTriggerRise;

        self.timer
            .configure_as_pulse(self.config.trigger_period, self.config.trigger_width);
    }

    /// Edge notification handler. Runs in interrupt context.
    pub fn on_edge(&mut self) {
        let (next, action) = self.phase.on_edge();
        self.phase = next;

        match action {
            Action::None => {}
            Action::EnterCapture => self.timer.configure_as_capture(),
            Action::RecordRising => {
                self.rising_edge_time = Some(self.timer.current_counter_value());
            }
            Action::RecordFalling => {
                self.falling_edge_time = Some(self.timer.current_counter_value());
                self.complete();
            }
            Action::Spurious => {
                self.faults.spurious_edges = self.faults.spurious_edges.saturating_add(1);
            }
        }

        self.timer.acknowledge_notification();
    }

    fn complete(&mut self) {
        let plausible = self
            .pulse_width()
            .map_or(false, |width| width <= self.config.max_pulse_width);

        if !plausible {
            self.faults.implausible_echoes = self.faults.implausible_echoes.saturating_add(1);
            self.rising_edge_time = None;
            self.falling_edge_time = None;
            return;
        }

        self.result_ready = true;

        if let Some(target) = self.notify_target {
            target.notify();
        }
    }

    fn pulse_width(&self) -> Option<Ticks> {
        let rising = self.rising_edge_time?;
        let falling = self.falling_edge_time?;

        Some(if falling >= rising {
            falling - rising
        } else {
            // Counter wrapped between the edges
            (T::MAX_TICK - rising) + falling + 1
        })
    }

    pub fn is_result_ready(&self) -> bool {
        self.result_ready
    }

    pub fn read_pulse_width(&self) -> Result<Ticks, Error> {
        if !self.result_ready {
            return Err(Error::StaleRead);
        }

        self.pulse_width().ok_or(Error::StaleRead)
    }

    /// Post `target` whenever a result becomes ready. Replaces any earlier
    /// registration.
    pub fn register_ready_callback(&mut self, target: &'n (dyn Notify + Sync)) {
        self.notify_target = Some(target);
    }

    pub fn take_faults(&mut self) -> Faults {
        core::mem::take(&mut self.faults)
    }
}


#[cfg(test)]
mod tests {
    use super::test_timer::*;
    use super::*;
    use event_queue::{Event, EventQueue, Instant};
    use quickcheck::{quickcheck, Arbitrary, Gen};
    use std::cell::Cell;

    const UNBOUNDED: Config = Config::new(20, 10, Ticks::MAX);

    fn edge<const MAX: Ticks>(
        ranger: &mut Ranger<'_, TestTimer<MAX>>,
        timer: &TestTimer<MAX>,
        ticks: Ticks,
    ) {
        timer.latch(ticks);
        ranger.on_edge();
    }

    fn full_cycle<const MAX: Ticks>(
        ranger: &mut Ranger<'_, TestTimer<MAX>>,
        timer: &TestTimer<MAX>,
        edges: [Ticks; 4],
    ) {
        ranger.start_measurement();
        for ticks in edges {
            edge(ranger, timer, ticks);
        }
    }

    #[test]
    fn test_new_ranger_is_idle_and_listening() {
        let timer = Timer32::new();
        let ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        assert_eq!(ranger.phase(), Phase::Idle);
        assert!(!ranger.is_result_ready());
        assert!(timer.0.borrow().listening);
        assert_eq!(timer.mode(), Mode::Off);
    }

    #[test]
    fn test_read_before_start() {
        let timer = Timer32::new();
        let ranger = Ranger::new(timer, Config::DEFAULT);

        assert_eq!(ranger.read_pulse_width(), Err(Error::StaleRead));
    }

    #[test]
    fn test_full_measurement() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        full_cycle(&mut ranger, &timer, [100, 150, 2000, 2300]);

        assert_eq!(ranger.phase(), Phase::Idle);
        assert!(ranger.is_result_ready());
        assert_eq!(ranger.read_pulse_width(), Ok(300));
        assert!(ranger.take_faults().is_clear());
    }

    #[test]
    fn test_ready_only_after_fourth_edge() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        ranger.start_measurement();
        let expected = [
            Phase::AwaitingTriggerFall,
            Phase::AwaitingEchoRise,
            Phase::AwaitingEchoFall,
            Phase::Idle,
        ];

        for (n, phase) in expected.into_iter().enumerate() {
            assert!(!ranger.is_result_ready());
            edge(&mut ranger, &timer, 1000 * n as Ticks);
            assert_eq!(ranger.phase(), phase);
        }

        assert!(ranger.is_result_ready());
    }

    #[test]
    fn test_three_edges_is_stale() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        ranger.start_measurement();
        edge(&mut ranger, &timer, 100);
        edge(&mut ranger, &timer, 150);
        edge(&mut ranger, &timer, 2000);

        assert_eq!(ranger.phase(), Phase::AwaitingEchoFall);
        assert_eq!(ranger.read_pulse_width(), Err(Error::StaleRead));
    }

    #[test]
    fn test_mode_switching() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        ranger.start_measurement();
        assert_eq!(
            timer.mode(),
            Mode::Pulse {
                period: 20,
                pulse_width: 10
            }
        );

        ranger.on_edge();
        assert!(matches!(timer.mode(), Mode::Pulse { .. }));

        ranger.on_edge();
        assert_eq!(timer.mode(), Mode::Capture);

        edge(&mut ranger, &timer, 10);
        edge(&mut ranger, &timer, 20);
        assert_eq!(timer.mode(), Mode::Capture);
        assert_eq!(timer.0.borrow().reconfigurations, 2);
    }

    #[test]
    fn test_every_edge_acknowledged_once() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        // Spurious, full cycle, spurious again.
        ranger.on_edge();
        full_cycle(&mut ranger, &timer, [1, 2, 3, 4]);
        ranger.on_edge();

        assert_eq!(timer.acks(), 6);
    }

    #[test]
    fn test_latched_value_read_before_acknowledge() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        full_cycle(&mut ranger, &timer, [100, 150, 2000, 2300]);

        // Third and fourth edges are read while their own ack is outstanding.
        assert_eq!(timer.reads(), vec![2, 3]);
        assert_eq!(timer.acks(), 4);
    }

    #[test]
    fn test_late_handler_sees_both_trigger_edges() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        ranger.start_measurement();

        // Handler delayed past the trigger fall: rise and fall both pending.
        // The interrupt keeps firing while anything is left unacknowledged.
        timer.raise(2);
        while timer.pending() > 0 {
            ranger.on_edge();
        }

        assert_eq!(ranger.phase(), Phase::AwaitingEchoRise);
        assert_eq!(timer.mode(), Mode::Capture);
        assert_eq!(timer.acks(), 2);

        edge(&mut ranger, &timer, 2000);
        edge(&mut ranger, &timer, 2300);
        assert_eq!(ranger.read_pulse_width(), Ok(300));
    }

    #[test]
    fn test_counter_wrap() {
        let timer = Timer16::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        full_cycle(&mut ranger, &timer, [0, 0, 0xFF00, 0x0100]);

        assert_eq!(ranger.read_pulse_width(), Ok((0xFFFF - 0xFF00) + 0x0100 + 1));
        assert_eq!(ranger.read_pulse_width(), Ok(0x200));
    }

    #[test]
    fn test_counter_wrap_full_width() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), UNBOUNDED);

        full_cycle(&mut ranger, &timer, [0, 0, u32::MAX - 9, 5]);

        assert_eq!(ranger.read_pulse_width(), Ok(15));
    }

    #[test]
    fn test_spurious_edge_when_idle() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        edge(&mut ranger, &timer, 500);

        assert_eq!(ranger.phase(), Phase::Idle);
        assert!(!ranger.is_result_ready());
        assert_eq!(ranger.read_pulse_width(), Err(Error::StaleRead));
        assert_eq!(timer.mode(), Mode::Off);

        full_cycle(&mut ranger, &timer, [100, 150, 2000, 2300]);
        assert_eq!(ranger.read_pulse_width(), Ok(300));

        // A glitch after completion leaves the finished result alone.
        edge(&mut ranger, &timer, 9000);
        assert_eq!(ranger.read_pulse_width(), Ok(300));

        let faults = ranger.take_faults();
        assert_eq!(faults.spurious_edges, 2);
        assert!(ranger.take_faults().is_clear());
    }

    #[test]
    fn test_restart_discards_partial_cycle() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        ranger.start_measurement();
        edge(&mut ranger, &timer, 100);
        edge(&mut ranger, &timer, 150);
        edge(&mut ranger, &timer, 2000);

        ranger.start_measurement();
        assert_eq!(ranger.phase(), Phase::AwaitingTriggerRise);
        assert!(matches!(timer.mode(), Mode::Pulse { .. }));

        edge(&mut ranger, &timer, 5000);
        edge(&mut ranger, &timer, 5010);
        edge(&mut ranger, &timer, 6000);
        edge(&mut ranger, &timer, 6450);

        assert_eq!(ranger.read_pulse_width(), Ok(450));
        assert_eq!(ranger.take_faults().restarted_cycles, 1);
    }

    #[test]
    fn test_start_clears_previous_result() {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);

        full_cycle(&mut ranger, &timer, [100, 150, 2000, 2300]);
        assert!(ranger.is_result_ready());

        ranger.start_measurement();
        assert!(!ranger.is_result_ready());
        assert_eq!(ranger.read_pulse_width(), Err(Error::StaleRead));
        // Completed cycle is not counted as a restart.
        assert_eq!(ranger.take_faults().restarted_cycles, 0);
    }

    #[test]
    fn test_implausible_echo_is_dropped() {
        let fired = Cell::new(0);
        let handler = |_: &Event| fired.set(fired.get() + 1);
        let ready = Event::new(&handler);
        let mut queue = EventQueue::new();
        queue.bind(&ready);

        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::new(20, 10, 1000));

        ranger.register_ready_callback(&ready);
        full_cycle(&mut ranger, &timer, [0, 10, 2000, 3001]);

        assert_eq!(ranger.phase(), Phase::Idle);
        assert!(!ranger.is_result_ready());
        assert_eq!(ranger.read_pulse_width(), Err(Error::StaleRead));
        assert_eq!(ranger.take_faults().implausible_echoes, 1);

        queue.run_once(Instant::from_ticks(0));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn test_ready_callback_is_posted() {
        let fired = Cell::new(0);
        let handler = |_: &Event| fired.set(fired.get() + 1);
        let ready = Event::new(&handler);
        let mut queue = EventQueue::new();
        queue.bind(&ready);

        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);
        ranger.register_ready_callback(&ready);

        ranger.start_measurement();
        edge(&mut ranger, &timer, 100);
        edge(&mut ranger, &timer, 150);
        edge(&mut ranger, &timer, 2000);
        assert!(!ready.is_pending());

        edge(&mut ranger, &timer, 2300);

        // Posted to the queue, not called from the edge handler.
        assert!(ready.is_pending());
        assert_eq!(fired.get(), 0);

        queue.run_once(Instant::from_ticks(0));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_register_replaces_callback() {
        let first_fired = Cell::new(false);
        let second_fired = Cell::new(false);
        let first_handler = |_: &Event| first_fired.set(true);
        let second_handler = |_: &Event| second_fired.set(true);
        let first = Event::new(&first_handler);
        let second = Event::new(&second_handler);

        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), Config::DEFAULT);
        ranger.register_ready_callback(&first);
        ranger.register_ready_callback(&second);

        full_cycle(&mut ranger, &timer, [100, 150, 2000, 2300]);

        assert!(!first.is_pending());
        assert!(second.is_pending());
    }

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Start,
        Edge(Ticks),
    }

    impl Arbitrary for Op {
        fn arbitrary(g: &mut Gen) -> Self {
            if u8::arbitrary(g) % 5 == 0 {
                Op::Start
            } else {
                Op::Edge(Ticks::arbitrary(g))
            }
        }
    }

    #[derive(Clone, Copy, Debug)]
    struct Echo {
        trigger: [Ticks; 2],
        rising: Ticks,
        width: u16,
    }

    impl Arbitrary for Echo {
        fn arbitrary(g: &mut Gen) -> Self {
            Echo {
                trigger: [Ticks::arbitrary(g), Ticks::arbitrary(g)],
                rising: Ticks::arbitrary(g),
                width: u16::arbitrary(g),
            }
        }
    }

    impl Echo {
        fn edges(&self) -> [Ticks; 4] {
            [
                self.trigger[0],
                self.trigger[1],
                self.rising,
                self.rising.wrapping_add(self.width as Ticks),
            ]
        }
    }

    quickcheck! {
    // Interleave starts and edges arbitrarily and compare against a model
    // that only counts edges since the last start.
    fn prop_matches_edge_count_model(ops: Vec<Op>) -> bool {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), UNBOUNDED);

        let mut since_start: Option<Vec<Ticks>> = None;

        for op in ops {
            match op {
                Op::Start => {
                    ranger.start_measurement();
                    since_start = Some(Vec::new());
                }
                Op::Edge(ticks) => {
                    edge(&mut ranger, &timer, ticks);
                    if let Some(edges) = since_start.as_mut() {
                        edges.push(ticks);
                    }
                }
            }

            let expected = match &since_start {
                Some(edges) if edges.len() >= 4 => Ok(edges[3].wrapping_sub(edges[2])),
                _ => Err(Error::StaleRead),
            };

            if ranger.is_result_ready() != expected.is_ok()
                || ranger.read_pulse_width() != expected
            {
                return false;
            }

            if ranger.is_result_ready() && ranger.phase() != Phase::Idle {
                return false;
            }
        }

        true
    }

    // A restart after any number of edges of an unfinished cycle yields a
    // clean result for the new cycle.
    fn prop_restart_gives_clean_cycle(aborted: Echo, cut: u8, echo: Echo) -> bool {
        let timer = Timer16::new();
        let mut ranger = Ranger::new(timer.clone(), UNBOUNDED);

        ranger.start_measurement();
        for ticks in aborted.edges().into_iter().take(cut as usize % 4) {
            edge(&mut ranger, &timer, ticks);
        }

        let [t0, t1, rising, falling] = echo.edges();
        full_cycle(&mut ranger, &timer, [t0, t1, rising, falling]);

        let expected = (falling & 0xFFFF).wrapping_sub(rising & 0xFFFF) & 0xFFFF;
        let faults = ranger.take_faults();

        ranger.read_pulse_width() == Ok(expected)
            && faults.restarted_cycles == 1
            && faults.spurious_edges == 0
    }

    // Glitches while idle never leak into the next cycle.
    fn prop_idle_glitches_are_harmless(glitches: Vec<Ticks>, echo: Echo) -> bool {
        let timer = Timer32::new();
        let mut ranger = Ranger::new(timer.clone(), UNBOUNDED);

        for &ticks in &glitches {
            edge(&mut ranger, &timer, ticks);
        }

        if ranger.is_result_ready() {
            return false;
        }

        full_cycle(&mut ranger, &timer, echo.edges());

        ranger.read_pulse_width() == Ok(echo.width as Ticks)
            && ranger.take_faults().spurious_edges as usize == glitches.len().min(u16::MAX as usize)
    }
    }
}
