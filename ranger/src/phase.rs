use core::fmt::{Display, Formatter};

/// Where the ranging cycle stands, named after the edge expected next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    AwaitingTriggerRise,
    AwaitingTriggerFall,
    AwaitingEchoRise,
    AwaitingEchoFall,
}

/// Side effect the ranger performs when taking a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    None,
    /// Trigger pulse is over, switch the counter to capture mode.
    EnterCapture,
    RecordRising,
    RecordFalling,
    /// Edge arrived with no cycle in flight.
    Spurious,
}

impl Phase {
    /// Transition taken on one edge notification. Edges carry no identity,
    /// the phase alone decides what an edge means.
    pub const fn on_edge(self) -> (Phase, Action) {
        match self {
            Phase::Idle => (Phase::Idle, Action::Spurious),
            Phase::AwaitingTriggerRise => (Phase::AwaitingTriggerFall, Action::None),
            Phase::AwaitingTriggerFall => (Phase::AwaitingEchoRise, Action::EnterCapture),
            Phase::AwaitingEchoRise => (Phase::AwaitingEchoFall, Action::RecordRising),
            Phase::AwaitingEchoFall => (Phase::Idle, Action::RecordFalling),
        }
    }

    pub const fn is_idle(self) -> bool {
        matches!(self, Phase::Idle)
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.pad(match *self {
            Phase::Idle => "idle",
            Phase::AwaitingTriggerRise => "awaiting trigger rise",
            Phase::AwaitingTriggerFall => "awaiting trigger fall",
            Phase::AwaitingEchoRise => "awaiting echo rise",
            Phase::AwaitingEchoFall => "awaiting echo fall",
        })
    }
}
