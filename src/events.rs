use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Departure,
    Arrival { job: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct ScheduledEvent {
    pub time: f64,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time: f64, event: Event) -> Self {
        Self { time, event }
    }

    pub fn coincides_with(&self, time: f64, epsilon: f64) -> bool {
        (self.time - time).abs() < epsilon || self.time == time
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.event.priority().cmp(&other.event.priority()))
            .then_with(|| self.event.tiebreaker().cmp(&other.event.tiebreaker()))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl Event {
    /// A server freed at time t accepts a job arriving at t, so departures
    /// resolve first.
    pub fn priority(&self) -> u8 {
        match self {
            Event::Departure => 0,
            Event::Arrival { .. } => 1,
        }
    }

    fn tiebreaker(&self) -> usize {
        match self {
            Event::Departure => 0,
            Event::Arrival { job } => *job,
        }
    }
}
