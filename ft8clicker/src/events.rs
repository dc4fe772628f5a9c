use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::collections::VecDeque,
    strum::Display,
};

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Enable,
    Cq,
    BandChange,
    Stop,
}

/// The interval between two consecutive events, labelled by the event that closed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: EventKind,
    /// Seconds between `start` and `end`.
    pub duration: f64,
}

impl ClickEvent {
    fn new(start: DateTime<Utc>, end: DateTime<Utc>, kind: EventKind) -> Self {
        let duration = (end - start)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            start,
            end,
            kind,
            duration,
        }
    }
}

#[derive(Debug, Default)]
pub struct EventRecorder {
    history: VecDeque<ClickEvent>,
    open_since: Option<DateTime<Utc>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the open interval with `kind` and opens a new one at `now`.
    pub fn record(&mut self, kind: EventKind, now: DateTime<Utc>) -> Option<ClickEvent> {
        let closed = self
            .open_since
            .replace(now)
            .map(|start| ClickEvent::new(start, now, kind));
        if let Some(event) = &closed {
            self.push(event.clone());
        }
        closed
    }

    /// Closes the open interval as a stop, leaving nothing open.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Option<ClickEvent> {
        let event = ClickEvent::new(self.open_since.take()?, now, EventKind::Stop);
        self.push(event.clone());
        Some(event)
    }

    fn push(&mut self, event: ClickEvent) {
        self.history.push_back(event);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    /// Oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &ClickEvent> + '_ {
        self.history.iter()
    }

    pub fn open_since(&self) -> Option<DateTime<Utc>> {
        self.open_since
    }
}
