use {
    priority_queue::PriorityQueue,
    std::{
        cmp::Reverse,
        collections::HashMap,
        time::{Duration, Instant},
    },
};

/// Work the automation loop schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    ClickAttempt,
    CqCountdown,
    SessionCountdown,
    ColorPoll,
    CooldownEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due {
    pub id: TimerId,
    pub task: Task,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    task: Task,
    interval: Option<Duration>,
}

/// Deadline queue. Timers due at the same instant fire in creation order.
#[derive(Debug, Default)]
pub struct Timers {
    queue: PriorityQueue<TimerId, Reverse<(Instant, TimerId)>>,
    timers: HashMap<TimerId, Timer>,
    next_id: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, instant: Instant, timer: Timer) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.add_with_id(instant, timer, id);
        id
    }

    fn add_with_id(&mut self, instant: Instant, timer: Timer, id: TimerId) {
        self.queue.push(id, Reverse((instant, id)));
        self.timers.insert(id, timer);
    }

    /// Fires every `interval`, first at `now + interval`.
    pub fn add_interval(&mut self, now: Instant, interval: Duration, task: Task) -> TimerId {
        self.add(
            now + interval,
            Timer {
                task,
                interval: Some(interval),
            },
        )
    }

    pub fn add_timeout(&mut self, now: Instant, delay: Duration, task: Task) -> TimerId {
        self.add(
            now + delay,
            Timer {
                task,
                interval: None,
            },
        )
    }

    pub fn remove(&mut self, id: TimerId) {
        self.queue.remove(&id);
        self.timers.remove(&id);
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn next_instant(&self) -> Option<Instant> {
        self.queue.peek().map(|(_id, deadline)| deadline.0 .0)
    }

    /// Takes the earliest timer due at `now` along with its deadline.
    ///
    /// Interval timers are rescheduled relative to that deadline so they do not
    /// drift. Firings missed while the caller was late are coalesced: the timer
    /// fires once and resumes a full interval after `now`.
    pub fn pop(&mut self, now: Instant) -> Option<Due> {
        let next = self.next_instant()?;
        if next > now {
            return None;
        }
        let (id, Reverse((deadline, _))) = self.queue.pop()?;
        let timer = self.timers.remove(&id)?;
        if let Some(interval) = timer.interval {
            let mut next = deadline + interval;
            if next <= now {
                next = now + interval;
            }
            self.add_with_id(next, timer, id);
        }
        Some(Due {
            id,
            task: timer.task,
            deadline,
        })
    }
}
