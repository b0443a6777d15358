use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use crate::animation::Pan;

/// Handle returned for every scheduled task; the only way to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Everything the session schedules on the shared queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second of countdown elapsed.
    CountdownTick,
    /// An edge cue within the animation cycle started under `generation`.
    Cue { pan: Pan, generation: u64 },
    /// End of the cycle started under `generation`; the next one begins here.
    CycleRestart { generation: u64 },
}

/// A task whose due time has been reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<E> {
    pub id: TaskId,
    /// When the task was due, which may be earlier than the instant it was popped.
    pub due: Duration,
    pub event: E,
}

#[derive(Debug)]
struct Entry<E> {
    due: Duration,
    seq: u64,
    id: TaskId,
    every: Option<Duration>,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    // BinaryHeap is a max-heap: invert so the earliest (then oldest) entry is on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded deferred-callback queue driven by an external clock.
///
/// Nothing runs on its own: the owner calls [`Scheduler::pop_due`] from its
/// event loop with the current time and dispatches whatever comes back.
/// Cancelled tasks are dropped lazily when they reach the head of the queue.
#[derive(Debug)]
pub struct Scheduler<E> {
    queue: BinaryHeap<Entry<E>>,
    live: HashSet<TaskId>,
    next_id: u64,
    next_seq: u64,
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            live: HashSet::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Fire `event` once at the absolute time `due`.
    pub fn schedule_at(&mut self, due: Duration, event: E) -> TaskId {
        self.push(due, None, event)
    }

    /// Fire `event` once, `delay` after `now`.
    pub fn schedule_after(&mut self, now: Duration, delay: Duration, event: E) -> TaskId {
        self.push(now + delay, None, event)
    }

    /// Fire `event` every `interval` starting one interval after `now`.
    ///
    /// Each repetition is re-armed from its own due time, so the series never
    /// drifts however late the owner pops it.
    pub fn schedule_every(&mut self, now: Duration, interval: Duration, event: E) -> TaskId {
        let interval = interval.max(Duration::from_millis(1));
        self.push(now + interval, Some(interval), event)
    }

    /// Cancel a task. Unknown or already-fired ids are ignored.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.live.remove(&id)
    }

    pub fn cancel_all<I: IntoIterator<Item = TaskId>>(&mut self, ids: I) {
        for id in ids {
            self.live.remove(&id);
        }
    }

    /// Number of outstanding tasks, repeating ones counted once.
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// Due time of the earliest outstanding task.
    pub fn next_due(&mut self) -> Option<Duration> {
        self.prune_head();
        self.queue.peek().map(|e| e.due)
    }

    /// Pop the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<Fired<E>> {
        self.prune_head();
        if self.queue.peek()?.due > now {
            return None;
        }
        let entry = self.queue.pop()?;
        let fired = Fired {
            id: entry.id,
            due: entry.due,
            event: entry.event.clone(),
        };
        match entry.every {
            Some(interval) => {
                let seq = self.bump_seq();
                self.queue.push(Entry {
                    due: entry.due + interval,
                    seq,
                    ..entry
                });
            }
            None => {
                self.live.remove(&entry.id);
            }
        }
        Some(fired)
    }

    /// Drop every task.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }

    fn push(&mut self, due: Duration, every: Option<Duration>, event: E) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let seq = self.bump_seq();
        self.live.insert(id);
        self.queue.push(Entry {
            due,
            seq,
            id,
            every,
            event,
        });
        id
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn prune_head(&mut self) {
        while let Some(head) = self.queue.peek() {
            if self.live.contains(&head.id) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
