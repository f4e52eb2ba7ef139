//! Heap-based timer wheel driving the poller's three per-EID timers (spec
//! §4.2: `normal_timer`, `critical_timer`, `poll_request_timer`, and the
//! one-shot `poll_timeout_timer`).
//!
//! This does not own a thread or a reactor: the enclosing application calls
//! [`TimerWheel::expired`] from its own run loop with the current instant,
//! consistent with the single-threaded cooperative model in spec §5.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Opaque handle returned by [`TimerWheel::schedule`], used to cancel a
/// still-pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

struct Task {
    token: TimerToken,
    deadline: Instant,
    period: Option<Duration>,
    // Bumped on cancel so a stale heap entry can be recognized and dropped
    // without a linear scan of the heap.
    generation: u64,
}

impl Ord for Task {
    fn cmp(&self, other: &Task) -> Ordering {
        // BinaryHeap is a max-heap; invert so the earliest deadline sorts first.
        other.deadline.cmp(&self.deadline)
    }
}
impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Task) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Task {
    fn eq(&self, other: &Task) -> bool {
        self.deadline == other.deadline
    }
}
impl Eq for Task {}

/// A min-heap of pending timers, periodic or one-shot, keyed by an opaque
/// [`TimerToken`].
#[derive(Default)]
pub struct TimerWheel {
    tasks: BinaryHeap<Task>,
    generations: std::collections::HashMap<u64, u64>,
    next_id: u64,
}

impl TimerWheel {
    pub fn new() -> Self {
        TimerWheel {
            tasks: BinaryHeap::new(),
            generations: std::collections::HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedules a one-shot timer to fire after `delay`.
    pub fn schedule_once(&mut self, now: Instant, delay: Duration) -> TimerToken {
        self.insert(now + delay, None)
    }

    /// Schedules a periodic timer, first firing after `period` and then
    /// every `period` thereafter until cancelled.
    pub fn schedule_periodic(&mut self, now: Instant, period: Duration) -> TimerToken {
        self.insert(now + period, Some(period))
    }

    fn insert(&mut self, deadline: Instant, period: Option<Duration>) -> TimerToken {
        let id = self.next_id;
        self.next_id += 1;
        let token = TimerToken(id);
        self.generations.insert(id, 0);
        self.tasks.push(Task {
            token,
            deadline,
            period,
            generation: 0,
        });
        token
    }

    /// Cancels a pending timer. A no-op if the token already fired (for a
    /// one-shot) or was already cancelled.
    pub fn cancel(&mut self, token: TimerToken) {
        if let Some(gen) = self.generations.get_mut(&token.0) {
            *gen += 1;
        }
    }

    /// Pops and returns every timer whose deadline is `<= now`, rescheduling
    /// periodic ones for their next period.
    pub fn expired(&mut self, now: Instant) -> Vec<TimerToken> {
        let mut fired = Vec::new();
        while let Some(top) = self.tasks.peek() {
            if top.deadline > now {
                break;
            }
            let task = self.tasks.pop().expect("peeked Some");
            let current_gen = self.generations.get(&task.token.0).copied().unwrap_or(0);
            if task.generation != current_gen {
                // Cancelled since this entry was scheduled; drop silently.
                continue;
            }
            fired.push(task.token);
            if let Some(period) = task.period {
                self.tasks.push(Task {
                    token: task.token,
                    deadline: now + period,
                    period: Some(period),
                    generation: current_gen,
                });
            } else {
                self.generations.remove(&task.token.0);
            }
        }
        fired
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
