use crate::agent::AgentId;
use crate::time::SimTime;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Sequence number of a scheduled event, unique per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Publish(AgentId),
    Resample(AgentId),
    LogPositions,
    Snapshot,
}

#[derive(Debug)]
struct Scheduled {
    at: SimTime,
    id: EventId,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // BinaryHeap is a max-heap; earliest (time, seq) must come out first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Pending events ordered by simulated time, ties broken by insertion order.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    live: HashSet<EventId>,
    now: SimTime,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn schedule(&mut self, delay: SimTime, event: Event) -> EventId {
        self.schedule_at(self.now + delay, event)
    }

    /// Times in the past are pulled forward to `now`; the clock never runs
    /// backwards.
    pub fn schedule_at(&mut self, at: SimTime, event: Event) -> EventId {
        let id = EventId(self.next_seq);
        self.next_seq += 1;
        self.live.insert(id);
        self.heap.push(Scheduled {
            at: at.max(self.now),
            id,
            event,
        });
        id
    }

    /// Returns false if the event already fired or was cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.live.remove(&id)
    }

    pub fn is_pending(&self, id: EventId) -> bool {
        self.live.contains(&id)
    }

    /// Time of the next live event.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        self.discard_cancelled();
        self.heap.peek().map(|s| s.at)
    }

    /// Removes the next live event and advances the clock to it.
    pub fn pop(&mut self) -> Option<(SimTime, EventId, Event)> {
        self.discard_cancelled();
        let next = self.heap.pop()?;
        self.live.remove(&next.id);
        self.now = next.at;
        Some((next.at, next.id, next.event))
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.live.contains(&top.id) {
                break;
            }
            self.heap.pop();
        }
    }
}
