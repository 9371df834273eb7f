use crate::error::TaskError;
use crate::time::SimTime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub threads: u32,
    pub ram: u32,
    pub duration: SimTime,
    pub created_at: SimTime,
    first_published: Option<SimTime>,
    attempts: u32,
}

impl Task {
    pub fn new(
        id: TaskId,
        threads: u32,
        ram: u32,
        duration: SimTime,
        created_at: SimTime,
    ) -> Result<Self, TaskError> {
        if threads == 0 {
            return Err(TaskError::NonPositive { field: "threads" });
        }
        if ram == 0 {
            return Err(TaskError::NonPositive { field: "ram" });
        }
        if duration.is_zero() {
            return Err(TaskError::NonPositive { field: "duration" });
        }
        Ok(Self {
            id,
            threads,
            ram,
            duration,
            created_at,
            first_published: None,
            attempts: 0,
        })
    }

    /// Marks a publish attempt. The first one fixes the publish time.
    pub fn mark_attempt(&mut self, now: SimTime) {
        self.first_published.get_or_insert(now);
        self.attempts += 1;
    }

    pub fn first_published(&self) -> Option<SimTime> {
        self.first_published
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Ranges used to populate a publisher's queue at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProfile {
    pub count: RangeInclusive<u32>,
    pub threads: RangeInclusive<u32>,
    pub ram: RangeInclusive<u32>,
    pub duration_s: RangeInclusive<u32>,
}

impl Default for TaskProfile {
    fn default() -> Self {
        Self {
            count: 5..=10,
            threads: 4..=64,
            ram: 12..=64,
            duration_s: 1..=10,
        }
    }
}

/// Hands out globally unique task ids and fills queues from a profile.
#[derive(Debug, Default)]
pub struct TaskGenerator {
    next_id: u64,
}

impl TaskGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        profile: &TaskProfile,
        now: SimTime,
        rng: &mut R,
    ) -> Result<VecDeque<Task>, TaskError> {
        let n = rng.gen_range(profile.count.clone());
        let mut queue = VecDeque::with_capacity(n as usize);
        for _ in 0..n {
            let threads = rng.gen_range(profile.threads.clone());
            let ram = rng.gen_range(profile.ram.clone());
            let secs = rng.gen_range(profile.duration_s.clone());
            let id = self.next_id();
            queue.push_back(Task::new(id, threads, ram, SimTime::from_secs(secs as u64), now)?);
        }
        Ok(queue)
    }
}
