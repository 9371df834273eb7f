use crate::error::{ConfigError, MobilityError};
use crate::geometry::Vec2;
use crate::mobility::Mobility;
use crate::simulation::cycle::CyclePhase;
use crate::simulation::events::EventId;
use crate::task::Task;
use crate::time::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

/// Handle into the simulation's agent arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Layer 1 agents only lend capacity, layer 2 agents also publish tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Worker = 1,
    Publisher = 2,
}

impl Layer {
    pub fn number(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub threads: u32,
    pub ram: u32,
}

impl Capacity {
    pub fn new(threads: u32, ram: u32) -> Self {
        Self { threads, ram }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::NonPositive { name: "threads", value: 0.0 });
        }
        if self.ram == 0 {
            return Err(ConfigError::NonPositive { name: "ram", value: 0.0 });
        }
        Ok(())
    }

    /// Euclidean length of the (threads, ram) vector.
    pub fn magnitude(&self) -> f64 {
        (self.threads as f64).hypot(self.ram as f64)
    }
}

#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    layer: Layer,
    capacity: Capacity,
    mobility: Box<dyn Mobility>,
    queue: VecDeque<Task>,
    phase: CyclePhase,
    pub(crate) resample_event: Option<EventId>,
}

impl Agent {
    pub fn new(
        id: AgentId,
        layer: Layer,
        capacity: Capacity,
        mobility: Box<dyn Mobility>,
        queue: VecDeque<Task>,
    ) -> Result<Self, ConfigError> {
        capacity.validate()?;
        Ok(Self {
            id,
            layer,
            capacity,
            mobility,
            queue,
            phase: CyclePhase::Idle,
            resample_event: None,
        })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn position(&self, now: SimTime) -> Vec2 {
        self.mobility.position(now)
    }

    pub fn mobility(&self) -> &dyn Mobility {
        self.mobility.as_ref()
    }

    pub(crate) fn set_position(&mut self, position: Vec2, now: SimTime) -> Result<(), MobilityError> {
        self.mobility.set_position(position, now)
    }

    pub(crate) fn resample(&mut self, now: SimTime) -> Option<SimTime> {
        self.mobility.resample(now)
    }

    pub fn queue(&self) -> &VecDeque<Task> {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub(crate) fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    pub(crate) fn head_mut(&mut self) -> Option<&mut Task> {
        self.queue.front_mut()
    }

    /// Removes the head task for good.
    pub(crate) fn take_head(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Puts a task taken with `take_head` back in front.
    pub(crate) fn restore_head(&mut self, task: Task) {
        self.queue.push_front(task);
    }

    /// Moves the head task to the tail so the rest of the queue gets a turn.
    pub(crate) fn rotate_head(&mut self) {
        if let Some(task) = self.queue.pop_front() {
            self.queue.push_back(task);
        }
    }

    pub(crate) fn enter(&mut self, next: CyclePhase) {
        debug_assert!(
            self.phase.can_enter(next),
            "agent {} cannot go from {:?} to {:?}",
            self.id,
            self.phase,
            next
        );
        trace!(agent = self.id.get(), from = ?self.phase, to = ?next, "cycle transition");
        self.phase = next;
    }
}
