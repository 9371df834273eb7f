pub mod address;
pub mod recorder;

pub use address::AddressSeed;
pub use recorder::{RecordingTransport, TransportCall};

use crate::agent::AgentId;
use crate::task::TaskId;
use crate::time::SimTime;
use anyhow::Result;
use std::fmt;

/// Link layer collaborator. Address assignment, channel simulation and
/// traffic generation all live behind this trait.
pub trait Transport: fmt::Debug {
    fn assign_subnet(&mut self, seed: AddressSeed) -> Result<()>;
    fn create_link(&mut self, a: AgentId, b: AgentId) -> Result<()>;
    fn install_exchange(&mut self, a: AgentId, b: AgentId, duration: SimTime) -> Result<()>;
}

/// Everything the transport needs to stand up one ephemeral group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPlan {
    pub publisher: AgentId,
    pub task: TaskId,
    pub seed: AddressSeed,
    /// Publisher first, then the matched agents.
    pub members: Vec<AgentId>,
    pub duration: SimTime,
}

impl GroupPlan {
    pub fn new(
        publisher: AgentId,
        task: TaskId,
        seed: AddressSeed,
        matched: impl IntoIterator<Item = AgentId>,
        duration: SimTime,
    ) -> Self {
        let mut members = vec![publisher];
        members.extend(matched.into_iter().filter(|id| *id != publisher));
        Self {
            publisher,
            task,
            seed,
            members,
            duration,
        }
    }

    /// Every unordered pair of members (full mesh).
    pub fn pairs(&self) -> impl Iterator<Item = (AgentId, AgentId)> + '_ {
        self.members
            .iter()
            .enumerate()
            .flat_map(move |(i, &a)| self.members[i + 1..].iter().map(move |&b| (a, b)))
    }

    pub fn link_count(&self) -> usize {
        let n = self.members.len();
        n * n.saturating_sub(1) / 2
    }
}

/// Hands a group to the transport. The first failing call aborts and its
/// error is returned as is.
pub fn form_group<T: Transport + ?Sized>(transport: &mut T, plan: &GroupPlan) -> Result<()> {
    transport.assign_subnet(plan.seed)?;
    for (a, b) in plan.pairs() {
        transport.create_link(a, b)?;
        transport.install_exchange(a, b, plan.duration)?;
    }
    Ok(())
}
