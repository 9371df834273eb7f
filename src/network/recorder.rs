use super::{AddressSeed, Transport};
use crate::agent::AgentId;
use crate::time::SimTime;
use anyhow::Result;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    AssignSubnet(AddressSeed),
    CreateLink(AgentId, AgentId),
    InstallExchange(AgentId, AgentId, SimTime),
}

/// In-process transport that only remembers what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    calls: Vec<TransportCall>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    pub fn subnets(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, TransportCall::AssignSubnet(_)))
            .count()
    }

    pub fn links(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, TransportCall::CreateLink(..)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

impl Transport for RecordingTransport {
    fn assign_subnet(&mut self, seed: AddressSeed) -> Result<()> {
        debug!("assign subnet {}", seed);
        self.calls.push(TransportCall::AssignSubnet(seed));
        Ok(())
    }

    fn create_link(&mut self, a: AgentId, b: AgentId) -> Result<()> {
        self.calls.push(TransportCall::CreateLink(a, b));
        Ok(())
    }

    fn install_exchange(&mut self, a: AgentId, b: AgentId, duration: SimTime) -> Result<()> {
        self.calls.push(TransportCall::InstallExchange(a, b, duration));
        Ok(())
    }
}
