use crate::agent::AgentId;
use crate::geometry::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

const OCTET_RANGE: u64 = 250;
const PORT_BASE: u16 = 9000;
const PORT_RANGE: u64 = 1000;

/// Reproducible label for a publisher's group. Not a hash in any
/// cryptographic sense, only stable for identical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressSeed {
    pub addr_a: u8,
    pub addr_b: u8,
    pub port: u16,
}

impl Default for AddressSeed {
    fn default() -> Self {
        Self {
            addr_a: 1,
            addr_b: 1,
            port: PORT_BASE,
        }
    }
}

impl AddressSeed {
    pub fn derive(position: Vec2, id: AgentId) -> Self {
        // Whole distance units only, so tiny float noise does not relabel.
        let x = position.x.max(0.0).floor() as u64;
        let y = position.y.max(0.0).floor() as u64;
        let h = x
            .wrapping_mul(31)
            .wrapping_add(y)
            .wrapping_mul(31)
            .wrapping_add(id.get() as u64);

        Self {
            addr_a: (h % OCTET_RANGE) as u8 + 1,
            addr_b: ((h / OCTET_RANGE) % OCTET_RANGE) as u8 + 1,
            port: PORT_BASE + (h % PORT_RANGE) as u16,
        }
    }
}

impl fmt::Display for AddressSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "10.{}.{}.0:{}", self.addr_a, self.addr_b, self.port)
    }
}
