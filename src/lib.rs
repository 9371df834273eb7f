pub mod agent;
pub mod error;
pub mod geometry;
pub mod matcher;
pub mod metrics;
pub mod mobility;
pub mod neighbor;
pub mod network;
pub mod simulation;
pub mod task;
pub mod time;

pub use agent::{Agent, AgentId, Capacity, Layer};
pub use metrics::MetricsCollector;
pub use simulation::{SimConfig, Simulation};
pub use time::SimTime;

pub mod prelude {
    pub use crate::agent::{Agent, AgentId, Capacity, Layer};
    pub use crate::geometry::{Rectangle, Vec2};
    pub use crate::matcher::{Candidate, MatchResult};
    pub use crate::metrics::{EventSink, LogRecord, MetricsSnapshot};
    pub use crate::mobility::{Mobility, MobilityConfig, MobilityKind};
    pub use crate::network::{RecordingTransport, Transport};
    pub use crate::simulation::{PoolScope, SimConfig, Simulation};
    pub use crate::task::{Task, TaskId};
    pub use crate::time::SimTime;
}
