pub mod config;
pub mod cycle;
pub mod events;

pub use config::{PoolScope, SimConfig};
pub use cycle::{CyclePhase, PoolMember, PublishOutcome};
pub use events::{Event, EventId, EventQueue};

use crate::agent::{Agent, AgentId, Capacity, Layer};
use crate::error::{ConfigError, MobilityError, TaskError};
use crate::geometry::Vec2;
use crate::metrics::records::{CandidateRecord, JobRecord, NodeRecord, PositionRecord, TaskRecord};
use crate::metrics::{EventSink, LogRecord, MetricsCollector};
use crate::neighbor::NeighborQuery;
use crate::network::{form_group, AddressSeed, RecordingTransport, Transport};
use crate::task::{Task, TaskGenerator, TaskId};
use crate::time::SimTime;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Independent random stream per agent, derived from the run seed.
fn stream_seed(seed: u64, id: AgentId) -> u64 {
    seed ^ (id.get() as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub struct Simulation<T: Transport = RecordingTransport> {
    config: SimConfig,
    agents: Vec<Agent>,
    events: EventQueue,
    transport: T,
    sinks: Vec<Box<dyn EventSink>>,
    pub metrics: MetricsCollector,
    query: NeighborQuery,
    jitter: Option<Exp<f64>>,
    rng: StdRng,
    tasks: TaskGenerator,
    started: bool,
}

impl Simulation<RecordingTransport> {
    /// Validates `config` and populates the fleet it describes.
    pub fn new(config: SimConfig) -> Result<Self> {
        let mut sim = Self::with_transport(config, RecordingTransport::new())?;
        sim.populate()?;
        Ok(sim)
    }
}

impl<T: Transport> Simulation<T> {
    /// An empty simulation; add agents with [`Simulation::add_agent`] or
    /// [`Simulation::populate`].
    pub fn with_transport(config: SimConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        let jitter = if config.jitter_mean_s > 0.0 {
            Some(Exp::new(1.0 / config.jitter_mean_s).map_err(|_| ConfigError::NonPositive {
                name: "jitter_mean_s",
                value: config.jitter_mean_s,
            })?)
        } else {
            None
        };

        Ok(Self {
            query: NeighborQuery::new(config.radius),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            agents: Vec::new(),
            events: EventQueue::new(),
            transport,
            sinks: Vec::new(),
            metrics: MetricsCollector::new(),
            jitter,
            tasks: TaskGenerator::new(),
            started: false,
        })
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.add_sink(Box::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Creates the workers and publishers named in the config. Workers come
    /// first so ids match the layer order of the position log.
    pub fn populate(&mut self) -> Result<()> {
        let layers = std::iter::repeat(Layer::Worker)
            .take(self.config.num_workers as usize)
            .chain(std::iter::repeat(Layer::Publisher).take(self.config.num_publishers as usize));

        let now = self.now();
        for layer in layers {
            let capacity = Capacity::new(
                self.rng.gen_range(self.config.capacity_threads.clone()),
                self.rng.gen_range(self.config.capacity_ram.clone()),
            );
            let start = self.config.placement.sample(&mut self.rng);
            let queue = match layer {
                Layer::Publisher => self.tasks.generate(&self.config.tasks, now, &mut self.rng)?,
                Layer::Worker => VecDeque::new(),
            };
            self.add_agent(layer, capacity, start, queue)?;
        }

        info!(
            "Populated {} workers and {} publishers",
            self.config.num_workers, self.config.num_publishers
        );
        Ok(())
    }

    pub fn add_agent(
        &mut self,
        layer: Layer,
        capacity: Capacity,
        start: Vec2,
        queue: VecDeque<Task>,
    ) -> Result<AgentId> {
        let id = AgentId::new(self.agents.len() as u32);
        if layer != Layer::Publisher && !queue.is_empty() {
            return Err(TaskError::NotPublisher(id.get()).into());
        }
        let mobility = self.config.mobility.build(start, stream_seed(self.config.seed, id))?;
        let agent = Agent::new(id, layer, capacity, mobility, queue)?;
        debug!(
            "Agent {} joins layer {} with {} mobility at ({:.1}, {:.1})",
            id,
            layer.number(),
            agent.mobility().name(),
            start.x,
            start.y
        );
        self.agents.push(agent);

        if self.started {
            self.arm_agent(id);
            self.emit_node(id)?;
        }
        Ok(id)
    }

    /// Appends a new task to a publisher's queue. Workers never run a
    /// publish cycle, so handing them a task is an error.
    pub fn enqueue_task(&mut self, agent: AgentId, threads: u32, ram: u32, duration: SimTime) -> Result<TaskId> {
        let now = self.now();
        let started = self.started;
        let target = self
            .agents
            .get_mut(agent.index())
            .ok_or(MobilityError::UnknownAgent(agent.get()))?;
        if target.layer() != Layer::Publisher {
            return Err(TaskError::NotPublisher(agent.get()).into());
        }
        let id = self.tasks.next_id();
        target.enqueue(Task::new(id, threads, ram, duration, now)?);
        // Queues present at start are reported through [NODES].
        if started {
            self.metrics.task_enqueued();
        }
        Ok(id)
    }

    /// Moves an agent directly. An out-of-bounds target is rejected before
    /// anything is scheduled; otherwise the pending resample is replaced by
    /// one firing now.
    pub fn set_position(&mut self, id: AgentId, position: Vec2) -> Result<(), MobilityError> {
        let now = self.now();
        let agent = self
            .agents
            .get_mut(id.index())
            .ok_or(MobilityError::UnknownAgent(id.get()))?;
        agent.set_position(position, now)?;

        if let Some(pending) = agent.resample_event.take() {
            self.events.cancel(pending);
        }
        let event = self.events.schedule(SimTime::ZERO, Event::Resample(id));
        self.agents[id.index()].resample_event = Some(event);
        Ok(())
    }

    pub fn now(&self) -> SimTime {
        self.events.now()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn queued_tasks(&self) -> usize {
        self.agents.iter().map(Agent::queue_len).sum()
    }

    /// Emits the node table and arms every agent's first events. Called by
    /// `run` and `run_until`; calling it again is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        for i in 0..self.agents.len() {
            self.emit_node(AgentId::new(i as u32))?;
        }
        for i in 0..self.agents.len() {
            self.arm_agent(AgentId::new(i as u32));
        }
        if let Some(interval) = self.config.position_log_interval {
            self.arm(interval, Event::LogPositions);
        }
        self.arm(self.config.snapshot_interval, Event::Snapshot);

        info!(
            "Starting simulation {} with {} agents, horizon {}",
            self.config.name,
            self.agents.len(),
            self.config.horizon
        );
        Ok(())
    }

    fn arm_agent(&mut self, id: AgentId) {
        let event = self.events.schedule(SimTime::ZERO, Event::Resample(id));
        self.agents[id.index()].resample_event = Some(event);
        if self.agents[id.index()].layer() == Layer::Publisher {
            self.arm(self.config.first_publish, Event::Publish(id));
        }
    }

    /// Schedules `event` after `delay` unless that lands past the horizon.
    fn arm(&mut self, delay: SimTime, event: Event) -> Option<EventId> {
        let at = self.now() + delay;
        (at <= self.config.horizon).then(|| self.events.schedule_at(at, event))
    }

    /// Runs to the horizon and flushes the sinks.
    pub fn run(&mut self) -> Result<()> {
        self.run_until(self.config.horizon)?;
        self.finish()
    }

    /// Processes every event due at or before `limit` (capped at the
    /// horizon). Returns the number of events handled.
    pub fn run_until(&mut self, limit: SimTime) -> Result<usize> {
        self.start()?;
        let limit = limit.min(self.config.horizon);
        let mut handled = 0;
        while let Some(at) = self.events.peek_time() {
            if at > limit {
                break;
            }
            let Some((_, id, event)) = self.events.pop() else {
                break;
            };
            self.dispatch(id, event)?;
            handled += 1;
        }
        Ok(handled)
    }

    pub fn finish(&mut self) -> Result<()> {
        self.metrics.save_snapshot(self.now(), self.queued_tasks());
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        info!(
            "Simulation {} finished at {}: {} matched, {} still queued",
            self.config.name,
            self.now(),
            self.metrics.matched(),
            self.queued_tasks()
        );
        Ok(())
    }

    fn dispatch(&mut self, id: EventId, event: Event) -> Result<()> {
        match event {
            Event::Publish(agent) => self.on_publish(agent),
            Event::Resample(agent) => {
                self.on_resample(agent, id);
                Ok(())
            }
            Event::LogPositions => self.on_log_positions(),
            Event::Snapshot => {
                self.metrics.save_snapshot(self.now(), self.queued_tasks());
                self.arm(self.config.snapshot_interval, Event::Snapshot);
                Ok(())
            }
        }
    }

    fn on_resample(&mut self, id: AgentId, event: EventId) {
        let now = self.now();
        let Some(agent) = self.agents.get_mut(id.index()) else {
            return;
        };
        if agent.resample_event != Some(event) {
            return;
        }
        agent.resample_event = None;
        let next = agent.resample(now);
        self.metrics.resampled();

        if let Some(at) = next {
            if at <= self.config.horizon {
                let event = self.events.schedule_at(at, Event::Resample(id));
                self.agents[id.index()].resample_event = Some(event);
            }
        }
    }

    fn pool_for(&self, publisher: AgentId) -> Vec<PoolMember> {
        let now = self.now();
        self.agents
            .iter()
            .filter(|a| a.id() != publisher)
            .filter(|a| match self.config.pool {
                PoolScope::All => true,
                PoolScope::Workers => a.layer() == Layer::Worker,
            })
            .map(|a| PoolMember {
                id: a.id(),
                position: a.position(now),
                capacity: a.capacity(),
            })
            .collect()
    }

    fn on_publish(&mut self, id: AgentId) -> Result<()> {
        if id.index() >= self.agents.len() {
            warn!("Publish event for unknown agent {}", id);
            return Ok(());
        }
        let now = self.now();
        self.metrics.publish_fired();

        let pool = self.pool_for(id);
        let agent = &mut self.agents[id.index()];
        let layer = agent.layer();
        let outcome = cycle::publish(agent, &pool, &self.query, now);

        match outcome {
            PublishOutcome::Idle => self.metrics.empty_fire(),
            PublishOutcome::Unmatched { task_id, seed, neighbors } => {
                self.metrics.task_unmatched();
                self.emit_candidates(id, task_id, seed, &neighbors)?;
            }
            PublishOutcome::Matched {
                task,
                seed,
                neighbors,
                result,
                plan,
            } => {
                self.emit_candidates(id, task.id, seed, &neighbors)?;
                if let Err(err) = form_group(&mut self.transport, &plan) {
                    warn!("Group for task {} of agent {} failed: {}", task.id, id, err);
                    self.agents[id.index()].restore_head(task);
                    return Err(err);
                }
                self.metrics.task_matched(plan.link_count());

                for (a, b) in plan.pairs() {
                    self.emit(LogRecord::Job(JobRecord {
                        publisher_id: id.get(),
                        task_id: task.id.get(),
                        addr_a: seed.addr_a,
                        addr_b: seed.addr_b,
                        member_i: a.get(),
                        member_j: b.get(),
                    }))?;
                }

                let end = now + task.duration;
                self.emit(LogRecord::Task(TaskRecord {
                    layer: layer.number(),
                    publisher_id: id.get(),
                    task_id: task.id.get(),
                    ram: task.ram,
                    threads: task.threads,
                    duration: task.duration.as_secs_f64(),
                    publish_time: task.first_published().unwrap_or(now).as_secs_f64(),
                    match_start_time: now.as_secs_f64(),
                    match_end_time: end.as_secs_f64(),
                    covered_ram: result.covered_ram,
                    covered_threads: result.covered_threads,
                }))?;
                info!(
                    "Agent {} matched task {} with {} agents until {}",
                    id,
                    task.id,
                    result.selected.len(),
                    end
                );
            }
        }

        let delay = self.next_publish_delay();
        self.arm(delay, Event::Publish(id));
        Ok(())
    }

    fn next_publish_delay(&mut self) -> SimTime {
        let jitter = self
            .jitter
            .as_ref()
            .map(|exp| exp.sample(&mut self.rng))
            .unwrap_or(0.0);
        self.config.publish_interval + SimTime::from_secs_f64(jitter)
    }

    fn on_log_positions(&mut self) -> Result<()> {
        let now = self.now();
        // Layer 1 first, then layer 2.
        for layer in [Layer::Worker, Layer::Publisher] {
            let records: Vec<LogRecord> = self
                .agents
                .iter()
                .filter(|a| a.layer() == layer)
                .map(|a| {
                    let p = a.position(now);
                    LogRecord::Position(PositionRecord {
                        layer: layer.number(),
                        id: a.id().get(),
                        x: p.x,
                        y: p.y,
                        timestamp: now.as_secs_f64(),
                    })
                })
                .collect();
            self.metrics.positions_logged(records.len());
            for record in records {
                self.emit(record)?;
            }
        }
        if let Some(interval) = self.config.position_log_interval {
            self.arm(interval, Event::LogPositions);
        }
        Ok(())
    }

    fn emit_node(&mut self, id: AgentId) -> Result<()> {
        let agent = &self.agents[id.index()];
        let record = LogRecord::Node(NodeRecord {
            layer: agent.layer().number(),
            id: id.get(),
            ram: agent.capacity().ram,
            threads: agent.capacity().threads,
            initial_queue_length: agent.queue_len(),
        });
        self.emit(record)
    }

    fn emit_candidates(
        &mut self,
        publisher: AgentId,
        task: TaskId,
        seed: AddressSeed,
        neighbors: &[AgentId],
    ) -> Result<()> {
        self.metrics.candidates_seen(neighbors.len());
        for neighbor in neighbors {
            self.emit(LogRecord::Candidate(CandidateRecord {
                publisher_id: publisher.get(),
                task_id: task.get(),
                addr_a: seed.addr_a,
                addr_b: seed.addr_b,
                neighbor_id: neighbor.get(),
            }))?;
        }
        Ok(())
    }

    fn emit(&mut self, record: LogRecord) -> Result<()> {
        for sink in &mut self.sinks {
            sink.record(&record)?;
        }
        Ok(())
    }
}

impl<T: Transport> std::fmt::Debug for Simulation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("name", &self.config.name)
            .field("now", &self.now())
            .field("agents", &self.agents.len())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;
    use crate::metrics::MemorySink;
    use crate::mobility::MobilityConfig;

    fn quiet_config() -> SimConfig {
        SimConfig::default()
            .with_agents(0, 1)
            .with_horizon(SimTime::from_secs(10))
            .with_mobility(MobilityConfig::stationary(Rectangle::default()))
            .without_jitter()
    }

    #[test]
    fn default_run_keeps_every_task() {
        let sink = MemorySink::new();
        let mut sim = Simulation::new(SimConfig::default().with_seed(3))
            .unwrap()
            .with_sink(sink.clone());
        let initial = sim.queued_tasks();
        sim.run().unwrap();

        let matched = sink.count("[TASKS]");
        assert_eq!(sim.queued_tasks() + matched, initial);
        assert_eq!(matched as u64, sim.metrics.matched());
        assert_eq!(sink.count("[NODES]"), 6);
    }

    #[test]
    fn publish_rearms_every_interval_without_jitter() {
        let mut sim = Simulation::with_transport(quiet_config(), RecordingTransport::new()).unwrap();
        sim.add_agent(Layer::Publisher, Capacity::new(2, 2), Vec2::new(50.0, 50.0), VecDeque::new())
            .unwrap();
        sim.run().unwrap();

        let last = sim.metrics.get_snapshots().last().cloned().unwrap();
        // Fires at 1, 2, ..., 10.
        assert_eq!(last.publish_events, 10);
        assert_eq!(last.empty_fires, 10);
    }

    #[test]
    fn events_past_horizon_are_not_armed() {
        let mut sim = Simulation::with_transport(quiet_config(), RecordingTransport::new()).unwrap();
        sim.add_agent(Layer::Publisher, Capacity::new(2, 2), Vec2::new(50.0, 50.0), VecDeque::new())
            .unwrap();
        sim.run().unwrap();
        assert!(sim.now() <= SimTime::from_secs(10));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn set_position_replaces_pending_resample() {
        let config = quiet_config().with_mobility(MobilityConfig::default());
        let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
        let id = sim
            .add_agent(Layer::Worker, Capacity::new(2, 2), Vec2::new(50.0, 50.0), VecDeque::new())
            .unwrap();
        sim.start().unwrap();
        let first = sim.agent(id).unwrap().resample_event.unwrap();

        sim.set_position(id, Vec2::new(10.0, 10.0)).unwrap();
        let second = sim.agent(id).unwrap().resample_event.unwrap();
        assert_ne!(first, second);
        assert!(!sim.events().is_pending(first));
        assert!(sim.events().is_pending(second));
        assert_eq!(sim.agent(id).unwrap().position(sim.now()), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn publish_rearms_with_exponential_jitter() {
        let config = SimConfig {
            horizon: SimTime::from_secs(2000),
            jitter_mean_s: 1.0,
            position_log_interval: None,
            snapshot_interval: SimTime::from_secs(2000),
            ..quiet_config().with_seed(17)
        };
        let interval = config.publish_interval;
        let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
        sim.add_agent(Layer::Publisher, Capacity::new(2, 2), Vec2::new(50.0, 50.0), VecDeque::new())
            .unwrap();
        sim.start().unwrap();

        let mut fired = Vec::new();
        while let Some((at, id, event)) = sim.events.pop() {
            if let Event::Publish(_) = event {
                fired.push(at);
            }
            sim.dispatch(id, event).unwrap();
        }

        assert_eq!(fired[0], SimTime::from_secs(1));
        let gaps: Vec<SimTime> = fired.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.len() > 500, "{} publishes", fired.len());
        assert!(gaps.iter().all(|g| *g >= interval));

        let mut distinct = gaps.clone();
        distinct.sort();
        distinct.dedup();
        assert!(distinct.len() > gaps.len() / 2);

        let mean_excess =
            gaps.iter().map(|g| (*g - interval).as_secs_f64()).sum::<f64>() / gaps.len() as f64;
        assert!((mean_excess - 1.0).abs() < 0.15, "mean excess {mean_excess}");
    }

    #[test]
    fn late_enqueue_is_counted() {
        let mut sim = Simulation::with_transport(quiet_config(), RecordingTransport::new()).unwrap();
        let p = sim
            .add_agent(Layer::Publisher, Capacity::new(2, 2), Vec2::new(50.0, 50.0), VecDeque::new())
            .unwrap();
        sim.enqueue_task(p, 1, 1, SimTime::from_secs(1)).unwrap();
        sim.start().unwrap();
        sim.enqueue_task(p, 1, 1, SimTime::from_secs(1)).unwrap();
        assert_eq!(sim.metrics.snapshot(sim.now(), 0).tasks_enqueued, 1);
    }

    #[test]
    fn enqueue_to_unknown_agent_fails() {
        let mut sim = Simulation::with_transport(quiet_config(), RecordingTransport::new()).unwrap();
        assert!(sim.enqueue_task(AgentId::new(5), 1, 1, SimTime::from_secs(1)).is_err());
    }
}
