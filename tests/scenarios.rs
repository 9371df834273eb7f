use std::collections::VecDeque;

use anyhow::anyhow;
use taskmesh::error::MobilityError;
use taskmesh::matcher::{self, Candidate};
use taskmesh::metrics::{LogRecord, MemorySink};
use taskmesh::network::AddressSeed;
use taskmesh::prelude::*;

fn stationary_config(horizon_s: u64) -> SimConfig {
    SimConfig::default()
        .with_agents(0, 1)
        .with_horizon(SimTime::from_secs(horizon_s))
        .with_mobility(MobilityConfig::stationary(Rectangle::default()))
        .without_jitter()
}

fn tasks(specs: &[(u64, u32, u32, u64)]) -> VecDeque<Task> {
    specs
        .iter()
        .map(|&(id, threads, ram, secs)| {
            Task::new(TaskId::new(id), threads, ram, SimTime::from_secs(secs), SimTime::ZERO).unwrap()
        })
        .collect()
}

#[derive(Debug, Default)]
struct RefusingTransport;

impl Transport for RefusingTransport {
    fn assign_subnet(&mut self, _seed: AddressSeed) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_link(&mut self, a: AgentId, b: AgentId) -> anyhow::Result<()> {
        Err(anyhow!("link {}-{} refused", a, b))
    }

    fn install_exchange(&mut self, _a: AgentId, _b: AgentId, _duration: SimTime) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn scenario_a_best_pair_is_selected() {
    let candidates = vec![
        Candidate::new(AgentId::new(1), 10, 4),
        Candidate::new(AgentId::new(2), 8, 6),
        Candidate::new(AgentId::new(3), 5, 5),
    ];
    let result = matcher::select(Capacity::new(15, 10), &candidates);

    let picked: Vec<(u32, u32)> = result
        .selected
        .iter()
        .map(|c| (c.capacity.threads, c.capacity.ram))
        .collect();
    assert_eq!(picked, vec![(10, 4), (5, 5)]);
    assert_eq!((result.covered_threads, result.covered_ram), (15, 9));
    assert!((result.value - 17.841).abs() < 1e-3);
}

#[test]
fn scenario_b_lonely_publisher_rotates_queue() {
    let config = stationary_config(1);
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    let sink = MemorySink::new();
    sim.add_sink(Box::new(sink.clone()));
    let publisher = sim
        .add_agent(
            Layer::Publisher,
            Capacity::new(4, 4),
            Vec2::new(50.0, 50.0),
            tasks(&[(0, 8, 8, 2), (1, 2, 2, 2)]),
        )
        .unwrap();

    sim.run().unwrap();

    let agent = sim.agent(publisher).unwrap();
    let order: Vec<u64> = agent.queue().iter().map(|t| t.id.get()).collect();
    assert_eq!(order, vec![1, 0]);
    assert_eq!(agent.queue_len(), 2);
    assert!(sim.transport().is_empty());
    assert_eq!(sink.count("[TASKS]"), 0);
    assert_eq!(sim.metrics.unmatched(), 1);
}

#[test]
fn scenario_c_out_of_bounds_position_is_rejected_before_scheduling() {
    let config = stationary_config(5).with_mobility(MobilityConfig::default());
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    let id = sim
        .add_agent(Layer::Publisher, Capacity::new(4, 4), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    sim.start().unwrap();
    let pending = sim.events().len();

    let err = sim.set_position(id, Vec2::new(150.0, 50.0)).unwrap_err();
    assert!(matches!(err, MobilityError::OutOfBounds { .. }));
    assert_eq!(sim.events().len(), pending);
    assert_eq!(sim.agent(id).unwrap().position(sim.now()), Vec2::new(50.0, 50.0));
}

#[test]
fn out_of_bounds_start_is_rejected() {
    let config = stationary_config(5);
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    let err = sim.add_agent(Layer::Worker, Capacity::new(1, 1), Vec2::new(-5.0, 0.0), VecDeque::new());
    assert!(err.is_err());
    assert!(sim.agents().is_empty());
}

#[test]
fn matched_task_forms_full_mesh_and_logs_lifecycle() {
    let config = stationary_config(3);
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    let sink = MemorySink::new();
    sim.add_sink(Box::new(sink.clone()));

    sim.add_agent(Layer::Worker, Capacity::new(4, 6), Vec2::new(55.0, 50.0), VecDeque::new())
        .unwrap();
    sim.add_agent(Layer::Worker, Capacity::new(4, 6), Vec2::new(45.0, 50.0), VecDeque::new())
        .unwrap();
    let publisher = sim
        .add_agent(
            Layer::Publisher,
            Capacity::new(2, 2),
            Vec2::new(50.0, 50.0),
            tasks(&[(0, 8, 12, 4)]),
        )
        .unwrap();

    sim.run().unwrap();

    assert_eq!(sim.agent(publisher).unwrap().queue_len(), 0);
    // One subnet, three links for a group of three.
    assert_eq!(sim.transport().subnets(), 1);
    assert_eq!(sim.transport().links(), 3);
    assert_eq!(sink.count("[JOBS]"), 3);
    assert_eq!(sink.count("[CANDIDATES]"), 2);

    let task = sink
        .records()
        .into_iter()
        .find_map(|r| match r {
            LogRecord::Task(t) => Some(t),
            _ => None,
        })
        .unwrap();
    assert_eq!(task.publisher_id, publisher.get());
    assert_eq!((task.covered_threads, task.covered_ram), (8, 12));
    assert_eq!(task.publish_time, 1.0);
    assert_eq!(task.match_start_time, 1.0);
    assert_eq!(task.match_end_time, 5.0);
}

#[test]
fn workers_only_pool_skips_other_publishers() {
    let config = stationary_config(1).with_agents(0, 2).with_pool(PoolScope::Workers);
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    sim.add_agent(Layer::Publisher, Capacity::new(8, 8), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    let needy = sim
        .add_agent(Layer::Publisher, Capacity::new(1, 1), Vec2::new(51.0, 50.0), tasks(&[(0, 4, 4, 1)]))
        .unwrap();

    sim.run().unwrap();
    assert_eq!(sim.agent(needy).unwrap().queue_len(), 1);
    assert!(sim.transport().is_empty());
}

#[test]
fn transport_failure_reaches_the_caller() {
    let config = stationary_config(3);
    let mut sim = Simulation::with_transport(config, RefusingTransport).unwrap();
    sim.add_agent(Layer::Worker, Capacity::new(4, 4), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    let publisher = sim
        .add_agent(Layer::Publisher, Capacity::new(1, 1), Vec2::new(50.0, 50.0), tasks(&[(0, 4, 4, 1)]))
        .unwrap();

    let err = sim.run().unwrap_err();
    assert!(err.to_string().contains("refused"), "{err}");

    // The task goes back to the head of the queue, so nothing is lost.
    let agent = sim.agent(publisher).unwrap();
    assert_eq!(agent.queue_len(), 1);
    assert_eq!(agent.queue()[0].id, TaskId::new(0));
    assert_eq!(sim.queued_tasks() + sim.metrics.matched() as usize, 1);
}

#[test]
fn workers_cannot_take_tasks() {
    let config = stationary_config(50);
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    let worker = sim
        .add_agent(Layer::Worker, Capacity::new(4, 4), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    sim.add_agent(Layer::Worker, Capacity::new(8, 8), Vec2::new(52.0, 50.0), VecDeque::new())
        .unwrap();

    let err = sim.enqueue_task(worker, 4, 4, SimTime::from_secs(1)).unwrap_err();
    assert!(err.to_string().contains("not a publisher"), "{err}");
    assert_eq!(sim.agent(worker).unwrap().queue_len(), 0);

    let seeded = sim.add_agent(Layer::Worker, Capacity::new(4, 4), Vec2::new(50.0, 50.0), tasks(&[(9, 1, 1, 1)]));
    assert!(seeded.is_err());
    assert_eq!(sim.agents().len(), 2);
}

#[test]
fn tasks_enqueued_before_start_are_reported() {
    let config = stationary_config(3);
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    let sink = MemorySink::new();
    sim.add_sink(Box::new(sink.clone()));
    sim.add_agent(Layer::Worker, Capacity::new(4, 4), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    let publisher = sim
        .add_agent(Layer::Publisher, Capacity::new(1, 1), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    sim.enqueue_task(publisher, 4, 4, SimTime::from_secs(1)).unwrap();

    sim.run().unwrap();

    let node = sink
        .records()
        .into_iter()
        .find_map(|r| match r {
            LogRecord::Node(n) if n.id == publisher.get() => Some(n),
            _ => None,
        })
        .unwrap();
    assert_eq!(node.initial_queue_length, 1);

    let report = taskmesh::metrics::analyzer::analyze("pre", &sink.records(), &sim.metrics.get_snapshots());
    assert_eq!((report.tasks_matched, report.tasks_total), (1, 1));
    assert_eq!(report.match_rate, 1.0);
}

#[test]
fn oversized_budget_matches_without_blowing_up() {
    let config = stationary_config(2);
    let mut sim = Simulation::with_transport(config, RecordingTransport::new()).unwrap();
    sim.add_agent(Layer::Worker, Capacity::new(16, 16), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    sim.add_agent(Layer::Worker, Capacity::new(8, 4), Vec2::new(55.0, 50.0), VecDeque::new())
        .unwrap();
    let publisher = sim
        .add_agent(Layer::Publisher, Capacity::new(1, 1), Vec2::new(50.0, 50.0), VecDeque::new())
        .unwrap();
    sim.enqueue_task(publisher, 20_000, 20_000, SimTime::from_secs(1)).unwrap();

    sim.run().unwrap();
    assert_eq!(sim.agent(publisher).unwrap().queue_len(), 0);
    assert_eq!(sim.transport().links(), 3);
}

#[test]
fn closed_system_conserves_tasks() {
    for seed in 0..5 {
        let sink = MemorySink::new();
        let mut sim = Simulation::new(SimConfig::default().with_seed(seed).with_agents(6, 3))
            .unwrap()
            .with_sink(sink.clone());
        let initial = sim.queued_tasks();

        let mut t = 0;
        while t < 100 {
            t += 10;
            sim.run_until(SimTime::from_secs(t)).unwrap();
            assert_eq!(sim.queued_tasks() + sim.metrics.matched() as usize, initial);
        }
        sim.finish().unwrap();
        assert_eq!(sim.queued_tasks() + sink.count("[TASKS]"), initial);
    }
}

#[test]
fn same_seed_same_event_log() {
    let run = |seed| {
        let sink = MemorySink::new();
        let mut sim = Simulation::new(SimConfig::default().with_seed(seed))
            .unwrap()
            .with_sink(sink.clone());
        sim.run().unwrap();
        sink.records()
    };
    assert_eq!(run(21), run(21));
}

#[test]
fn logged_positions_stay_in_bounds() {
    let sink = MemorySink::new();
    let mut sim = Simulation::new(SimConfig::default().with_seed(4).with_agents(10, 2))
        .unwrap()
        .with_sink(sink.clone());
    sim.run().unwrap();

    let bounds = sim.config().mobility.bounds;
    let mut seen = 0;
    for record in sink.records() {
        if let LogRecord::Position(p) = record {
            assert!(bounds.contains(Vec2::new(p.x, p.y)), "{p:?}");
            seen += 1;
        }
    }
    // 12 agents, once per second for 100 seconds.
    assert_eq!(seen, 12 * 100);
    assert_eq!(sim.metrics.position_samples(), seen as u64);
}
