// One publish firing for one agent:
//
//   Idle -> Querying -> Matching -> Matched | Unmatched -> Idle
//
// The cycle only touches the publisher's own queue. Everything it knows about
// other agents comes from a read-only snapshot taken at the firing instant.

use crate::agent::{Agent, AgentId, Capacity};
use crate::geometry::Vec2;
use crate::matcher::{self, Candidate, MatchResult};
use crate::neighbor::{NeighborQuery, Sighting};
use crate::network::{AddressSeed, GroupPlan};
use crate::task::{Task, TaskId};
use crate::time::SimTime;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Querying,
    Matching,
    Matched,
    Unmatched,
}

impl CyclePhase {
    pub fn can_enter(self, next: CyclePhase) -> bool {
        use CyclePhase::*;
        matches!(
            (self, next),
            (Idle, Querying)
                | (Querying, Matching)
                | (Matching, Matched)
                | (Matching, Unmatched)
                | (Matched, Idle)
                | (Unmatched, Idle)
        )
    }
}

/// What another agent looks like to a publisher at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolMember {
    pub id: AgentId,
    pub position: Vec2,
    pub capacity: Capacity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Nothing queued.
    Idle,
    Matched {
        task: Task,
        seed: AddressSeed,
        neighbors: Vec<AgentId>,
        result: MatchResult,
        plan: GroupPlan,
    },
    Unmatched {
        task_id: TaskId,
        seed: AddressSeed,
        neighbors: Vec<AgentId>,
    },
}

impl PublishOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, PublishOutcome::Matched { .. })
    }
}

/// Runs one firing of `agent`'s cycle against `pool`.
pub fn publish(
    agent: &mut Agent,
    pool: &[PoolMember],
    query: &NeighborQuery,
    now: SimTime,
) -> PublishOutcome {
    let Some(head) = agent.head_mut() else {
        return PublishOutcome::Idle;
    };
    head.mark_attempt(now);
    let task_id = head.id;
    let budget = Capacity::new(head.threads, head.ram);

    agent.enter(CyclePhase::Querying);
    let here = agent.position(now);
    let seed = AddressSeed::derive(here, agent.id());
    let sightings: Vec<Sighting> = pool
        .iter()
        .filter(|m| m.id != agent.id())
        .map(|m| Sighting {
            id: m.id,
            position: m.position,
        })
        .collect();
    let neighbors = query.query(here, &sightings);

    agent.enter(CyclePhase::Matching);
    let candidates: Vec<Candidate> = pool
        .iter()
        .filter(|m| neighbors.contains(&m.id))
        .map(|m| Candidate {
            id: m.id,
            capacity: m.capacity,
        })
        .collect();
    let result = matcher::select(budget, &candidates);

    let outcome = if !result.is_empty() && result.fits(budget) {
        agent.enter(CyclePhase::Matched);
        match agent.take_head() {
            Some(task) => {
                debug!(
                    agent = agent.id().get(),
                    task = task.id.get(),
                    members = result.selected.len(),
                    threads = result.covered_threads,
                    ram = result.covered_ram,
                    "task matched"
                );
                let plan = GroupPlan::new(agent.id(), task.id, seed, result.members(), task.duration);
                PublishOutcome::Matched {
                    task,
                    seed,
                    neighbors,
                    result,
                    plan,
                }
            }
            // head_mut above proved the queue non-empty
            None => PublishOutcome::Idle,
        }
    } else {
        agent.enter(CyclePhase::Unmatched);
        agent.rotate_head();
        debug!(
            agent = agent.id().get(),
            task = task_id.get(),
            neighbors = neighbors.len(),
            "no feasible group, task requeued"
        );
        PublishOutcome::Unmatched {
            task_id,
            seed,
            neighbors,
        }
    };

    agent.enter(CyclePhase::Idle);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Layer;
    use crate::geometry::Rectangle;
    use crate::mobility::Stationary;
    use std::collections::VecDeque;

    fn publisher(tasks: &[(u32, u32)]) -> Agent {
        let queue: VecDeque<Task> = tasks
            .iter()
            .enumerate()
            .map(|(i, &(t, r))| {
                Task::new(TaskId::new(i as u64), t, r, SimTime::from_secs(2), SimTime::ZERO).unwrap()
            })
            .collect();
        let mobility = Stationary::new(Rectangle::default(), Vec2::new(50.0, 50.0)).unwrap();
        Agent::new(AgentId::new(0), Layer::Publisher, Capacity::new(4, 4), Box::new(mobility), queue).unwrap()
    }

    fn member(id: u32, x: f64, threads: u32, ram: u32) -> PoolMember {
        PoolMember {
            id: AgentId::new(id),
            position: Vec2::new(x, 50.0),
            capacity: Capacity::new(threads, ram),
        }
    }

    #[test]
    fn phase_graph() {
        assert!(CyclePhase::Idle.can_enter(CyclePhase::Querying));
        assert!(CyclePhase::Matching.can_enter(CyclePhase::Unmatched));
        assert!(!CyclePhase::Idle.can_enter(CyclePhase::Matched));
        assert!(!CyclePhase::Matched.can_enter(CyclePhase::Unmatched));
    }

    #[test]
    fn empty_queue_is_idle() {
        let mut agent = publisher(&[]);
        let outcome = publish(&mut agent, &[member(1, 50.0, 4, 4)], &NeighborQuery::default(), SimTime::ZERO);
        assert_eq!(outcome, PublishOutcome::Idle);
        assert_eq!(agent.phase(), CyclePhase::Idle);
    }

    #[test]
    fn match_removes_head() {
        let mut agent = publisher(&[(8, 8), (2, 2)]);
        let pool = [member(1, 60.0, 4, 4), member(2, 40.0, 4, 4)];
        let outcome = publish(&mut agent, &pool, &NeighborQuery::default(), SimTime::from_secs(1));

        match outcome {
            PublishOutcome::Matched { task, result, plan, .. } => {
                assert_eq!(task.id, TaskId::new(0));
                assert_eq!((result.covered_threads, result.covered_ram), (8, 8));
                assert_eq!(plan.members.len(), 3);
                assert_eq!(plan.duration, SimTime::from_secs(2));
            }
            other => panic!("expected a match, got {other:?}"),
        }
        assert_eq!(agent.queue_len(), 1);
        assert_eq!(agent.queue()[0].id, TaskId::new(1));
        assert_eq!(agent.phase(), CyclePhase::Idle);
    }

    #[test]
    fn out_of_range_members_are_ignored() {
        let mut agent = publisher(&[(4, 4)]);
        let pool = [member(1, 99.0, 4, 4)];
        let outcome = publish(&mut agent, &pool, &NeighborQuery::new(10.0), SimTime::ZERO);
        assert!(matches!(outcome, PublishOutcome::Unmatched { ref neighbors, .. } if neighbors.is_empty()));
    }

    #[test]
    fn unmatched_rotates_head_to_tail() {
        let mut agent = publisher(&[(64, 64), (2, 2), (3, 3)]);
        let pool = [member(1, 50.0, 100, 100)];
        let outcome = publish(&mut agent, &pool, &NeighborQuery::default(), SimTime::ZERO);

        assert!(!outcome.is_matched());
        let ids: Vec<u64> = agent.queue().iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert_eq!(agent.queue()[2].attempts(), 1);
    }

    #[test]
    fn publisher_is_excluded_from_its_own_pool() {
        let mut agent = publisher(&[(4, 4)]);
        let pool = [member(0, 50.0, 4, 4)];
        let outcome = publish(&mut agent, &pool, &NeighborQuery::default(), SimTime::ZERO);
        assert!(!outcome.is_matched());
    }
}
