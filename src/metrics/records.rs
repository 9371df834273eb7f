// Line records consumed by offline analysis. Field order is part of the
// contract with downstream tooling; append new fields at the end only.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub layer: u8,
    pub id: u32,
    pub ram: u32,
    pub threads: u32,
    pub initial_queue_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub layer: u8,
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub publisher_id: u32,
    pub task_id: u64,
    pub addr_a: u8,
    pub addr_b: u8,
    pub neighbor_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub publisher_id: u32,
    pub task_id: u64,
    pub addr_a: u8,
    pub addr_b: u8,
    pub member_i: u32,
    pub member_j: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub layer: u8,
    pub publisher_id: u32,
    pub task_id: u64,
    pub ram: u32,
    pub threads: u32,
    pub duration: f64,
    pub publish_time: f64,
    pub match_start_time: f64,
    pub match_end_time: f64,
    pub covered_ram: u32,
    pub covered_threads: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    Node(NodeRecord),
    Position(PositionRecord),
    Candidate(CandidateRecord),
    Job(JobRecord),
    Task(TaskRecord),
}

impl LogRecord {
    pub fn tag(&self) -> &'static str {
        match self {
            LogRecord::Node(_) => "[NODES]",
            LogRecord::Position(_) => "[POSITIONS]",
            LogRecord::Candidate(_) => "[CANDIDATES]",
            LogRecord::Job(_) => "[JOBS]",
            LogRecord::Task(_) => "[TASKS]",
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.tag())?;
        match self {
            LogRecord::Node(r) => write!(
                f,
                "{},{},{},{},{}",
                r.layer, r.id, r.ram, r.threads, r.initial_queue_length
            ),
            LogRecord::Position(r) => write!(
                f,
                "{},{},{:.3},{:.3},{:.3}",
                r.layer, r.id, r.x, r.y, r.timestamp
            ),
            LogRecord::Candidate(r) => write!(
                f,
                "{},{},{},{},{}",
                r.publisher_id, r.task_id, r.addr_a, r.addr_b, r.neighbor_id
            ),
            LogRecord::Job(r) => write!(
                f,
                "{},{},{},{},{},{}",
                r.publisher_id, r.task_id, r.addr_a, r.addr_b, r.member_i, r.member_j
            ),
            LogRecord::Task(r) => write!(
                f,
                "{},{},{},{},{},{:.3},{:.3},{:.3},{:.3},{},{}",
                r.layer,
                r.publisher_id,
                r.task_id,
                r.ram,
                r.threads,
                r.duration,
                r.publish_time,
                r.match_start_time,
                r.match_end_time,
                r.covered_ram,
                r.covered_threads
            ),
        }
    }
}
