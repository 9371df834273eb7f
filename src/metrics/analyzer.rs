use super::MetricsSnapshot;
use super::records::LogRecord;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub name: String,
    pub tasks_total: usize,
    pub tasks_matched: usize,
    pub match_rate: f64,
    /// Mean seconds between first publish and match start.
    pub avg_wait_s: f64,
    pub avg_group_size: f64,
    /// Mean covered/required ratio, threads.
    pub avg_thread_coverage: f64,
    pub avg_ram_coverage: f64,
    pub publish_events: u64,
    pub unmatched_attempts: u64,
    /// Agents in range per publish attempt.
    pub avg_candidates: f64,
    pub resamples: u64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n > 0 { sum / n as f64 } else { 0.0 }
}

pub fn analyze(name: &str, records: &[LogRecord], snapshots: &[MetricsSnapshot]) -> AnalysisReport {
    let last = snapshots.last();
    let seeded: usize = records
        .iter()
        .filter_map(|r| match r {
            LogRecord::Node(n) => Some(n.initial_queue_length),
            _ => None,
        })
        .sum();
    let late = last.map(|s| s.tasks_enqueued as usize).unwrap_or(0);

    let tasks: Vec<_> = records
        .iter()
        .filter_map(|r| match r {
            LogRecord::Task(t) => Some(t),
            _ => None,
        })
        .collect();

    let mut groups: BTreeMap<u64, BTreeSet<u32>> = BTreeMap::new();
    for record in records {
        if let LogRecord::Job(j) = record {
            let members = groups.entry(j.task_id).or_default();
            members.insert(j.member_i);
            members.insert(j.member_j);
        }
    }

    let tasks_matched = tasks.len();
    // A sink attached mid-run may have missed some [NODES] lines.
    let tasks_total = (seeded + late).max(tasks_matched);
    let attempts = last.map(|s| s.matched + s.unmatched).unwrap_or(0);

    AnalysisReport {
        name: name.to_string(),
        tasks_total,
        tasks_matched,
        match_rate: if tasks_total > 0 {
            tasks_matched as f64 / tasks_total as f64
        } else {
            0.0
        },
        avg_wait_s: mean(tasks.iter().map(|t| t.match_start_time - t.publish_time)),
        avg_group_size: mean(groups.values().map(|m| m.len() as f64)),
        avg_thread_coverage: mean(tasks.iter().map(|t| t.covered_threads as f64 / t.threads as f64)),
        avg_ram_coverage: mean(tasks.iter().map(|t| t.covered_ram as f64 / t.ram as f64)),
        publish_events: last.map(|s| s.publish_events).unwrap_or(0),
        unmatched_attempts: last.map(|s| s.unmatched).unwrap_or(0),
        avg_candidates: match last {
            Some(s) if attempts > 0 => s.candidates_seen as f64 / attempts as f64,
            _ => 0.0,
        },
        resamples: last.map(|s| s.resamples).unwrap_or(0),
    }
}

pub fn average_reports(name: &str, reports: &[AnalysisReport]) -> AnalysisReport {
    let avg = |f: fn(&AnalysisReport) -> f64| mean(reports.iter().map(f));
    let n = reports.len().max(1);

    AnalysisReport {
        name: name.to_string(),
        tasks_total: reports.iter().map(|r| r.tasks_total).sum::<usize>() / n,
        tasks_matched: reports.iter().map(|r| r.tasks_matched).sum::<usize>() / n,
        match_rate: avg(|r| r.match_rate),
        avg_wait_s: avg(|r| r.avg_wait_s),
        avg_group_size: avg(|r| r.avg_group_size),
        avg_thread_coverage: avg(|r| r.avg_thread_coverage),
        avg_ram_coverage: avg(|r| r.avg_ram_coverage),
        publish_events: reports.iter().map(|r| r.publish_events).sum::<u64>() / n as u64,
        unmatched_attempts: reports.iter().map(|r| r.unmatched_attempts).sum::<u64>() / n as u64,
        avg_candidates: avg(|r| r.avg_candidates),
        resamples: reports.iter().map(|r| r.resamples).sum::<u64>() / n as u64,
    }
}

pub fn save_report(report: &AnalysisReport, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

pub fn load_reports(dir: impl AsRef<Path>) -> Result<Vec<AnalysisReport>> {
    let mut reports = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json")
            && path.to_string_lossy().contains("analysis")
        {
            let content = std::fs::read_to_string(&path)?;
            reports.push(serde_json::from_str(&content)?);
        }
    }
    reports.sort_by(|a: &AnalysisReport, b| a.name.cmp(&b.name));
    Ok(reports)
}

pub fn comparison_table(reports: &[AnalysisReport]) {
    println!("\n╔════════════════════╦═══════════╦═══════════╦═══════════╦════════════╦════════════╗");
    println!("║ Run                ║ Matched   ║ Rate      ║ Wait      ║ Group size ║ Thread cov ║");
    println!("║                    ║ (tasks)   ║ (%)       ║ (s)       ║ (agents)   ║ (%)        ║");
    println!("╠════════════════════╬═══════════╬═══════════╬═══════════╬════════════╬════════════╣");

    for report in reports {
        println!(
            "║ {:<18} ║ {:>4}/{:<4} ║ {:>8.1}% ║ {:>9.2} ║ {:>10.2} ║ {:>9.1}% ║",
            report.name,
            report.tasks_matched,
            report.tasks_total,
            report.match_rate * 100.0,
            report.avg_wait_s,
            report.avg_group_size,
            report.avg_thread_coverage * 100.0,
        );
    }

    println!("╚════════════════════╩═══════════╩═══════════╩═══════════╩════════════╩════════════╝\n");

    if let Some(best) = reports
        .iter()
        .max_by(|a, b| a.match_rate.total_cmp(&b.match_rate))
    {
        println!("Best match rate: {} ({:.1}%)", best.name, best.match_rate * 100.0);
    }
    println!();
}
