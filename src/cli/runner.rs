//! Tick drivers for plan trees.
//!
//! The offline driver advances the tree by a fixed delta as fast as possible.
//! The realtime driver paces ticks with a tokio interval and feeds the
//! measured wall-clock delta of each frame.

use crate::cli::config::RunnerConfig;
use crate::task::TaskTree;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Outcome of driving a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub ticks: u64,
    pub simulated_seconds: f64,
    pub finished: bool,
}

/// Step the tree with a fixed delta until it finishes or the tick budget runs out
pub fn run_offline(tree: &mut TaskTree, config: &RunnerConfig) -> Result<RunReport> {
    config.validate()?;
    let mut report = RunReport {
        ticks: 0,
        simulated_seconds: 0.0,
        finished: tree.is_finished(),
    };

    while !report.finished && report.ticks < config.max_ticks {
        report.finished = tree.update(config.tick_seconds)?;
        report.ticks += 1;
        report.simulated_seconds += config.tick_seconds;
        render_if_due(tree, config, report.ticks);
    }

    log_outcome(&report, config);
    Ok(report)
}

/// Step the tree once per frame of `tick_seconds` wall-clock time
pub async fn run_realtime(tree: &mut TaskTree, config: &RunnerConfig) -> Result<RunReport> {
    config.validate()?;
    let mut report = RunReport {
        ticks: 0,
        simulated_seconds: 0.0,
        finished: tree.is_finished(),
    };

    let mut frames = tokio::time::interval(Duration::from_secs_f64(config.tick_seconds));
    frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately.
    let mut last = frames.tick().await;

    while !report.finished && report.ticks < config.max_ticks {
        let now: Instant = frames.tick().await;
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        report.finished = tree.update(dt)?;
        report.ticks += 1;
        report.simulated_seconds += dt;
        render_if_due(tree, config, report.ticks);
    }

    log_outcome(&report, config);
    Ok(report)
}

fn render_if_due(tree: &TaskTree, config: &RunnerConfig, tick: u64) {
    if config.render_every > 0 && tick % config.render_every == 0 {
        println!("-- tick {tick} --");
        print!("{tree}");
    }
}

fn log_outcome(report: &RunReport, config: &RunnerConfig) {
    if report.finished {
        info!(
            ticks = report.ticks,
            seconds = report.simulated_seconds,
            "plan finished"
        );
    } else {
        debug!(max_ticks = config.max_ticks, "tick budget exhausted");
        info!(ticks = report.ticks, "plan stopped before finishing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::BlockForSeconds;
    use crate::task::Task;

    fn waiting_tree(seconds: f64) -> TaskTree {
        let mut tree = TaskTree::default();
        let root = tree.root();
        tree.then(root, Task::from_behavior(BlockForSeconds::new(seconds)))
            .unwrap();
        tree
    }

    #[test]
    fn test_offline_run_counts_ticks() {
        let mut tree = waiting_tree(1.0);
        let config = RunnerConfig {
            tick_seconds: 0.25,
            ..RunnerConfig::default()
        };

        let report = run_offline(&mut tree, &config).unwrap();
        assert!(report.finished);
        // The head gets the full delta of the tick it starts in.
        assert_eq!(report.ticks, 4);
        assert!((report.simulated_seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_offline_run_stops_at_budget() {
        let mut tree = TaskTree::new(Task::infinite("forever"));
        let config = RunnerConfig {
            max_ticks: 7,
            ..RunnerConfig::default()
        };

        let report = run_offline(&mut tree, &config).unwrap();
        assert!(!report.finished);
        assert_eq!(report.ticks, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_run_measures_frames() {
        let mut tree = waiting_tree(0.5);
        let config = RunnerConfig {
            tick_seconds: 0.125,
            realtime: true,
            ..RunnerConfig::default()
        };

        let report = run_realtime(&mut tree, &config).await.unwrap();
        assert!(report.finished);
        assert_eq!(report.ticks, 4);
        assert!((report.simulated_seconds - 0.5).abs() < 1e-6);
    }
}
