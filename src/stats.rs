use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::UInt;
use crate::window::BoundedWindow;

pub const EPISODE_HISTORY_CAPACITY: usize = 50;
pub const RECENT_WINDOW_CAPACITY: usize = 10;
pub const EARLY_SAMPLE_SIZE: usize = 10;
/// Samples needed in both the early set and the recent window before a trend is reported.
pub const MIN_TREND_SAMPLES: usize = 5;
pub const TREND_THRESHOLD: f64 = 0.15;

/// Outcome of one finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub episode: UInt,
    pub steps: UInt,
    /// Goal reached, as opposed to truncation by the step cap.
    pub success: bool,
    pub total_reward: f64,
}

/// The fewest-steps successful episode so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRun {
    pub episode: UInt,
    pub steps: UInt,
    pub reward: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    #[default]
    Learning,
    Improving,
    Declining,
    Stable,
}

/// Running summary of completed episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub best_run: Option<BestRun>,
    /// Mean steps over the last (up to) 10 successful episodes.
    pub recent_average: f64,
    /// Mean steps over the first (up to) 10 successful episodes.
    pub early_average: f64,
    pub trend: Trend,
    pub successful_runs: UInt,
    pub failed_runs: UInt,
    pub recent_successful_episodes: BoundedWindow<UInt>,
    pub episode_history: BoundedWindow<EpisodeResult>,
    early_samples: Vec<UInt>,
}

impl Default for LearningStats {
    fn default() -> Self {
        LearningStats {
            best_run: None,
            recent_average: 0.0,
            early_average: 0.0,
            trend: Trend::Learning,
            successful_runs: 0,
            failed_runs: 0,
            recent_successful_episodes: BoundedWindow::new(RECENT_WINDOW_CAPACITY),
            episode_history: BoundedWindow::new(EPISODE_HISTORY_CAPACITY),
            early_samples: Vec::with_capacity(EARLY_SAMPLE_SIZE),
        }
    }
}

impl LearningStats {
    pub fn new() -> Self {
        LearningStats::default()
    }

    pub fn early_samples(&self) -> &[UInt] {
        &self.early_samples
    }

    pub fn total_runs(&self) -> UInt {
        self.successful_runs + self.failed_runs
    }

    /// Fold one finished episode into the summary.
    ///
    /// Failures only bump `failed_runs`; averages and trend move on success alone.
    pub fn record(&mut self, result: EpisodeResult) {
        self.episode_history.push(result.clone());

        if !result.success {
            self.failed_runs += 1;
            return;
        }
        self.successful_runs += 1;

        if self
            .best_run
            .as_ref()
            .is_none_or(|best| result.steps < best.steps)
        {
            self.best_run = Some(BestRun {
                episode: result.episode,
                steps: result.steps,
                reward: result.total_reward,
            });
        }

        if self.early_samples.len() < EARLY_SAMPLE_SIZE {
            self.early_samples.push(result.steps);
            self.early_average = mean(self.early_samples.iter());
        }

        self.recent_successful_episodes.push(result.steps);
        self.recent_average = mean(self.recent_successful_episodes.iter());

        self.trend = self.classify();
    }

    fn classify(&self) -> Trend {
        if self.recent_successful_episodes.len() < MIN_TREND_SAMPLES
            || self.early_samples.len() < MIN_TREND_SAMPLES
        {
            return Trend::Learning;
        }
        let ratio = (self.early_average - self.recent_average) / self.early_average;
        if ratio > TREND_THRESHOLD {
            Trend::Improving
        } else if ratio < -TREND_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

fn mean<'a>(values: impl ExactSizeIterator<Item = &'a UInt>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.map(|&v| v as f64).sum::<f64>() / n as f64
}
