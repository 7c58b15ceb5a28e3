use crate::game::chart::ChartData;
use crate::game::gameplay::StatsState;
use crate::game::note::Outcome;
use crate::game::scores::ScoreState;
use crate::game::timing_stats::{self, TimingStats};

/// End-of-run report assembled from the engine's read-only snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct StageSummary {
    pub title: String,
    pub stats_state: StatsState,
    pub score: i64,
    pub max_combo: u32,
    pub perfects: u32,
    pub oks: u32,
    pub misses: u32,
    pub accuracy: f32,
    pub health: i32,
    pub difficulty: f32,
    pub timing: TimingStats,
    /// `(step_error, count)` over non-miss judgements.
    pub error_histogram: Vec<(i32, u32)>,
}

impl StageSummary {
    pub fn from_run(chart: &ChartData, score: &ScoreState, stats_state: StatsState, difficulty: f32) -> Self {
        Self {
            title: chart.title.clone(),
            stats_state,
            score: score.score,
            max_combo: score.max_combo,
            perfects: score.count(Outcome::Perfect),
            oks: score.count(Outcome::Ok),
            misses: score.count(Outcome::Miss),
            accuracy: score.accuracy(),
            health: score.health,
            difficulty,
            timing: timing_stats::compute_note_timing_stats(&chart.notes, &chart.timeline),
            error_histogram: timing_stats::build_error_histogram(&chart.notes),
        }
    }

    #[inline(always)]
    pub fn passed(&self) -> bool {
        self.stats_state == StatsState::Pass
    }
}
