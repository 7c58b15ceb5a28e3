use crate::game::note::{Note, Outcome};
use crate::game::timeline::SpeedTimeline;
use crate::game::timing::ms_per_step;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TimingStats {
    pub mean_abs_steps: f32,
    pub mean_steps: f32,
    pub stddev_steps: f32,
    pub max_abs_steps: f32,
    /// Mean absolute error converted with each note's local tempo.
    pub mean_abs_ms: f32,
    pub count: usize,
}

/// Step errors of every resolved, non-miss note.
#[inline(always)]
fn hit_errors<'a>(notes: &'a [Note]) -> impl Iterator<Item = (&'a Note, f32)> + 'a {
    notes.iter().filter_map(|n| {
        n.judgment()
            .filter(|j| j.outcome != Outcome::Miss)
            .map(|j| (n, j.step_error as f32))
    })
}

pub fn compute_note_timing_stats(notes: &[Note], timeline: &SpeedTimeline) -> TimingStats {
    // First pass: sums and maxima
    let mut sum_abs = 0.0_f32;
    let mut sum_signed = 0.0_f32;
    let mut sum_abs_ms = 0.0_f32;
    let mut max_abs = 0.0_f32;
    let mut count: usize = 0;

    for (n, e) in hit_errors(notes) {
        let a = e.abs();
        sum_abs += a;
        sum_signed += e;
        sum_abs_ms += a * ms_per_step(timeline.bpm_at(n.step as f32));
        if a > max_abs {
            max_abs = a;
        }
        count += 1;
    }

    if count == 0 {
        return TimingStats::default();
    }

    let mean_steps = sum_signed / (count as f32);

    // Second pass: sample standard deviation of signed errors
    let stddev_steps = if count > 1 {
        let sum_diff_sq: f32 = hit_errors(notes)
            .map(|(_, e)| {
                let d = e - mean_steps;
                d * d
            })
            .sum();
        (sum_diff_sq / ((count as f32) - 1.0)).sqrt()
    } else {
        0.0
    };

    TimingStats {
        mean_abs_steps: sum_abs / (count as f32),
        mean_steps,
        stddev_steps,
        max_abs_steps: max_abs,
        mean_abs_ms: sum_abs_ms / (count as f32),
        count,
    }
}

/// `(step_error, count)` pairs sorted by error, misses excluded.
pub fn build_error_histogram(notes: &[Note]) -> Vec<(i32, u32)> {
    let mut bins: Vec<(i32, u32)> = Vec::new();
    for (_, e) in hit_errors(notes) {
        let bin = e as i32;
        match bins.binary_search_by_key(&bin, |(b, _)| *b) {
            Ok(i) => bins[i].1 = bins[i].1.saturating_add(1),
            Err(i) => bins.insert(i, (bin, 1)),
        }
    }
    bins
}
