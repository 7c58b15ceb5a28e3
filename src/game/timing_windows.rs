// Per-note judgement windows, measured in chart steps.
//
// Windows derive from the BPM magnitude active at the note's own step, not
// from the current playback tempo: slow sections are forgiving, fast ones
// tight.

use crate::game::note::Outcome;
use crate::game::timeline::SpeedTimeline;

/// BPM span covered by each extra step of Perfect window.
pub const PERFECT_WINDOW_BPM_DIVISOR: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgementWindow {
    pub perfect: i32,
    pub ok: i32,
}

impl JudgementWindow {
    #[inline(always)]
    pub const fn from_bpm(bpm: i32) -> Self {
        let perfect = (bpm.unsigned_abs() / PERFECT_WINDOW_BPM_DIVISOR) as i32;
        let ok = 1 + perfect + perfect / 2;
        Self { perfect, ok }
    }

    /// Window for a note placed at `step`.
    #[inline(always)]
    pub fn for_note(step: i32, timeline: &SpeedTimeline) -> Self {
        Self::from_bpm(timeline.bpm_at(step as f32))
    }

    /// Outermost distance at which input is still accepted.
    #[inline(always)]
    pub const fn miss(&self) -> i32 {
        self.ok + 1
    }

    /// Classifies an absolute step distance.
    #[inline(always)]
    pub const fn classify(&self, distance: i32) -> Outcome {
        let abs = distance.abs();
        if abs <= self.perfect {
            Outcome::Perfect
        } else if abs <= self.ok {
            Outcome::Ok
        } else {
            Outcome::Miss
        }
    }
}
