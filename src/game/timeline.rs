use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One signed-BPM speed change. Negative BPM reverses the scroll direction,
/// zero freezes visual motion and costs no time to cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedSegment {
    pub step: i32,
    pub bpm: i32,
}

impl SpeedSegment {
    #[inline(always)]
    pub const fn new(step: i32, bpm: i32) -> Self {
        Self { step, bpm }
    }

    #[inline(always)]
    pub const fn direction(&self) -> i32 {
        self.bpm.signum()
    }
}

/// Speed segments sorted ascending and unique by step. The first segment's
/// step is the chart's logical zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SpeedSegment>", into = "Vec<SpeedSegment>")]
pub struct SpeedTimeline {
    segments: Vec<SpeedSegment>,
}

impl From<Vec<SpeedSegment>> for SpeedTimeline {
    fn from(segments: Vec<SpeedSegment>) -> Self {
        Self::from_pairs(segments.into_iter().map(|s| (s.step, s.bpm)))
    }
}

impl From<SpeedTimeline> for Vec<SpeedSegment> {
    fn from(timeline: SpeedTimeline) -> Self {
        timeline.segments
    }
}

impl SpeedTimeline {
    /// Builds the canonical sequence: stable sort by step, the last pair
    /// written for a given step wins.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut segments: Vec<SpeedSegment> = pairs
            .into_iter()
            .map(|(step, bpm)| SpeedSegment::new(step, bpm))
            .collect();
        segments.sort_by_key(|s| s.step);

        let mut out: Vec<SpeedSegment> = Vec::with_capacity(segments.len());
        for seg in segments {
            match out.last_mut() {
                Some(last) if last.step == seg.step => *last = seg,
                _ => out.push(seg),
            }
        }
        Self { segments: out }
    }

    /// A single constant-speed segment starting at step 0.
    pub fn constant(bpm: i32) -> Self {
        Self {
            segments: vec![SpeedSegment::new(0, bpm)],
        }
    }

    #[inline(always)]
    pub fn segments(&self) -> &[SpeedSegment] {
        &self.segments
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline(always)]
    pub fn first_step(&self) -> i32 {
        self.segments.first().map_or(0, |s| s.step)
    }

    /// Index of the last segment whose step is `<= step`, or 0 when `step`
    /// precedes every segment. `None` only for an empty timeline.
    pub fn index_active_at(&self, step: f32) -> Option<usize> {
        if self.segments.is_empty() {
            return None;
        }
        let idx = match self.segments.binary_search_by(|s| {
            (s.step as f32)
                .partial_cmp(&step)
                .unwrap_or(Ordering::Less)
        }) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        Some(idx)
    }

    pub fn segment_active_at(&self, step: f32) -> Option<SpeedSegment> {
        self.index_active_at(step).map(|i| self.segments[i])
    }

    /// BPM of the segment active at `step`, 0 for an empty timeline.
    #[inline(always)]
    pub fn bpm_at(&self, step: f32) -> i32 {
        self.segment_active_at(step).map_or(0, |s| s.bpm)
    }

    /// Inserts or replaces the segment starting at `step`.
    pub fn set_segment(&mut self, step: i32, bpm: i32) {
        match self.segments.binary_search_by_key(&step, |s| s.step) {
            Ok(i) => self.segments[i].bpm = bpm,
            Err(i) => self.segments.insert(i, SpeedSegment::new(step, bpm)),
        }
    }

    /// Removes the segment starting exactly at `step`. Returns whether one
    /// was removed.
    pub fn remove_segment(&mut self, step: i32) -> bool {
        match self.segments.binary_search_by_key(&step, |s| s.step) {
            Ok(i) => {
                self.segments.remove(i);
                true
            }
            Err(_) => false,
        }
    }
}
