use crate::game::timeline::{SpeedSegment, SpeedTimeline};

// --- Step / time / offset conversions ---
//
// A step is one beat of its segment's BPM. The BPM sign only affects the
// scroll direction, never the elapsed time. All math is f32 so repeated
// calls agree with the rest of the engine's timing.

pub const MS_PER_MINUTE: f32 = 60_000.0;

/// Milliseconds needed to cross one step of this segment. Frozen segments
/// cost nothing.
#[inline(always)]
pub fn ms_per_step(bpm: i32) -> f32 {
    if bpm == 0 {
        0.0
    } else {
        MS_PER_MINUTE / bpm.unsigned_abs() as f32
    }
}

#[inline(always)]
fn segment_len(segments: &[SpeedSegment], i: usize) -> f32 {
    (segments[i + 1].step - segments[i].step) as f32
}

pub fn steps_to_milliseconds(steps: f32, timeline: &SpeedTimeline) -> f32 {
    let Some(active) = timeline.index_active_at(steps) else {
        return 0.0;
    };
    let segments = timeline.segments();
    let mut ms = 0.0_f32;
    for i in 0..active {
        ms += segment_len(segments, i) * ms_per_step(segments[i].bpm);
    }
    let seg = segments[active];
    ms + (steps - seg.step as f32) * ms_per_step(seg.bpm)
}

pub fn milliseconds_to_steps(ms: f32, timeline: &SpeedTimeline) -> f32 {
    let segments = timeline.segments();
    let Some(last) = segments.len().checked_sub(1) else {
        return 0.0;
    };
    let mut remaining = ms;
    for (i, seg) in segments.iter().enumerate() {
        let per_step = ms_per_step(seg.bpm);
        if i == last {
            if per_step == 0.0 {
                return seg.step as f32;
            }
            return seg.step as f32 + remaining / per_step;
        }
        if per_step == 0.0 {
            continue;
        }
        let duration = segment_len(segments, i) * per_step;
        if remaining < duration {
            return seg.step as f32 + remaining / per_step;
        }
        remaining -= duration;
    }
    0.0
}

pub fn steps_to_offset(steps: f32, timeline: &SpeedTimeline) -> f32 {
    let Some(active) = timeline.index_active_at(steps) else {
        return 0.0;
    };
    let segments = timeline.segments();
    let mut offset = 0.0_f32;
    for i in 0..active {
        offset += segment_len(segments, i) * segments[i].direction() as f32;
    }
    let seg = segments[active];
    offset + (steps - seg.step as f32) * seg.direction() as f32
}

/// Counts BPM sign changes between consecutive segments up to the one
/// active at `steps`.
pub fn steps_to_direction_layer(steps: f32, timeline: &SpeedTimeline) -> i32 {
    let Some(active) = timeline.index_active_at(steps) else {
        return 0;
    };
    let segments = timeline.segments();
    let mut layer = 0;
    for i in 1..=active {
        if segments[i].direction() != segments[i - 1].direction() {
            layer += 1;
        }
    }
    layer
}

/// Finds the step that scrolls to `offset` on the given direction layer.
///
/// Segments are scanned from the end backward; the last segment on the
/// requested layer whose span reaches `offset` wins. The first segment
/// extends backward into the lead-in and the last one extends forever.
/// Returns `None` when no segment of that layer passes through `offset`.
pub fn offset_to_steps(offset: f32, direction_layer: i32, timeline: &SpeedTimeline) -> Option<f32> {
    let segments = timeline.segments();
    if segments.is_empty() || !offset.is_finite() {
        return None;
    }

    // Forward pass: offset and layer at the start of every segment.
    let mut starts: Vec<(f32, i32)> = Vec::with_capacity(segments.len());
    let mut cum_offset = 0.0_f32;
    let mut layer = 0;
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            let prev = segments[i - 1];
            cum_offset += segment_len(segments, i - 1) * prev.direction() as f32;
            if seg.direction() != prev.direction() {
                layer += 1;
            }
        }
        starts.push((cum_offset, layer));
    }

    let last = segments.len() - 1;
    for i in (0..segments.len()).rev() {
        let (seg_offset, seg_layer) = starts[i];
        if seg_layer != direction_layer {
            continue;
        }
        let seg = segments[i];
        let dir = seg.direction();
        if dir == 0 {
            if offset == seg_offset {
                return Some(seg.step as f32);
            }
            continue;
        }
        let step = seg.step as f32 + (offset - seg_offset) * dir as f32;
        let after_start = i == 0 || step >= seg.step as f32;
        let before_end = i == last || step <= segments[i + 1].step as f32;
        if after_start && before_end {
            return Some(step);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reversal() -> SpeedTimeline {
        SpeedTimeline::from_pairs([(0, 120), (96, -120)])
    }

    fn mixed() -> SpeedTimeline {
        SpeedTimeline::from_pairs([(0, 120), (32, 240), (48, -90), (80, 60), (100, 175)])
    }

    #[test]
    fn flat_120_bpm_scenario() {
        let tl = SpeedTimeline::constant(120);
        assert_eq!(steps_to_milliseconds(192.0, &tl), 96_000.0);
        assert_eq!(milliseconds_to_steps(96_000.0, &tl), 192.0);
        assert_eq!(steps_to_offset(192.0, &tl), 192.0);
    }

    #[test]
    fn direction_reversal_scenario() {
        let tl = reversal();
        assert_eq!(steps_to_direction_layer(50.0, &tl), 0);
        assert_eq!(steps_to_direction_layer(150.0, &tl), 1);
        // Time keeps flowing forward while the scroll runs backward.
        assert_eq!(steps_to_milliseconds(150.0, &tl), 75_000.0);
        assert_eq!(steps_to_offset(150.0, &tl), 96.0 - 54.0);
    }

    #[test]
    fn round_trip_steps_through_milliseconds() {
        for tl in [SpeedTimeline::constant(120), reversal(), mixed()] {
            let mut s = 0.0_f32;
            while s < 300.0 {
                let ms = steps_to_milliseconds(s, &tl);
                let back = milliseconds_to_steps(ms, &tl);
                assert!((back - s).abs() <= 1e-3, "steps {s} -> {ms}ms -> {back}");
                s += 0.75;
            }
        }
    }

    #[test]
    fn milliseconds_are_monotonic_for_positive_timelines() {
        let tl = SpeedTimeline::from_pairs([(0, 90), (16, 300), (40, 150), (41, 600)]);
        let mut prev = f32::NEG_INFINITY;
        for i in -40..400 {
            let ms = steps_to_milliseconds(i as f32 * 0.25, &tl);
            assert!(ms >= prev, "time went backwards at step {}", i as f32 * 0.25);
            prev = ms;
        }
    }

    #[test]
    fn frozen_segments_cost_no_time_or_offset() {
        let tl = SpeedTimeline::from_pairs([(0, 120), (10, 0), (20, 120)]);
        assert_eq!(steps_to_milliseconds(10.0, &tl), 5_000.0);
        assert_eq!(steps_to_milliseconds(15.0, &tl), 5_000.0);
        assert_eq!(steps_to_milliseconds(20.0, &tl), 5_000.0);
        assert_eq!(steps_to_milliseconds(22.0, &tl), 6_000.0);
        assert_eq!(steps_to_offset(15.0, &tl), 10.0);
        assert_eq!(steps_to_offset(22.0, &tl), 12.0);
        // Crossing the freeze is instantaneous.
        assert_eq!(milliseconds_to_steps(5_000.0, &tl), 20.0);
        assert_eq!(milliseconds_to_steps(5_500.0, &tl), 21.0);
    }

    #[test]
    fn frozen_last_segment_pins_steps() {
        let tl = SpeedTimeline::from_pairs([(0, 120), (8, 0)]);
        assert_eq!(milliseconds_to_steps(1_000_000.0, &tl), 8.0);
    }

    #[test]
    fn negative_time_maps_to_lead_in_steps() {
        let tl = SpeedTimeline::constant(120);
        assert_eq!(milliseconds_to_steps(-1_000.0, &tl), -2.0);
        assert_eq!(steps_to_milliseconds(-2.0, &tl), -1_000.0);
        assert_eq!(steps_to_offset(-2.0, &tl), -2.0);
    }

    #[test]
    fn direction_layer_only_changes_at_sign_flips() {
        let tl = mixed();
        let mut prev = 0;
        let mut s = -5.0_f32;
        while s < 200.0 {
            let layer = steps_to_direction_layer(s, &tl);
            assert!(layer >= prev);
            if layer != prev {
                let seg = tl.segment_active_at(s).unwrap();
                assert!([48, 80].contains(&seg.step), "layer changed inside segment at {s}");
            }
            prev = layer;
            s += 0.5;
        }
        assert_eq!(steps_to_direction_layer(199.0, &tl), 2);
    }

    #[test]
    fn offset_to_steps_inverts_offsets_per_layer() {
        let tl = reversal();
        assert_eq!(offset_to_steps(80.0, 0, &tl), Some(80.0));
        assert_eq!(offset_to_steps(80.0, 1, &tl), Some(112.0));
        assert_eq!(offset_to_steps(80.0, 2, &tl), None);
        // Lead-in before the first segment stays reachable on layer 0.
        assert_eq!(offset_to_steps(-4.0, 0, &tl), Some(-4.0));
        // Offsets above the turning point are never reached on layer 1.
        assert_eq!(offset_to_steps(100.0, 1, &tl), None);

        let tl = mixed();
        let mut s = 0.0_f32;
        while s < 150.0 {
            let off = steps_to_offset(s, &tl);
            let layer = steps_to_direction_layer(s, &tl);
            let back = offset_to_steps(off, layer, &tl).expect("offset on own layer");
            assert!(
                (steps_to_offset(back, &tl) - off).abs() <= 1e-3
                    && steps_to_direction_layer(back, &tl) == layer,
                "step {s} -> offset {off} layer {layer} -> {back}"
            );
            s += 1.0;
        }
    }

    #[test]
    fn empty_timeline_is_neutral() {
        let tl = SpeedTimeline::default();
        assert_eq!(steps_to_milliseconds(12.0, &tl), 0.0);
        assert_eq!(milliseconds_to_steps(12.0, &tl), 0.0);
        assert_eq!(steps_to_offset(12.0, &tl), 0.0);
        assert_eq!(steps_to_direction_layer(12.0, &tl), 0);
        assert_eq!(offset_to_steps(12.0, 0, &tl), None);
    }
}
