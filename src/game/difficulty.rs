use crate::game::note::{Note, NoteKind};
use crate::game::timeline::SpeedTimeline;
use crate::game::timing::steps_to_milliseconds;
use winit::keyboard::KeyCode;

// Rough physical-effort rating for a typed chart. Each hand covers a
// staggered QWERTY block; consecutive notes on the same hand cost the key
// travel distance divided by the time available between them.

pub const KEY_UNIT_PX: f32 = 40.0;
/// Columns `0..LEFT_HAND_COLUMNS` of every row belong to the left hand.
pub const LEFT_HAND_COLUMNS: usize = 5;

const ROW_STAGGER: [f32; 4] = [0.0, 0.5, 0.75, 1.25];

const ROWS: [&[KeyCode]; 4] = [
    &[
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
        KeyCode::Digit0,
        KeyCode::Minus,
        KeyCode::Equal,
    ],
    &[
        KeyCode::KeyQ,
        KeyCode::KeyW,
        KeyCode::KeyE,
        KeyCode::KeyR,
        KeyCode::KeyT,
        KeyCode::KeyY,
        KeyCode::KeyU,
        KeyCode::KeyI,
        KeyCode::KeyO,
        KeyCode::KeyP,
        KeyCode::BracketLeft,
        KeyCode::BracketRight,
    ],
    &[
        KeyCode::KeyA,
        KeyCode::KeyS,
        KeyCode::KeyD,
        KeyCode::KeyF,
        KeyCode::KeyG,
        KeyCode::KeyH,
        KeyCode::KeyJ,
        KeyCode::KeyK,
        KeyCode::KeyL,
        KeyCode::Semicolon,
        KeyCode::Quote,
    ],
    &[
        KeyCode::KeyZ,
        KeyCode::KeyX,
        KeyCode::KeyC,
        KeyCode::KeyV,
        KeyCode::KeyB,
        KeyCode::KeyN,
        KeyCode::KeyM,
        KeyCode::Comma,
        KeyCode::Period,
        KeyCode::Slash,
    ],
];

/// Px/s of hand travel that counts as one rating point.
const SPEED_PER_POINT: f32 = 100.0;
/// Ceiling of the tempo component and the BPM at which it reaches half.
const BPM_RATING_MAX: f32 = 10.0;
const BPM_RATING_HALF: f32 = 150.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyPosition {
    pub x: f32,
    pub y: f32,
    pub hand: Hand,
}

/// Physical centre of `key` in pixels, or `None` for keys off the block
/// (space bar, modifiers).
pub fn key_position(key: KeyCode) -> Option<KeyPosition> {
    ROWS.iter().enumerate().find_map(|(row, keys)| {
        keys.iter().position(|&k| k == key).map(|col| KeyPosition {
            x: (col as f32 + ROW_STAGGER[row]) * KEY_UNIT_PX,
            y: row as f32 * KEY_UNIT_PX,
            hand: if col < LEFT_HAND_COLUMNS { Hand::Left } else { Hand::Right },
        })
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DifficultyBreakdown {
    /// Mean hand travel speed over both hands, in px/s.
    pub hand_speed: f32,
    /// Mean BPM magnitude over the non-frozen segments.
    pub average_bpm: f32,
    pub length_minutes: f32,
    pub rating: f32,
}

#[derive(Default)]
struct HandTrack {
    last: Option<(f32, f32, f32)>,
    speed_sum: f32,
    samples: u32,
}

impl HandTrack {
    fn push(&mut self, x: f32, y: f32, ms: f32) {
        if let Some((lx, ly, lms)) = self.last {
            let seconds = (ms - lms) / 1000.0;
            if seconds > 0.0 {
                self.speed_sum += (x - lx).hypot(y - ly) / seconds;
                self.samples += 1;
            }
        }
        self.last = Some((x, y, ms));
    }

    fn mean(&self) -> Option<f32> {
        (self.samples > 0).then(|| self.speed_sum / self.samples as f32)
    }
}

#[inline(always)]
fn saturating_bpm(bpm: f32) -> f32 {
    BPM_RATING_MAX * bpm / (bpm + BPM_RATING_HALF)
}

pub fn breakdown(notes: &[Note], timeline: &SpeedTimeline) -> DifficultyBreakdown {
    let mut hits: Vec<&Note> = notes.iter().filter(|n| n.kind == NoteKind::Hit).collect();
    if hits.is_empty() || timeline.is_empty() {
        return DifficultyBreakdown::default();
    }
    hits.sort_by_key(|n| n.step);

    let mut left = HandTrack::default();
    let mut right = HandTrack::default();
    for note in &hits {
        let Some(pos) = key_position(note.key) else {
            continue;
        };
        let ms = steps_to_milliseconds(note.step as f32, timeline);
        match pos.hand {
            Hand::Left => left.push(pos.x, pos.y, ms),
            Hand::Right => right.push(pos.x, pos.y, ms),
        }
    }
    let hand_means: Vec<f32> = [left.mean(), right.mean()].into_iter().flatten().collect();
    let hand_speed = if hand_means.is_empty() {
        0.0
    } else {
        hand_means.iter().sum::<f32>() / hand_means.len() as f32
    };

    let moving: Vec<f32> = timeline
        .segments()
        .iter()
        .filter(|s| s.bpm != 0)
        .map(|s| s.bpm.unsigned_abs() as f32)
        .collect();
    let average_bpm = if moving.is_empty() {
        0.0
    } else {
        moving.iter().sum::<f32>() / moving.len() as f32
    };

    let first = hits.first().map_or(0, |n| n.step);
    let last = hits.last().map_or(0, |n| n.step);
    let length_ms = steps_to_milliseconds(last as f32, timeline) - steps_to_milliseconds(first as f32, timeline);
    let length_minutes = (length_ms / 60_000.0).max(0.0);

    let rating = (hand_speed / SPEED_PER_POINT + saturating_bpm(average_bpm) + length_minutes) / 3.0;
    DifficultyBreakdown {
        hand_speed,
        average_bpm,
        length_minutes,
        rating,
    }
}

/// Scalar difficulty rating; 0 for charts with nothing to type.
#[inline(always)]
pub fn estimate(notes: &[Note], timeline: &SpeedTimeline) -> f32 {
    breakdown(notes, timeline).rating
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::ChartData;

    fn notes(text: &str, spacing: i32) -> Vec<Note> {
        text.chars()
            .enumerate()
            .filter_map(|(i, c)| ChartData::note_for(c, i as i32 * spacing, NoteKind::Hit))
            .collect()
    }

    #[test]
    fn layout_rows_are_staggered_and_split() {
        let a = key_position(KeyCode::KeyA).unwrap();
        assert_eq!((a.x, a.y), (30.0, 80.0));
        assert_eq!(a.hand, Hand::Left);
        assert_eq!(key_position(KeyCode::KeyT).unwrap().hand, Hand::Left);
        assert_eq!(key_position(KeyCode::KeyY).unwrap().hand, Hand::Right);
        assert_eq!(key_position(KeyCode::Slash).unwrap().x, (9.0 + 1.25) * KEY_UNIT_PX);
        assert!(key_position(KeyCode::Space).is_none());
    }

    #[test]
    fn empty_inputs_rate_zero() {
        let tl = SpeedTimeline::constant(120);
        assert_eq!(estimate(&[], &tl), 0.0);
        assert_eq!(estimate(&notes("asdf", 1), &SpeedTimeline::default()), 0.0);
    }

    #[test]
    fn hand_speed_is_distance_over_time() {
        // 'a' to 'd' is two key units; one step at 120 BPM is half a second.
        let tl = SpeedTimeline::constant(120);
        let b = breakdown(&notes("ad", 1), &tl);
        assert!((b.hand_speed - 160.0).abs() < 1e-3);
        assert_eq!(b.average_bpm, 120.0);
        assert!((b.length_minutes - 0.5 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn repeated_key_costs_no_travel() {
        let b = breakdown(&notes("jjjj", 1), &SpeedTimeline::constant(200));
        assert_eq!(b.hand_speed, 0.0);
    }

    #[test]
    fn hold_notes_are_ignored() {
        let tl = SpeedTimeline::constant(120);
        let mut with_holds = notes("ad", 1);
        with_holds.push(ChartData::note_for('p', 1, NoteKind::Hold).unwrap());
        assert_eq!(breakdown(&with_holds, &tl), breakdown(&notes("ad", 1), &tl));
    }

    #[test]
    fn faster_tempo_rates_higher() {
        let text = "the quick brown fox jumps over the lazy dog";
        let slow = estimate(&notes(text, 1), &SpeedTimeline::constant(90));
        let fast = estimate(&notes(text, 1), &SpeedTimeline::constant(240));
        assert!(fast > slow, "{fast} <= {slow}");
    }

    #[test]
    fn travel_time_spans_speed_changes() {
        // 0..4 at 120 BPM is 2000ms, 4..6 at 60 BPM is 2000ms, 6..8 is frozen.
        let tl = SpeedTimeline::from_pairs([(0, 120), (4, 60), (6, 0)]);
        let mut n = notes("a", 1);
        n.push(ChartData::note_for('d', 8, NoteKind::Hit).unwrap());
        let b = breakdown(&n, &tl);
        assert!((b.hand_speed - 80.0 / 4.0).abs() < 1e-3);
        assert_eq!(b.average_bpm, 90.0);
    }
}
