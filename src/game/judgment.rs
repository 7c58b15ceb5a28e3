use crate::core::input::InputState;
use crate::game::chart::ChartMeta;
use crate::game::gameplay::PlayMode;
use crate::game::note::{Judgment, Note, NoteKind, Outcome};
use crate::game::scores::ScoreState;
use crate::game::timeline::SpeedTimeline;
use crate::game::timing_windows::JudgementWindow;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use winit::keyboard::KeyCode;

/// One note leaving `Pending`, reported to the host for effects and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JudgmentEvent {
    pub note_index: usize,
    pub character: char,
    pub step: i32,
    pub judgment: Judgment,
}

pub type JudgmentEvents = SmallVec<[JudgmentEvent; 4]>;

/// Earliest pending note per key (lowest step, then list order). Only the
/// owner of a key may be resolved; later notes on that key stay locked.
pub fn claim_index(notes: &[Note]) -> FxHashMap<KeyCode, usize> {
    let mut claims: FxHashMap<KeyCode, usize> = FxHashMap::default();
    for (i, note) in notes.iter().enumerate() {
        if !note.is_pending() {
            continue;
        }
        claims
            .entry(note.key)
            .and_modify(|owner| {
                if notes[*owner].step > note.step {
                    *owner = i;
                }
            })
            .or_insert(i);
    }
    claims
}

/// Per-note judgement state machine. Holds only the key state of the
/// previous tick, used to detect rising edges.
#[derive(Debug, Default)]
pub struct NoteJudge {
    held_last_tick: FxHashSet<KeyCode>,
}

impl NoteJudge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets edge history, e.g. after a pause or a jump.
    pub fn reset(&mut self) {
        self.held_last_tick.clear();
    }

    /// Runs one simulation tick over every claim-owning pending note.
    #[allow(clippy::too_many_arguments)]
    pub fn tick<I: InputState + ?Sized>(
        &mut self,
        notes: &mut [Note],
        timeline: &SpeedTimeline,
        rounded_steps: i32,
        mode: PlayMode,
        input: &I,
        meta: &ChartMeta,
        score: &mut ScoreState,
        events: &mut JudgmentEvents,
    ) {
        if mode == PlayMode::Edit {
            self.held_last_tick.clear();
            return;
        }
        let auto = mode == PlayMode::Auto;

        let claims = claim_index(notes);
        let mut owners: SmallVec<[usize; 16]> = claims.values().copied().collect();
        owners.sort_unstable();

        let mut held_now: FxHashSet<KeyCode> = FxHashSet::default();
        if !auto {
            for &key in claims.keys() {
                if input.is_key_held(key) {
                    held_now.insert(key);
                }
            }
        }

        for idx in owners {
            let note = &mut notes[idx];
            let window = JudgementWindow::for_note(note.step, timeline);
            let (down, edge) = if auto {
                let down = rounded_steps == note.step;
                (down, down)
            } else {
                let down = held_now.contains(&note.key);
                (down, down && !self.held_last_tick.contains(&note.key))
            };

            let distance = rounded_steps - note.step;
            let in_window = rounded_steps >= note.step - window.miss();
            let timed_out = rounded_steps > note.step + window.miss();

            let outcome = match note.kind {
                NoteKind::Hit => {
                    if edge && in_window {
                        Some(window.classify(distance))
                    } else if timed_out {
                        Some(Outcome::Miss)
                    } else {
                        None
                    }
                }
                NoteKind::Hold => {
                    if edge && in_window {
                        note.press_distance = Some(distance);
                    } else if !down {
                        note.press_distance = None;
                    }
                    match note.press_distance {
                        Some(pressed_at) if down && rounded_steps >= note.step => {
                            Some(window.classify(pressed_at))
                        }
                        _ if timed_out => Some(Outcome::Miss),
                        _ => None,
                    }
                }
            };

            let Some(outcome) = outcome else { continue };
            // A hold that still remembers its press was resolved by it.
            let step_error = match (note.kind, note.press_distance) {
                (NoteKind::Hold, Some(pressed_at)) => pressed_at,
                _ => distance,
            };
            let judgment = Judgment { outcome, step_error };
            if !note.resolve(judgment) {
                continue;
            }
            score.apply(outcome, meta.hp_restorage, meta.hp_drain);
            debug!(
                "Judged {:?} at step {} ({:?}) error {} -> combo {}, health {}",
                note.character, note.step, outcome, step_error, score.combo, score.health
            );
            events.push(JudgmentEvent {
                note_index: idx,
                character: note.character,
                step: note.step,
                judgment,
            });
        }

        self.held_last_tick = held_now;
    }
}

#[cfg(test)]
mod tests {
    use super::{JudgmentEvents, NoteJudge, claim_index};
    use crate::core::input::{KeyboardState, NoInput};
    use crate::game::chart::ChartMeta;
    use crate::game::gameplay::PlayMode;
    use crate::game::note::{Note, NoteKind, Outcome};
    use crate::game::scores::ScoreState;
    use crate::game::timeline::SpeedTimeline;
    use winit::keyboard::KeyCode;

    const META: ChartMeta = ChartMeta {
        hp_drain: 10,
        hp_restorage: 2,
        music_offset_ms: 0,
    };

    struct Harness {
        judge: NoteJudge,
        notes: Vec<Note>,
        timeline: SpeedTimeline,
        score: ScoreState,
        keys: KeyboardState,
    }

    impl Harness {
        fn new(notes: Vec<Note>) -> Self {
            Self {
                judge: NoteJudge::new(),
                notes,
                timeline: SpeedTimeline::constant(120),
                score: ScoreState::default(),
                keys: KeyboardState::new(),
            }
        }

        fn tick(&mut self, rounded: i32, mode: PlayMode) -> JudgmentEvents {
            let mut events = JudgmentEvents::new();
            self.judge.tick(
                &mut self.notes,
                &self.timeline,
                rounded,
                mode,
                &self.keys,
                &META,
                &mut self.score,
                &mut events,
            );
            events
        }

        fn play(&mut self, rounded: i32) -> JudgmentEvents {
            self.tick(rounded, PlayMode::Play)
        }
    }

    fn hit(c: char, key: KeyCode, step: i32) -> Note {
        Note::new(c, step, key, NoteKind::Hit)
    }

    fn hold(c: char, key: KeyCode, step: i32) -> Note {
        Note::new(c, step, key, NoteKind::Hold)
    }

    #[test]
    fn miss_by_timeout_at_step_plus_window_plus_one() {
        let mut h = Harness::new(vec![hit('a', KeyCode::KeyA, 100)]);
        h.score.combo = 7;
        for r in 90..=102 {
            assert!(h.play(r).is_empty(), "resolved too early at {r}");
        }
        let events = h.play(103);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].judgment.outcome, Outcome::Miss);
        assert_eq!(h.score.combo, 0);
        assert_eq!(h.score.count(Outcome::Miss), 1);
    }

    #[test]
    fn key_edge_distance_picks_outcome() {
        // 120 BPM: perfect 0, ok 1, miss 2.
        for (press_at, expected) in [
            (98, Outcome::Miss),
            (99, Outcome::Ok),
            (100, Outcome::Perfect),
            (101, Outcome::Ok),
            (102, Outcome::Miss),
        ] {
            let mut h = Harness::new(vec![hit('a', KeyCode::KeyA, 100)]);
            for r in 90..press_at {
                h.play(r);
            }
            h.keys.press(KeyCode::KeyA);
            let events = h.play(press_at);
            assert_eq!(events.len(), 1, "press at {press_at}");
            assert_eq!(events[0].judgment.outcome, expected, "press at {press_at}");
            assert_eq!(events[0].judgment.step_error, press_at - 100);
        }
    }

    #[test]
    fn presses_before_window_are_ignored() {
        let mut h = Harness::new(vec![hit('a', KeyCode::KeyA, 100)]);
        h.keys.press(KeyCode::KeyA);
        assert!(h.play(97).is_empty());
        // Still held: no new edge, so entering the window does nothing.
        assert!(h.play(100).is_empty());
        h.keys.release(KeyCode::KeyA);
        assert!(h.play(100).is_empty());
        h.keys.press(KeyCode::KeyA);
        assert_eq!(h.play(100)[0].judgment.outcome, Outcome::Perfect);
    }

    #[test]
    fn one_press_resolves_only_the_earliest_stacked_note() {
        let mut h = Harness::new(vec![
            hit('a', KeyCode::KeyA, 100),
            hit('a', KeyCode::KeyA, 101),
            hit('b', KeyCode::KeyB, 100),
        ]);
        h.keys.press(KeyCode::KeyA);
        let events = h.play(100);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].note_index, 0);
        assert!(h.notes[1].is_pending());
        // The second 'a' needs its own press.
        h.keys.release(KeyCode::KeyA);
        h.play(100);
        h.keys.press(KeyCode::KeyA);
        let events = h.play(101);
        assert_eq!(events[0].note_index, 1);
        assert_eq!(events[0].judgment.outcome, Outcome::Perfect);
    }

    #[test]
    fn claims_follow_step_order_not_list_order() {
        let notes = vec![
            hit('a', KeyCode::KeyA, 120),
            hit('a', KeyCode::KeyA, 100),
            hit('a', KeyCode::KeyA, 100),
        ];
        let claims = claim_index(&notes);
        assert_eq!(claims.get(&KeyCode::KeyA), Some(&1));
    }

    #[test]
    fn locked_notes_wait_for_the_owner() {
        let mut h = Harness::new(vec![hit('a', KeyCode::KeyA, 100), hit('a', KeyCode::KeyA, 100)]);
        let events = h.play(103);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].note_index, 0);
        let events = h.play(103);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].note_index, 1);
    }

    #[test]
    fn hold_requires_key_held_at_judgement_instant() {
        let mut h = Harness::new(vec![hold('a', KeyCode::KeyA, 100)]);
        h.keys.press(KeyCode::KeyA);
        assert!(h.play(99).is_empty());
        let events = h.play(100);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].judgment.outcome, Outcome::Ok);
        assert_eq!(events[0].judgment.step_error, -1);
    }

    #[test]
    fn hold_release_discards_press() {
        let mut h = Harness::new(vec![hold('a', KeyCode::KeyA, 100)]);
        h.keys.press(KeyCode::KeyA);
        h.play(99);
        h.keys.release(KeyCode::KeyA);
        assert!(h.play(99).is_empty());
        assert!(h.notes[0].press_distance.is_none());
        assert!(h.play(100).is_empty());
        assert!(h.play(102).is_empty());
        assert_eq!(h.play(103)[0].judgment.outcome, Outcome::Miss);
    }

    #[test]
    fn hold_pressed_late_resolves_immediately() {
        let mut h = Harness::new(vec![hold('a', KeyCode::KeyA, 100)]);
        h.play(100);
        h.keys.press(KeyCode::KeyA);
        let events = h.play(101);
        assert_eq!(events[0].judgment.outcome, Outcome::Ok);
    }

    #[test]
    fn auto_mode_presses_exactly_on_step() {
        let mut h = Harness::new(vec![
            hit('a', KeyCode::KeyA, 4),
            hold('s', KeyCode::KeyS, 5),
            hit('a', KeyCode::KeyA, 6),
        ]);
        let mut outcomes = Vec::new();
        for r in 0..10 {
            for e in h.tick(r, PlayMode::Auto) {
                outcomes.push(e.judgment.outcome);
            }
        }
        assert_eq!(outcomes, vec![Outcome::Perfect; 3]);
        assert_eq!(h.score.combo, 3);
    }

    #[test]
    fn edit_mode_never_resolves() {
        let mut h = Harness::new(vec![hit('a', KeyCode::KeyA, 4)]);
        h.keys.press(KeyCode::KeyA);
        for r in 0..20 {
            assert!(h.tick(r, PlayMode::Edit).is_empty());
        }
        assert!(h.notes[0].is_pending());
    }

    #[test]
    fn judgement_is_deterministic() {
        let script: Vec<(i32, bool)> = (0..60).map(|i| (i / 2, i % 5 == 0)).collect();
        let run = || {
            let mut h = Harness::new(vec![
                hit('a', KeyCode::KeyA, 5),
                hit('a', KeyCode::KeyA, 9),
                hold('a', KeyCode::KeyA, 15),
                hit('a', KeyCode::KeyA, 22),
            ]);
            let mut out = Vec::new();
            for &(r, held) in &script {
                h.keys.handle_key(KeyCode::KeyA, held);
                out.extend(h.play(r).into_iter().map(|e| (e.note_index, e.judgment)));
            }
            (out, h.score)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn no_input_only_times_out() {
        let mut judge = NoteJudge::new();
        let mut notes = vec![hit('a', KeyCode::KeyA, 0)];
        let mut score = ScoreState::default();
        let mut events = JudgmentEvents::new();
        let tl = SpeedTimeline::constant(120);
        for r in 0..4 {
            judge.tick(&mut notes, &tl, r, PlayMode::Play, &NoInput, &META, &mut score, &mut events);
        }
        assert_eq!(events.len(), 1);
        assert_eq!(score.health, 70);
    }
}
