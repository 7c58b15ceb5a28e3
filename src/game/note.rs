use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    /// Resolved by the key-down edge.
    Hit,
    /// Resolved only if the key is still held when the note reaches the line.
    Hold,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Miss,
    Ok,
    Perfect,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Miss, Outcome::Ok, Outcome::Perfect];

    /// Slot in `ScoreState::counts` (`[misses, oks, perfects]`).
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Outcome::Miss => 0,
            Outcome::Ok => 1,
            Outcome::Perfect => 2,
        }
    }

    /// Per-combo score multiplier.
    #[inline(always)]
    pub const fn score_points(self) -> i32 {
        match self {
            Outcome::Perfect => 10,
            Outcome::Ok => 5,
            Outcome::Miss => 0,
        }
    }

    #[inline(always)]
    pub const fn keeps_combo(self) -> bool {
        !matches!(self, Outcome::Miss)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Judgment {
    pub outcome: Outcome,
    /// `rounded_steps - note.step` at the moment of resolution.
    pub step_error: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NoteState {
    #[default]
    Pending,
    Resolved(Judgment),
}

#[derive(Clone, Debug)]
pub struct Note {
    pub character: char,
    pub step: i32,
    pub key: KeyCode,
    pub kind: NoteKind,
    pub state: NoteState,
    /// Hold notes: distance observed at the qualifying press, cleared on release.
    pub(crate) press_distance: Option<i32>,
}

impl Note {
    pub fn new(character: char, step: i32, key: KeyCode, kind: NoteKind) -> Self {
        Self {
            character,
            step,
            key,
            kind,
            state: NoteState::Pending,
            press_distance: None,
        }
    }

    #[inline(always)]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, NoteState::Pending)
    }

    #[inline(always)]
    pub fn judgment(&self) -> Option<Judgment> {
        match self.state {
            NoteState::Pending => None,
            NoteState::Resolved(j) => Some(j),
        }
    }

    /// Single transition out of `Pending`. Returns false if already resolved.
    pub(crate) fn resolve(&mut self, judgment: Judgment) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.state = NoteState::Resolved(judgment);
        self.press_distance = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Judgment, Note, NoteKind, Outcome};
    use winit::keyboard::KeyCode;

    #[test]
    fn resolves_exactly_once() {
        let mut note = Note::new('a', 12, KeyCode::KeyA, NoteKind::Hit);
        assert!(note.is_pending());
        assert!(note.resolve(Judgment { outcome: Outcome::Ok, step_error: 1 }));
        assert!(!note.resolve(Judgment { outcome: Outcome::Perfect, step_error: 0 }));
        assert_eq!(note.judgment().map(|j| j.outcome), Some(Outcome::Ok));
    }

    #[test]
    fn outcome_slots_cover_counts() {
        let slots: Vec<usize> = Outcome::ALL.iter().map(|o| o.index()).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }
}
