use crate::core::input::keycode_for_char;
use crate::game::note::{Note, NoteKind};
use crate::game::timeline::{SpeedSegment, SpeedTimeline};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartMeta {
    /// Health lost per Miss.
    pub hp_drain: i32,
    /// Health restored per Perfect (half per Ok).
    pub hp_restorage: i32,
    /// Audio position at chart step 0, in milliseconds.
    pub music_offset_ms: i32,
}

/// An already-parsed chart: timeline, notes and scalar metadata.
#[derive(Clone, Debug, Default)]
pub struct ChartData {
    pub title: String,
    pub timeline: SpeedTimeline,
    pub notes: Vec<Note>,
    pub meta: ChartMeta,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct NoteRecord {
    character: char,
    step: i32,
    #[serde(default = "default_kind")]
    kind: NoteKind,
}

const fn default_kind() -> NoteKind {
    NoteKind::Hit
}

/// Serialized form of the in-memory chart records.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ChartSnapshot {
    #[serde(default)]
    title: String,
    speeds: Vec<SpeedSegment>,
    notes: Vec<NoteRecord>,
    #[serde(flatten)]
    meta: ChartMeta,
}

impl ChartData {
    pub fn new(timeline: SpeedTimeline, mut notes: Vec<Note>, meta: ChartMeta) -> Self {
        notes.sort_by_key(|n| n.step);
        Self {
            title: String::new(),
            timeline,
            notes,
            meta,
        }
    }

    /// Builds a note for `character`, skipping characters with no key.
    pub fn note_for(character: char, step: i32, kind: NoteKind) -> Option<Note> {
        keycode_for_char(character).map(|key| Note::new(character, step, key, kind))
    }

    /// Loads a JSON snapshot of chart records. Notes whose character has no
    /// key binding are dropped with a warning.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let snapshot: ChartSnapshot =
            serde_json::from_str(json).map_err(|e| format!("invalid chart snapshot: {e}"))?;
        let timeline = SpeedTimeline::from(snapshot.speeds);
        let mut notes = Vec::with_capacity(snapshot.notes.len());
        for rec in snapshot.notes {
            match Self::note_for(rec.character, rec.step, rec.kind) {
                Some(note) => notes.push(note),
                None => warn!(
                    "Dropping note {:?} at step {}: no key for this character.",
                    rec.character, rec.step
                ),
            }
        }
        let mut chart = Self::new(timeline, notes, snapshot.meta);
        chart.title = snapshot.title;
        Ok(chart)
    }

    pub fn to_json_string(&self) -> Result<String, String> {
        let snapshot = ChartSnapshot {
            title: self.title.clone(),
            speeds: self.timeline.segments().to_vec(),
            notes: self
                .notes
                .iter()
                .map(|n| NoteRecord {
                    character: n.character,
                    step: n.step,
                    kind: n.kind,
                })
                .collect(),
            meta: self.meta,
        };
        serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())
    }

    /// Step of the last note, or the first timeline step for an empty chart.
    pub fn last_step(&self) -> i32 {
        self.notes
            .iter()
            .map(|n| n.step)
            .max()
            .unwrap_or_else(|| self.timeline.first_step())
    }

    /// Small built-in chart used by the headless runner when no snapshot is given.
    pub fn demo() -> Self {
        let timeline = SpeedTimeline::from_pairs([(0, 120), (32, 180), (64, -150), (80, 240)]);
        let text = "the quick brown fox jumps over the lazy dog";
        let mut notes = Vec::new();
        let mut step = 4;
        for c in text.chars() {
            if c == ' ' {
                step += 2;
                continue;
            }
            let kind = if step % 8 == 0 { NoteKind::Hold } else { NoteKind::Hit };
            if let Some(note) = Self::note_for(c, step, kind) {
                notes.push(note);
            }
            step += 1;
        }
        let mut chart = Self::new(
            timeline,
            notes,
            ChartMeta {
                hp_drain: 8,
                hp_restorage: 2,
                music_offset_ms: 0,
            },
        );
        chart.title = "demo".to_string();
        chart
    }
}
