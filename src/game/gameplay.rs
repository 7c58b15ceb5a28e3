use crate::config::Config;
use crate::core::audio::AudioClock;
use crate::core::input::InputState;
use crate::game::chart::{ChartData, ChartMeta};
use crate::game::difficulty;
use crate::game::judgment::{JudgmentEvents, NoteJudge};
use crate::game::note::{Note, NoteKind};
use crate::game::scores::ScoreState;
use crate::game::stage_stats::StageSummary;
use crate::game::timeline::SpeedTimeline;
use crate::game::timing::{
    milliseconds_to_steps, offset_to_steps, steps_to_direction_layer, steps_to_milliseconds,
    steps_to_offset,
};
use log::{debug, info, warn};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Fixed simulation ticks per beat, independent of frame rate.
pub const TICKS_PER_BEAT: i64 = 16;
/// Tick length used while the current segment is frozen.
pub const FALLBACK_TICK_BPM: u32 = 120;

const MICROS_PER_MINUTE: i64 = 60_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlayMode {
    #[default]
    Play,
    /// The engine presses every key exactly on step.
    Auto,
    /// Judgement disabled; notes are placed and removed directly.
    Edit,
}

impl PlayMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "Play",
            Self::Auto => "Auto",
            Self::Edit => "Edit",
        }
    }
}

impl FromStr for PlayMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(Self::Play),
            "auto" => Ok(Self::Auto),
            "edit" => Ok(Self::Edit),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StatsState {
    #[default]
    Ongoing,
    Pass,
    Fail,
}

/// Per-tick derived position. `rounded_steps`/`rounded_offset` are what
/// judgement and rendering use; `steps` keeps sub-step precision between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SimulationState {
    pub level_time_micros: i64,
    pub steps: f32,
    pub rounded_steps: i32,
    pub offset: f32,
    pub rounded_offset: i32,
    pub direction_layer: i32,
    pub current_bpm: i32,
}

impl SimulationState {
    #[inline(always)]
    pub fn level_time_ms(&self) -> f32 {
        (self.level_time_micros as f64 / 1000.0) as f32
    }
}

/// Length of one tick at `bpm`, rounded to whole microseconds.
#[inline(always)]
pub fn fixed_delta_micros(bpm: i32) -> i64 {
    let bpm = match bpm.unsigned_abs() {
        0 => FALLBACK_TICK_BPM,
        b => b,
    };
    let per_beat = i64::from(bpm) * TICKS_PER_BEAT;
    ((MICROS_PER_MINUTE + per_beat / 2) / per_beat).max(1)
}

#[inline(always)]
fn ms_to_micros(ms: f32) -> i64 {
    (f64::from(ms) * 1000.0).round() as i64
}

/// Owns one chart run: timeline, notes, simulation and score state, and the
/// audio device it keeps in sync with.
pub struct Engine<A: AudioClock> {
    audio: A,
    chart: ChartData,
    mode: PlayMode,
    playing: bool,
    budget_micros: i64,
    /// Sub-microsecond remainder carried between `update` calls.
    budget_fraction: f64,
    sim: SimulationState,
    score: ScoreState,
    judge: NoteJudge,
    stats: StatsState,
    audio_start_pending: bool,
    lead_in_micros: i64,
    resync_threshold_ms: f64,
    ticks: u64,
    log_timer: f32,
}

impl<A: AudioClock> Engine<A> {
    pub fn new(audio: A, config: &Config) -> Self {
        let mut engine = Self {
            audio,
            chart: ChartData::default(),
            mode: config.default_mode,
            playing: false,
            budget_micros: 0,
            budget_fraction: 0.0,
            sim: SimulationState::default(),
            score: ScoreState::default(),
            judge: NoteJudge::new(),
            stats: StatsState::Ongoing,
            audio_start_pending: false,
            lead_in_micros: i64::from(config.lead_in_ms) * 1000,
            resync_threshold_ms: f64::from(config.resync_threshold_ms),
            ticks: 0,
            log_timer: 0.0,
        };
        engine.recompute_all();
        engine
    }

    /* ============================ Commands ============================ */

    pub fn start_chart(&mut self, timeline: SpeedTimeline, notes: Vec<Note>, meta: ChartMeta) {
        self.start(ChartData::new(timeline, notes, meta));
    }

    /// Resets every run-scoped state and parks the simulation at the lead-in.
    pub fn start(&mut self, mut chart: ChartData) {
        chart.notes.sort_by_key(|n| n.step);
        self.audio.pause();
        self.chart = chart;
        self.playing = false;
        self.budget_micros = 0;
        self.budget_fraction = 0.0;
        self.score = ScoreState::default();
        self.judge.reset();
        self.audio_start_pending = false;
        self.ticks = 0;
        self.log_timer = 0.0;
        self.stats = StatsState::Ongoing;

        let start_ms = steps_to_milliseconds(self.chart.timeline.first_step() as f32, &self.chart.timeline);
        self.sim = SimulationState {
            level_time_micros: ms_to_micros(start_ms) - self.lead_in_micros,
            ..SimulationState::default()
        };
        self.recompute_all();
        self.stats = self.derive_stats();

        if self.chart.timeline.is_empty() {
            warn!("Chart '{}' has no speed data; nothing will move.", self.chart.title);
        }
        info!(
            "Chart '{}' started: {} notes, {} speed segments, lead-in {:.0}ms.",
            self.chart.title,
            self.chart.notes.len(),
            self.chart.timeline.len(),
            self.lead_in_micros as f64 / 1000.0
        );
    }

    /// Starting defers audio while the required audio position is negative.
    /// Stopping snaps to the nearest whole step. Repeated calls are no-ops.
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        self.budget_micros = 0;
        self.budget_fraction = 0.0;
        if playing {
            debug!("Resuming at step {:.3}.", self.sim.steps);
            self.seek_audio_to_simulation();
        } else {
            self.audio.pause();
            self.audio_start_pending = false;
            let snapped = self.sim.steps.round() as i32;
            self.snap_to_step(snapped);
            debug!("Paused; resynced to step {snapped}.");
        }
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        if self.mode == mode {
            return;
        }
        debug!("Mode {} -> {}", self.mode.as_str(), mode.as_str());
        self.mode = mode;
        self.judge.reset();
    }

    /// Editor jump by whole steps. Ignored outside edit mode.
    pub fn scroll_by(&mut self, steps: i32) {
        if self.mode != PlayMode::Edit {
            debug!("scroll_by({steps}) ignored outside edit mode.");
            return;
        }
        let target = (self.sim.steps.round() as i32).saturating_add(steps);
        self.snap_to_step(target);
        self.budget_micros = 0;
        self.budget_fraction = 0.0;
        self.judge.reset();
        if self.playing {
            self.seek_audio_to_simulation();
        }
    }

    /// Advances real time. Consumes whole ticks from the time budget; the
    /// remainder carries over to the next call.
    pub fn update<I: InputState + ?Sized>(&mut self, delta_time: f32, input: &I) -> JudgmentEvents {
        let mut events = JudgmentEvents::new();
        if !self.playing || !delta_time.is_finite() || delta_time <= 0.0 {
            return events;
        }

        let pitch = self.audio.pitch_multiplier();
        let pitch = if pitch.is_finite() && pitch > 0.0 { pitch } else { 1.0 };
        let exact = f64::from(delta_time) * f64::from(pitch) * 1_000_000.0 + self.budget_fraction;
        let whole = exact.floor();
        self.budget_fraction = exact - whole;
        self.budget_micros += whole as i64;

        loop {
            let fixed = fixed_delta_micros(self.sim.current_bpm);
            if self.budget_micros < fixed {
                break;
            }
            self.budget_micros -= fixed;
            self.tick(fixed, input, &mut events);
        }

        self.reconcile_audio();

        self.log_timer += delta_time;
        if self.log_timer >= 1.0 {
            info!(
                "Step: {:.2}, Time: {:.1}ms, Combo: {}, Health: {}, Pending: {}",
                self.sim.steps,
                self.sim.level_time_ms(),
                self.score.combo,
                self.score.health,
                self.pending_notes()
            );
            self.log_timer -= 1.0;
        }
        events
    }

    /* ============================ Edit mode ============================ */

    /// Places a note at the current rounded step.
    pub fn place_note(&mut self, character: char, kind: NoteKind) -> Option<usize> {
        if !self.can_edit() {
            return None;
        }
        let step = self.sim.rounded_steps;
        self.insert_note(character, step, kind)
    }

    /// Places a note at a visual offset on the current direction layer.
    /// Offsets that layer never reaches are skipped.
    pub fn place_note_at_offset(&mut self, character: char, kind: NoteKind, offset: f32) -> Option<usize> {
        if !self.can_edit() {
            return None;
        }
        let Some(steps) = offset_to_steps(offset, self.sim.direction_layer, &self.chart.timeline) else {
            debug!(
                "Offset {offset} unreachable on direction layer {}; note not placed.",
                self.sim.direction_layer
            );
            return None;
        };
        self.insert_note(character, steps.round() as i32, kind)
    }

    /// Removes every note at `step`. Returns how many were removed.
    pub fn remove_notes_at(&mut self, step: i32) -> usize {
        if !self.can_edit() {
            return 0;
        }
        let before = self.chart.notes.len();
        self.chart.notes.retain(|n| n.step != step);
        let removed = before - self.chart.notes.len();
        if removed > 0 {
            self.stats = self.derive_stats();
        }
        removed
    }

    pub fn set_speed(&mut self, step: i32, bpm: i32) -> bool {
        if !self.can_edit() {
            return false;
        }
        let here = self.sim.rounded_steps;
        self.chart.timeline.set_segment(step, bpm);
        self.snap_to_step(here);
        true
    }

    pub fn remove_speed(&mut self, step: i32) -> bool {
        if !self.can_edit() {
            return false;
        }
        let here = self.sim.rounded_steps;
        let removed = self.chart.timeline.remove_segment(step);
        if removed {
            self.snap_to_step(here);
        }
        removed
    }

    /* ============================ Snapshots ============================ */

    #[inline(always)]
    pub fn simulation(&self) -> SimulationState {
        self.sim
    }

    #[inline(always)]
    pub fn score(&self) -> ScoreState {
        self.score
    }

    #[inline(always)]
    pub fn stats_state(&self) -> StatsState {
        self.stats
    }

    #[inline(always)]
    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    #[inline(always)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[inline(always)]
    pub fn notes(&self) -> &[Note] {
        &self.chart.notes
    }

    #[inline(always)]
    pub fn timeline(&self) -> &SpeedTimeline {
        &self.chart.timeline
    }

    #[inline(always)]
    pub fn meta(&self) -> &ChartMeta {
        &self.chart.meta
    }

    #[inline(always)]
    pub fn chart(&self) -> &ChartData {
        &self.chart
    }

    #[inline(always)]
    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// Host access to the device, e.g. to advance a headless track.
    #[inline(always)]
    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    #[inline(always)]
    pub fn is_audio_start_pending(&self) -> bool {
        self.audio_start_pending
    }

    #[inline(always)]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pending_notes(&self) -> usize {
        self.chart.notes.iter().filter(|n| n.is_pending()).count()
    }

    pub fn difficulty(&self) -> f32 {
        difficulty::estimate(&self.chart.notes, &self.chart.timeline)
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary::from_run(&self.chart, &self.score, self.stats, self.difficulty())
    }

    /* ============================ Internals ============================ */

    fn tick<I: InputState + ?Sized>(&mut self, fixed_micros: i64, input: &I, events: &mut JudgmentEvents) {
        self.sim.level_time_micros += fixed_micros;
        let prev_steps = self.sim.steps;
        let prev_rounded = self.sim.rounded_steps;
        let ms = self.sim.level_time_ms();
        self.sim.steps = milliseconds_to_steps(ms, &self.chart.timeline);
        self.sim.offset = steps_to_offset(self.sim.steps, &self.chart.timeline);
        if prev_steps.floor() != self.sim.steps.floor() {
            self.refresh_rounded();
        }

        if self.audio_start_pending && self.audio_position_ms() >= 0.0 {
            self.audio_start_pending = false;
            self.start_audio();
            info!("Audio started at level time {:.1}ms.", ms);
        }

        // Frozen segments and steep tempo rises can carry one tick over
        // several whole steps; every crossed step is judged in order.
        for rounded_steps in crossed_steps(prev_rounded, self.sim.rounded_steps) {
            if self.stats == StatsState::Fail {
                break;
            }
            self.judge.tick(
                &mut self.chart.notes,
                &self.chart.timeline,
                rounded_steps,
                self.mode,
                input,
                &self.chart.meta,
                &mut self.score,
                events,
            );
            if self.score.is_dead() {
                self.stats = StatsState::Fail;
                info!("Player has failed!");
            }
        }

        let stats = self.derive_stats();
        if stats != self.stats {
            match stats {
                StatsState::Pass => info!("Chart passed with score {}.", self.score.score),
                StatsState::Fail | StatsState::Ongoing => {}
            }
            self.stats = stats;
        }
        self.ticks += 1;
    }

    /// Step-boundary values: rounded position, direction layer, tempo.
    fn refresh_rounded(&mut self) {
        let tl = &self.chart.timeline;
        self.sim.rounded_steps = self.sim.steps.round() as i32;
        self.sim.rounded_offset = self.sim.offset.round() as i32;
        self.sim.direction_layer = steps_to_direction_layer(self.sim.steps, tl);
        self.sim.current_bpm = tl.bpm_at(self.sim.steps);
    }

    fn recompute_all(&mut self) {
        let ms = self.sim.level_time_ms();
        self.sim.steps = milliseconds_to_steps(ms, &self.chart.timeline);
        self.sim.offset = steps_to_offset(self.sim.steps, &self.chart.timeline);
        self.refresh_rounded();
    }

    /// Moves the simulation onto an exact whole step.
    fn snap_to_step(&mut self, step: i32) {
        let ms = steps_to_milliseconds(step as f32, &self.chart.timeline);
        self.sim.level_time_micros = ms_to_micros(ms);
        self.recompute_all();
        if !self.chart.timeline.is_empty() {
            self.sim.steps = step as f32;
            self.sim.offset = steps_to_offset(self.sim.steps, &self.chart.timeline);
            self.refresh_rounded();
        }
        let pos = self.audio_position_ms();
        if pos >= 0.0 {
            self.audio.set_playback_offset_ms(pos);
        }
    }

    #[inline(always)]
    fn audio_position_ms(&self) -> f64 {
        self.sim.level_time_micros as f64 / 1000.0 + f64::from(self.chart.meta.music_offset_ms)
    }

    fn start_audio(&mut self) {
        let pos = self.audio_position_ms();
        self.audio.set_playback_offset_ms(pos);
        if pos < self.audio.duration_ms() {
            self.audio.play();
        }
    }

    /// Starts or defers audio to match the simulation's position.
    fn seek_audio_to_simulation(&mut self) {
        let pos = self.audio_position_ms();
        if pos < 0.0 {
            self.audio.pause();
            self.audio_start_pending = true;
            debug!("Audio start deferred: needs position {pos:.1}ms.");
        } else {
            self.audio_start_pending = false;
            self.start_audio();
        }
    }

    /// The simulation is the master clock; a drifting device is re-seeked.
    fn reconcile_audio(&mut self) {
        if self.resync_threshold_ms <= 0.0 || self.audio_start_pending || !self.audio.is_playing() {
            return;
        }
        // Unconsumed budget is song time the next tick has not caught up to yet.
        let expected = self.audio_position_ms() + self.budget_micros as f64 / 1000.0;
        if expected >= self.audio.duration_ms() {
            return;
        }
        let actual = self.audio.playback_offset_ms();
        let drift = actual - expected;
        if drift.abs() > self.resync_threshold_ms {
            warn!("Audio drifted {drift:.1}ms from the simulation; resyncing.");
            self.audio.set_playback_offset_ms(expected);
        }
    }

    fn can_edit(&self) -> bool {
        if self.mode != PlayMode::Edit || self.playing {
            debug!("Edit rejected: mode {}, playing {}.", self.mode.as_str(), self.playing);
            return false;
        }
        true
    }

    fn insert_note(&mut self, character: char, step: i32, kind: NoteKind) -> Option<usize> {
        let note = ChartData::note_for(character, step, kind)?;
        let idx = self.chart.notes.partition_point(|n| n.step <= step);
        self.chart.notes.insert(idx, note);
        self.stats = self.derive_stats();
        Some(idx)
    }

    /// `Fail` is final until the next `start`.
    fn derive_stats(&self) -> StatsState {
        if self.stats == StatsState::Fail || self.score.is_dead() {
            StatsState::Fail
        } else if self.chart.notes.iter().all(|n| !n.is_pending()) {
            StatsState::Pass
        } else {
            StatsState::Ongoing
        }
    }
}

/// Whole steps passed moving from `prev` to `last`, ending at `last`.
/// Steps never decrease while time advances.
fn crossed_steps(prev: i32, last: i32) -> RangeInclusive<i32> {
    if last > prev.saturating_add(1) { prev + 1..=last } else { last..=last }
}
