use log::debug;

/* ============================== Public API ============================== */

/// The music device as the simulation sees it. The engine never decodes or
/// mixes audio; it only reads and seeks the logical playback position.
pub trait AudioClock {
    fn is_playing(&self) -> bool;
    /// Current playback position in milliseconds.
    fn playback_offset_ms(&self) -> f64;
    fn set_playback_offset_ms(&mut self, offset_ms: f64);
    fn duration_ms(&self) -> f64;
    /// Playback speed; 1.0 is normal.
    fn pitch_multiplier(&self) -> f32;
    fn play(&mut self);
    fn pause(&mut self);
}

/// Headless music device. Time only moves when its owner calls `advance`,
/// which keeps runs reproducible.
#[derive(Clone, Debug)]
pub struct SilentTrack {
    playing: bool,
    position_ms: f64,
    duration_ms: f64,
    rate: f32,
    seeks: u32,
}

impl SilentTrack {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            playing: false,
            position_ms: 0.0,
            duration_ms: duration_ms.max(0.0),
            rate: 1.0,
            seeks: 0,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.set_rate(rate);
        self
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
    }

    /// Moves the playhead by `delta_seconds` of real time while playing.
    /// Stops at the end of the track.
    pub fn advance(&mut self, delta_seconds: f32) {
        if !self.playing {
            return;
        }
        self.position_ms += f64::from(delta_seconds) * f64::from(self.rate) * 1000.0;
        if self.position_ms >= self.duration_ms {
            self.position_ms = self.duration_ms;
            self.playing = false;
            debug!("Silent track reached its end at {:.1}ms.", self.duration_ms);
        }
    }

    /// Number of explicit seeks performed on this track.
    #[inline(always)]
    pub fn seek_count(&self) -> u32 {
        self.seeks
    }
}

impl AudioClock for SilentTrack {
    #[inline(always)]
    fn is_playing(&self) -> bool {
        self.playing
    }

    #[inline(always)]
    fn playback_offset_ms(&self) -> f64 {
        self.position_ms
    }

    fn set_playback_offset_ms(&mut self, offset_ms: f64) {
        self.position_ms = offset_ms.clamp(0.0, self.duration_ms);
        self.seeks += 1;
    }

    #[inline(always)]
    fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    #[inline(always)]
    fn pitch_multiplier(&self) -> f32 {
        self.rate
    }

    fn play(&mut self) {
        if self.position_ms < self.duration_ms {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.playing = false;
    }
}
