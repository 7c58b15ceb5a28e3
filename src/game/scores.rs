use crate::game::life::{self, OK_RESTORE_DIVISOR};
use crate::game::note::Outcome;

/// Score/combo/health aggregate. Only judgement resolutions mutate it;
/// everyone else reads copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreState {
    pub score: i64,
    pub combo: u32,
    pub max_combo: u32,
    /// `[misses, oks, perfects]`
    pub counts: [u32; 3],
    pub health: i32,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            score: 0,
            combo: 0,
            max_combo: 0,
            counts: [0; 3],
            health: life::INITIAL_HEALTH,
        }
    }
}

impl ScoreState {
    /// Applies one resolved note.
    pub(crate) fn apply(&mut self, outcome: Outcome, hp_restorage: i32, hp_drain: i32) {
        match outcome {
            Outcome::Perfect | Outcome::Ok => {
                self.score += i64::from(outcome.score_points()) * (i64::from(self.combo) + 1);
                self.combo += 1;
                let restore = if outcome == Outcome::Perfect {
                    hp_restorage
                } else {
                    hp_restorage / OK_RESTORE_DIVISOR
                };
                self.health = life::clamp_health(self.health.saturating_add(restore));
            }
            Outcome::Miss => {
                self.combo = 0;
                self.health = life::clamp_health(self.health.saturating_sub(hp_drain));
            }
        }
        self.counts[outcome.index()] += 1;
        self.max_combo = self.max_combo.max(self.combo);
    }

    #[inline(always)]
    pub fn count(&self, outcome: Outcome) -> u32 {
        self.counts[outcome.index()]
    }

    #[inline(always)]
    pub fn judged(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Weighted hit percentage: Perfect counts fully, Ok half. 100 before
    /// anything has been judged.
    pub fn accuracy(&self) -> f32 {
        let judged = self.judged();
        if judged == 0 {
            return 100.0;
        }
        let earned = self.count(Outcome::Perfect) as f32 + 0.5 * self.count(Outcome::Ok) as f32;
        earned / judged as f32 * 100.0
    }

    #[inline(always)]
    pub fn is_dead(&self) -> bool {
        self.health <= life::MIN_HEALTH
    }
}

#[cfg(test)]
mod tests {
    use super::ScoreState;
    use crate::game::life::MAX_HEALTH;
    use crate::game::note::Outcome;

    #[test]
    fn perfect_and_ok_scale_with_combo() {
        let mut s = ScoreState::default();
        s.apply(Outcome::Perfect, 4, 10);
        s.apply(Outcome::Perfect, 4, 10);
        s.apply(Outcome::Ok, 4, 10);
        assert_eq!(s.score, 10 + 20 + 15);
        assert_eq!(s.combo, 3);
        assert_eq!(s.max_combo, 3);
        assert_eq!(s.counts, [0, 1, 2]);
    }

    #[test]
    fn miss_resets_combo_but_keeps_max() {
        let mut s = ScoreState::default();
        s.apply(Outcome::Perfect, 0, 10);
        s.apply(Outcome::Perfect, 0, 10);
        s.apply(Outcome::Miss, 0, 10);
        s.apply(Outcome::Ok, 0, 10);
        assert_eq!(s.combo, 1);
        assert_eq!(s.max_combo, 2);
        assert_eq!(s.score, 10 + 20 + 5);
        assert_eq!(s.health, MAX_HEALTH - 10);
    }

    #[test]
    fn health_is_clamped() {
        let mut s = ScoreState::default();
        s.apply(Outcome::Perfect, 50, 0);
        assert_eq!(s.health, MAX_HEALTH);
        for _ in 0..5 {
            s.apply(Outcome::Miss, 0, 30);
        }
        assert_eq!(s.health, 0);
        assert!(s.is_dead());
        s.apply(Outcome::Ok, 9, 0);
        assert_eq!(s.health, 4);
    }

    #[test]
    fn accuracy_weights_ok_half() {
        let mut s = ScoreState::default();
        assert_eq!(s.accuracy(), 100.0);
        s.apply(Outcome::Perfect, 0, 0);
        s.apply(Outcome::Ok, 0, 0);
        s.apply(Outcome::Miss, 0, 0);
        s.apply(Outcome::Perfect, 0, 0);
        assert!((s.accuracy() - 62.5).abs() < 1e-4);
    }
}
