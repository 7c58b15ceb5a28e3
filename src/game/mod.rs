pub mod chart;
pub mod difficulty;
pub mod gameplay;
pub mod judgment;
pub mod life;
pub mod note;
pub mod scores;
pub mod stage_stats;
pub mod timeline;
pub mod timing;
pub mod timing_stats;
pub mod timing_windows;
