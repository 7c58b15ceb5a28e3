pub const MAX_HEALTH: i32 = 80;
pub const MIN_HEALTH: i32 = 0;

// Runs start at full health; charts tune drain/restore through their
// metadata (`hp_drain`, `hp_restorage`).
pub const INITIAL_HEALTH: i32 = MAX_HEALTH;

/// Ok judgements restore this fraction (as a divisor) of the chart's restore value.
pub const OK_RESTORE_DIVISOR: i32 = 2;

#[inline(always)]
pub fn clamp_health(health: i32) -> i32 {
    health.clamp(MIN_HEALTH, MAX_HEALTH)
}
