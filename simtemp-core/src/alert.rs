//! Threshold alert state machine
//!
//! Alerts are edge-triggered: one alert per crossing, not one per tick spent
//! above the threshold.
//!
//! ```text
//!              temp >= threshold
//!   ┌──────┐ ──────────────────────▶ ┌────────┐
//!   │ idle │     (alert raised)       │ active │ ◀─┐ temp > threshold - 1000
//!   └──────┘ ◀────────────────────── └────────┘ ──┘ (no new alert)
//!            temp <= threshold - 1000
//! ```
//!
//! The band between `threshold - 1000` (exclusive) and `threshold` keeps an
//! active alert latched, so a reading hovering around the threshold does not
//! raise a burst of alerts.
//!
//! Changing the threshold never resets the machine; the next reading is simply
//! compared against the new value.

use crate::constants::ALERT_HYSTERESIS_MC;
use crate::sample::SampleFlags;

/// What a reading did to the alert state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    /// Not alerting before or after
    Idle,
    /// Crossed into or above the threshold; a new alert fired
    Raised,
    /// Already alerting and still above the hysteresis floor
    Active,
    /// Fell to or below the hysteresis floor; alert cleared
    Cleared,
}

/// Alert flag plus the counters it drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertState {
    active: bool,
    alerts_total: u64,
    last_alert_mc: i32,
}

impl AlertState {
    /// Not alerting, counters at zero
    pub const fn new() -> Self {
        Self {
            active: false,
            alerts_total: 0,
            last_alert_mc: 0,
        }
    }

    /// True between a raise and the matching clear
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Alerts raised since creation
    pub fn alerts_total(&self) -> u64 {
        self.alerts_total
    }

    /// Temperature of the most recent alert (0 before the first one)
    pub fn last_alert_mc(&self) -> i32 {
        self.last_alert_mc
    }

    /// Feed one reading. Returns the transition and the threshold flag to put
    /// on the sample (`THRESHOLD_CROSSED` or nothing).
    pub fn update(&mut self, temp_mc: i32, threshold_mc: i32) -> (AlertTransition, SampleFlags) {
        if temp_mc >= threshold_mc {
            let transition = if self.active {
                AlertTransition::Active
            } else {
                self.active = true;
                self.alerts_total += 1;
                self.last_alert_mc = temp_mc;
                AlertTransition::Raised
            };
            return (transition, SampleFlags::THRESHOLD_CROSSED);
        }

        let floor = threshold_mc.saturating_sub(ALERT_HYSTERESIS_MC);
        let transition = match (self.active, temp_mc <= floor) {
            (true, true) => {
                self.active = false;
                AlertTransition::Cleared
            }
            (true, false) => AlertTransition::Active,
            (false, _) => AlertTransition::Idle,
        };
        (transition, SampleFlags::EMPTY)
    }
}

impl Default for AlertState {
    fn default() -> Self {
        Self::new()
    }
}
