//! Motion planner for smoothed hand moves
//!
//! A move from one face angle to another is split into equal steps no larger
//! than a configured maximum, with a hard cap on the number of steps so a
//! move always finishes in bounded time.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::units::Angle;

/// Default maximum face angle per step (3°)
pub const DEFAULT_MAX_STEP: Angle = Angle::from_degrees(3);

/// Default cap on steps per move
pub const DEFAULT_MAX_STEPS: u16 = 120;

/// Default delay between steps
pub const DEFAULT_STEP_INTERVAL_MS: u32 = 30;

/// Smoothing settings shared by all hands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothingConfig {
    /// Maximum face angle per step; `None` jumps straight to the target
    pub max_step: Option<Angle>,
    /// Upper bound on steps per move
    pub max_steps: u16,
    /// Delay between steps in milliseconds
    pub step_interval_ms: u32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            max_step: Some(DEFAULT_MAX_STEP),
            max_steps: DEFAULT_MAX_STEPS,
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
        }
    }
}

impl SmoothingConfig {
    /// No smoothing at all
    pub const fn direct() -> Self {
        Self {
            max_step: None,
            max_steps: 1,
            step_interval_ms: 0,
        }
    }

    /// Plan a move, letting `max_step` override the configured step size
    pub fn plan(&self, from: Option<Angle>, to: Angle, max_step: Option<Angle>) -> MotionPlan {
        MotionPlan::new(from, to, max_step.or(self.max_step), self.max_steps)
    }
}

/// Planned sequence of intermediate angles ending at the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionPlan {
    from: Angle,
    to: Angle,
    steps: u16,
}

impl MotionPlan {
    /// Plan a move
    ///
    /// An unknown starting position, a missing or zero step size, or a move
    /// already within one step all produce a single direct step.
    pub fn new(from: Option<Angle>, to: Angle, max_step: Option<Angle>, max_steps: u16) -> Self {
        let direct = Self { from: to, to, steps: 1 };

        let Some(from) = from else {
            return direct;
        };
        let step = match max_step {
            Some(step) if step.centidegrees() > 0 => step.centidegrees(),
            _ => return Self { from, ..direct },
        };

        let distance = from.abs_diff(to);
        let needed = distance.div_ceil(step).max(1);
        let steps = needed.min(max_steps.max(1) as u32) as u16;

        Self { from, to, steps }
    }

    /// Number of writes the move takes
    pub fn steps(&self) -> u16 {
        self.steps
    }

    /// Returns true if the move is a single write
    pub fn is_direct(&self) -> bool {
        self.steps == 1
    }

    /// Target angle
    pub fn target(&self) -> Angle {
        self.to
    }

    /// Angle after step `i` (1-based); the last step is exactly the target
    pub fn angle_at(&self, i: u16) -> Angle {
        let i = i.min(self.steps) as i64;
        let from = self.from.centidegrees() as i64;
        let to = self.to.centidegrees() as i64;
        let cd = from + (to - from) * i / self.steps as i64;
        Angle::from_centidegrees(cd as u32)
    }

    /// Iterate intermediate angles, target last
    pub fn iter(&self) -> impl Iterator<Item = Angle> + '_ {
        (1..=self.steps).map(move |i| self.angle_at(i))
    }
}
