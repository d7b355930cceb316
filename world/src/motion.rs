//! Time-based interpolation between two cells.

use std::time::Duration;

use delve_core::{world_position, CellCoord, WorldPoint};

/// Easing curve applied to the interpolation fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Hermite smoothstep, slow at both ends.
    SmoothStep,
    /// Smoothstep applied twice for a snappier settle.
    DoubleSmoothStep,
}

impl Easing {
    /// Maps a linear fraction in `0.0..=1.0` onto the eased curve.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::SmoothStep => smoothstep(t),
            Self::DoubleSmoothStep => smoothstep(smoothstep(t)),
        }
    }
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Outcome of advancing an interpolation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// The interpolation needs more time.
    Continue,
    /// The accumulated time reached the full duration.
    Completed,
}

/// In-flight transition of an entity from one cell to another.
#[derive(Clone, Debug)]
pub struct Motion {
    from: CellCoord,
    to: CellCoord,
    start: WorldPoint,
    end: WorldPoint,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
    last_cell: CellCoord,
}

impl Motion {
    /// Prepares a transition between the centres of two cells.
    #[must_use]
    pub fn new(
        from: CellCoord,
        to: CellCoord,
        aspect_ratio: f32,
        duration: Duration,
        easing: Easing,
    ) -> Self {
        Self {
            from,
            to,
            start: world_position(from, aspect_ratio),
            end: world_position(to, aspect_ratio),
            duration,
            elapsed: Duration::ZERO,
            easing,
            last_cell: from,
        }
    }

    /// Accumulates `elapsed` time and reports whether the transition finished.
    pub fn advance(&mut self, elapsed: Duration) -> StepResult {
        self.elapsed = self.elapsed.saturating_add(elapsed);
        if self.elapsed >= self.duration {
            StepResult::Completed
        } else {
            StepResult::Continue
        }
    }

    /// Linear progress through the transition, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let fraction = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        fraction.min(1.0) as f32
    }

    /// Interpolated world-space position for the accumulated time.
    #[must_use]
    pub fn position(&self) -> WorldPoint {
        self.start.lerp(self.end, self.easing.apply(self.fraction()))
    }

    /// Cell the transition started from.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.from
    }

    /// Cell the transition travels toward.
    #[must_use]
    pub const fn destination(&self) -> CellCoord {
        self.to
    }

    /// World-space position of the destination cell.
    #[must_use]
    pub const fn end(&self) -> WorldPoint {
        self.end
    }

    /// Total time the transition takes.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    pub(crate) const fn last_cell(&self) -> CellCoord {
        self.last_cell
    }

    pub(crate) fn observe_cell(&mut self, cell: CellCoord) {
        self.last_cell = cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_curves_share_endpoints() {
        for easing in [Easing::Linear, Easing::SmoothStep, Easing::DoubleSmoothStep] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-6);
        }
        assert_eq!(Easing::SmoothStep.apply(2.0), 1.0);
    }

    #[test]
    fn double_smoothstep_lags_early_on() {
        let single = Easing::SmoothStep.apply(0.25);
        let double = Easing::DoubleSmoothStep.apply(0.25);
        assert!(double < single);
    }

    #[test]
    fn advance_completes_once_duration_elapses() {
        let mut motion = Motion::new(
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            1.0,
            Duration::from_millis(300),
            Easing::Linear,
        );

        assert_eq!(motion.advance(Duration::from_millis(100)), StepResult::Continue);
        assert_eq!(motion.advance(Duration::from_millis(100)), StepResult::Continue);
        assert_eq!(motion.advance(Duration::from_millis(100)), StepResult::Completed);
        assert_eq!(motion.position(), motion.end());
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut motion = Motion::new(
            CellCoord::new(2, 2),
            CellCoord::new(2, 3),
            0.5,
            Duration::ZERO,
            Easing::DoubleSmoothStep,
        );

        assert_eq!(motion.advance(Duration::ZERO), StepResult::Completed);
        assert_eq!(motion.fraction(), 1.0);
    }

    #[test]
    fn position_interpolates_between_cells() {
        let mut motion = Motion::new(
            CellCoord::new(0, 0),
            CellCoord::new(4, 0),
            1.0,
            Duration::from_secs(1),
            Easing::Linear,
        );

        let _ = motion.advance(Duration::from_millis(250));
        let position = motion.position();
        assert!((position.x - 1.0).abs() < 1e-5);
        assert!((position.y - 0.4).abs() < 1e-5);
    }
}
