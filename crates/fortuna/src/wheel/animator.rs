//! Frame-driven rotation of the wheel from its current angle to the spin target.
//!
//! The velocity curve is authored (cubic ease-in, cruise, quartic ease-out) and sized
//! per run from the rotation delta. A closed-loop settling phase covers whatever the
//! authored curve left over, so the run always ends exactly on target without
//! overshooting. Nothing here owns a clock; the host calls [`RotationAnimator::tick`]
//! once per frame with the elapsed time.

use super::{ARRIVAL_EPSILON, FRAME_INTERVAL, SpinError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strum::Display as StrumDisplay;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationProfile {
    pub acceleration_ms: u64,
    pub cruise_ms: u64,
    pub deceleration_ms: u64,
    /// Per-run deceleration variation, +/- this many milliseconds.
    pub deceleration_jitter_ms: u64,
    /// Bounds for the cruise velocity, degrees per reference frame.
    pub min_velocity: f64,
    pub max_velocity: f64,
    /// Deceleration hands over to settling below this velocity.
    pub settle_threshold: f64,
    pub settle_gain: f64,
    pub min_creep: f64,
    /// Per-frame blend towards the target velocity.
    pub smoothing: f64,
    /// Share of the rotation the authored phases aim to cover.
    pub coverage: f64,
}

impl Default for AnimationProfile {
    fn default() -> Self {
        Self {
            acceleration_ms: 1000,
            cruise_ms: 2000,
            deceleration_ms: 3000,
            deceleration_jitter_ms: 300,
            min_velocity: 2.0,
            max_velocity: 40.0,
            settle_threshold: 0.5,
            settle_gain: 0.02,
            min_creep: 0.15,
            smoothing: 0.2,
            coverage: 0.985,
        }
    }
}

impl AnimationProfile {
    pub fn acceleration(&self) -> Duration {
        Duration::from_millis(self.acceleration_ms)
    }

    pub fn cruise(&self) -> Duration {
        Duration::from_millis(self.cruise_ms)
    }

    pub fn deceleration(&self) -> Duration {
        Duration::from_millis(self.deceleration_ms)
    }

    /// Rejects settings under which a run could stall short of its target.
    pub fn validate(&self) -> Result<(), String> {
        let finite = [
            ("min_velocity", self.min_velocity),
            ("max_velocity", self.max_velocity),
            ("settle_threshold", self.settle_threshold),
            ("settle_gain", self.settle_gain),
            ("min_creep", self.min_creep),
            ("smoothing", self.smoothing),
            ("coverage", self.coverage),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{name} must be a finite number, got {value}"));
        }

        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(format!("smoothing must be in (0, 1], got {}", self.smoothing));
        }
        if self.min_creep <= 0.0 {
            return Err(format!("min_creep must be positive, got {}", self.min_creep));
        }
        if self.settle_gain < 0.0 {
            return Err(format!("settle_gain must not be negative, got {}", self.settle_gain));
        }
        if self.settle_threshold < 0.0 {
            return Err(format!(
                "settle_threshold must not be negative, got {}",
                self.settle_threshold
            ));
        }
        if self.min_velocity < 0.0 || self.max_velocity <= 0.0 || self.min_velocity > self.max_velocity
        {
            return Err(format!(
                "velocity bounds must satisfy 0 <= min <= max and max > 0, got {}..{}",
                self.min_velocity, self.max_velocity
            ));
        }
        if !(0.0..=1.0).contains(&self.coverage) {
            return Err(format!("coverage must be in [0, 1], got {}", self.coverage));
        }
        Ok(())
    }

    /// Cruise velocity that makes the authored phases cover `coverage` of `delta`.
    fn peak_velocity(&self, delta: f64, deceleration: Duration) -> f64 {
        let frames = |d: Duration| d.as_secs_f64() / FRAME_INTERVAL.as_secs_f64();
        // area under t^3 is 1/4, under (1 - t)^4 is 1/5
        let span = frames(self.acceleration()) / 4.0
            + frames(self.cruise())
            + frames(deceleration) / 5.0;

        let (lo, hi) = (self.min_velocity.max(0.0), self.max_velocity.max(self.min_velocity));
        if span <= 0.0 {
            return hi;
        }
        (delta * self.coverage.clamp(0.0, 1.0) / span).clamp(lo, hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, StrumDisplay)]
pub enum Phase {
    Accelerating,
    Cruising,
    Decelerating,
    Settling,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct AnimationRun {
    start_angle: f64,
    target_angle: f64,
    current_angle: f64,
    velocity: f64,
    peak_velocity: f64,
    elapsed: Duration,
    deceleration_start: Duration,
    deceleration: Duration,
    phase: Phase,
}

impl AnimationRun {
    fn new(start_angle: f64, delta: f64, deceleration: Duration, profile: &AnimationProfile) -> Self {
        let delta = delta.max(0.0);
        Self {
            start_angle,
            target_angle: start_angle + delta,
            current_angle: start_angle,
            velocity: 0.0,
            peak_velocity: profile.peak_velocity(delta, deceleration),
            elapsed: Duration::ZERO,
            deceleration_start: profile.acceleration() + profile.cruise(),
            deceleration,
            phase: Phase::Accelerating,
        }
    }

    pub fn start_angle(&self) -> f64 {
        self.start_angle
    }

    pub fn target_angle(&self) -> f64 {
        self.target_angle
    }

    pub fn current_angle(&self) -> f64 {
        self.current_angle
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn deceleration(&self) -> Duration {
        self.deceleration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining(&self) -> f64 {
        (self.target_angle - self.current_angle).max(0.0)
    }

    fn advance(&mut self, dt: Duration, profile: &AnimationProfile) {
        if self.phase == Phase::Done {
            return;
        }
        self.elapsed += dt;
        // phases only move forward
        self.phase = self.phase.max(self.scheduled_phase(profile));

        let frames = dt.as_secs_f64() / FRAME_INTERVAL.as_secs_f64();
        let smoothing = (profile.smoothing * frames).clamp(0.0, 1.0);
        let target = self.target_velocity(profile);
        self.velocity += (target - self.velocity) * smoothing;

        let step = (self.velocity * frames).clamp(0.0, self.remaining());
        self.current_angle += step;

        if self.remaining() < ARRIVAL_EPSILON {
            self.current_angle = self.target_angle;
            self.velocity = 0.0;
            self.phase = Phase::Done;
        }
    }

    fn scheduled_phase(&self, profile: &AnimationProfile) -> Phase {
        let decelerating = self.deceleration_start + self.deceleration;

        if self.elapsed < profile.acceleration() {
            Phase::Accelerating
        } else if self.elapsed < self.deceleration_start {
            Phase::Cruising
        } else if self.elapsed < decelerating
            && self.deceleration_velocity() >= profile.settle_threshold
        {
            Phase::Decelerating
        } else {
            Phase::Settling
        }
    }

    fn deceleration_velocity(&self) -> f64 {
        let t = progress(self.elapsed, self.deceleration_start, self.deceleration);
        self.peak_velocity * (1.0 - t).powi(4)
    }

    fn target_velocity(&self, profile: &AnimationProfile) -> f64 {
        match self.phase {
            Phase::Accelerating => {
                let t = progress(self.elapsed, Duration::ZERO, profile.acceleration());
                self.peak_velocity * t.powi(3)
            }
            Phase::Cruising => self.peak_velocity,
            Phase::Decelerating => self.deceleration_velocity(),
            Phase::Settling => (self.remaining() * profile.settle_gain).max(profile.min_creep),
            Phase::Done => 0.0,
        }
    }
}

/// Fraction of `length` covered `elapsed` after `start`, clamped to `[0, 1]`.
fn progress(elapsed: Duration, start: Duration, length: Duration) -> f64 {
    if length.is_zero() {
        return 1.0;
    }
    (elapsed.saturating_sub(start).as_secs_f64() / length.as_secs_f64()).clamp(0.0, 1.0)
}

/// Result of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// No live run.
    Idle,
    Progress(f64),
    /// The run reached its target; emitted once.
    Finished(f64),
    /// The run was cancelled before this frame; the angle is where it stopped.
    Cancelled(f64),
}

pub struct RotationAnimator {
    profile: AnimationProfile,
    run: Option<AnimationRun>,
    token: CancelToken,
}

impl RotationAnimator {
    pub fn new(profile: AnimationProfile) -> Self {
        Self {
            profile,
            run: None,
            token: CancelToken::new(),
        }
    }

    pub fn profile(&self) -> &AnimationProfile {
        &self.profile
    }

    pub fn run(&self) -> Option<&AnimationRun> {
        self.run.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some() && !self.token.is_cancelled()
    }

    /// Starts turning from `start_angle` by `delta` degrees.
    ///
    /// Fails with [`SpinError::Busy`] while another run is live; a cancelled run that
    /// has not been ticked yet is discarded.
    pub fn start<R: Rng>(
        &mut self,
        start_angle: f64,
        delta: f64,
        rng: &mut R,
    ) -> Result<CancelToken, SpinError> {
        if self.is_running() {
            return Err(SpinError::Busy);
        }

        let jitter = self.profile.deceleration_jitter_ms as i64;
        let offset = if jitter > 0 { rng.gen_range(-jitter..=jitter) } else { 0 };
        let deceleration =
            Duration::from_millis((self.profile.deceleration_ms as i64 + offset).max(0) as u64);

        let run = AnimationRun::new(start_angle, delta, deceleration, &self.profile);
        log::debug!(
            "Animating {:.2} -> {:.2} (peak {:.2} deg/frame, deceleration {:?})",
            run.start_angle,
            run.target_angle,
            run.peak_velocity,
            run.deceleration
        );

        self.run = Some(run);
        self.token = CancelToken::new();
        Ok(self.token.clone())
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn tick(&mut self, dt: Duration) -> Step {
        let Some(run) = self.run.as_mut() else {
            return Step::Idle;
        };

        if self.token.is_cancelled() {
            let angle = run.current_angle;
            self.run = None;
            return Step::Cancelled(angle);
        }

        run.advance(dt, &self.profile);
        log::trace!("{} at {:.2} ({:.3} deg/frame)", run.phase, run.current_angle, run.velocity);

        if run.phase == Phase::Done {
            let angle = run.target_angle;
            self.run = None;
            Step::Finished(angle)
        } else {
            Step::Progress(run.current_angle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    /// Ticks until the run ends, returning every reported angle and the final step.
    fn drive(animator: &mut RotationAnimator, dt: Duration) -> (Vec<f64>, Step) {
        let mut angles = Vec::new();
        for _ in 0..10_000 {
            match animator.tick(dt) {
                Step::Progress(angle) => angles.push(angle),
                step => return (angles, step),
            }
        }
        panic!("animation did not finish");
    }

    #[test]
    fn test_run_is_monotonic_and_lands_exactly() {
        let mut animator = RotationAnimator::new(AnimationProfile::default());
        let delta = 6.0 * 360.0 + 123.4;
        animator.start(17.5, delta, &mut rng()).unwrap();

        let (angles, last) = drive(&mut animator, FRAME_INTERVAL);
        assert_eq!(last, Step::Finished(17.5 + delta));
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
        assert!(angles.iter().all(|&a| a <= 17.5 + delta));
        assert!(!animator.is_running());
        assert_eq!(animator.tick(FRAME_INTERVAL), Step::Idle);
    }

    #[test]
    fn test_phases_advance_in_order() {
        let mut animator = RotationAnimator::new(AnimationProfile::default());
        animator.start(0.0, 7.0 * 360.0, &mut rng()).unwrap();

        let mut seen = vec![Phase::Accelerating];
        while let Step::Progress(_) = animator.tick(FRAME_INTERVAL) {
            let phase = animator.run().unwrap().phase();
            if seen.last() != Some(&phase) {
                seen.push(phase);
            }
        }
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
        assert_eq!(
            &seen[..3],
            &[Phase::Accelerating, Phase::Cruising, Phase::Decelerating]
        );
    }

    #[test]
    fn test_irregular_frames_still_land_exactly() {
        let mut animator = RotationAnimator::new(AnimationProfile::default());
        let mut frames = StdRng::seed_from_u64(7);
        animator.start(90.0, 5.0 * 360.0 + 10.0, &mut rng()).unwrap();

        let mut last_angle = 90.0;
        loop {
            let dt = Duration::from_millis(frames.gen_range(1..120));
            match animator.tick(dt) {
                Step::Progress(angle) => {
                    assert!(angle >= last_angle);
                    last_angle = angle;
                }
                Step::Finished(angle) => {
                    assert_eq!(angle, 90.0 + 5.0 * 360.0 + 10.0);
                    break;
                }
                step => panic!("unexpected {step:?}"),
            }
        }
    }

    #[test]
    fn test_huge_frame_gap_does_not_overshoot() {
        let mut animator = RotationAnimator::new(AnimationProfile::default());
        animator.start(0.0, 2000.0, &mut rng()).unwrap();
        animator.tick(FRAME_INTERVAL);

        match animator.tick(Duration::from_secs(30)) {
            Step::Progress(angle) => assert!(angle <= 2000.0),
            Step::Finished(angle) => assert_eq!(angle, 2000.0),
            step => panic!("unexpected {step:?}"),
        }
        let (_, last) = drive(&mut animator, FRAME_INTERVAL);
        assert!(matches!(last, Step::Finished(_) | Step::Idle));
    }

    #[test]
    fn test_zero_delta_finishes_on_first_tick() {
        let mut animator = RotationAnimator::new(AnimationProfile::default());
        animator.start(45.0, 0.0, &mut rng()).unwrap();
        assert_eq!(animator.tick(FRAME_INTERVAL), Step::Finished(45.0));
    }

    #[test]
    fn test_cancel_mid_cruise_freezes_angle() {
        let mut animator = RotationAnimator::new(AnimationProfile::default());
        let token = animator.start(0.0, 7.0 * 360.0, &mut rng()).unwrap();

        let mut frozen = 0.0;
        while animator.run().map(|r| r.phase()) != Some(Phase::Cruising) {
            if let Step::Progress(angle) = animator.tick(FRAME_INTERVAL) {
                frozen = angle;
            }
        }

        token.cancel();
        token.cancel();
        assert!(!animator.is_running());
        assert_eq!(animator.tick(FRAME_INTERVAL), Step::Cancelled(frozen));
        assert!(frozen < 7.0 * 360.0);
        for _ in 0..1000 {
            assert_eq!(animator.tick(FRAME_INTERVAL), Step::Idle);
        }
    }

    #[test]
    fn test_busy_until_cancelled() {
        let mut animator = RotationAnimator::new(AnimationProfile::default());
        animator.start(0.0, 1800.0, &mut rng()).unwrap();
        animator.tick(FRAME_INTERVAL);

        assert_eq!(
            animator.start(0.0, 900.0, &mut rng()).unwrap_err(),
            SpinError::Busy
        );

        animator.cancel();
        let restarted = animator.start(10.0, 900.0, &mut rng());
        assert!(restarted.is_ok());
        assert_eq!(animator.run().map(|r| r.start_angle()), Some(10.0));
    }

    #[test]
    fn test_deceleration_jitter_is_bounded() {
        let profile = AnimationProfile::default();
        let mut animator = RotationAnimator::new(profile.clone());
        let mut rng = rng();
        let lo = profile.deceleration() - Duration::from_millis(profile.deceleration_jitter_ms);
        let hi = profile.deceleration() + Duration::from_millis(profile.deceleration_jitter_ms);

        for _ in 0..50 {
            animator.start(0.0, 1800.0, &mut rng).unwrap();
            let deceleration = animator.run().unwrap().deceleration();
            assert!(deceleration >= lo && deceleration <= hi);
            animator.cancel();
        }
    }

    #[test]
    fn test_peak_velocity_respects_bounds() {
        let profile = AnimationProfile::default();
        let decel = profile.deceleration();
        assert_eq!(profile.peak_velocity(1.0, decel), profile.min_velocity);
        assert_eq!(profile.peak_velocity(1e9, decel), profile.max_velocity);

        let instant = AnimationProfile {
            acceleration_ms: 0,
            cruise_ms: 0,
            deceleration_ms: 0,
            ..AnimationProfile::default()
        };
        assert_eq!(instant.peak_velocity(500.0, Duration::ZERO), instant.max_velocity);
    }

    #[test]
    fn test_instant_profile_settles() {
        let profile = AnimationProfile {
            acceleration_ms: 0,
            cruise_ms: 0,
            deceleration_ms: 0,
            deceleration_jitter_ms: 0,
            ..AnimationProfile::default()
        };
        let mut animator = RotationAnimator::new(profile);
        animator.start(0.0, 720.0, &mut rng()).unwrap();
        let (_, last) = drive(&mut animator, FRAME_INTERVAL);
        assert_eq!(last, Step::Finished(720.0));
    }

    #[test]
    fn test_stalling_profiles_are_rejected() {
        assert_eq!(AnimationProfile::default().validate(), Ok(()));

        let cases = vec![
            AnimationProfile {
                smoothing: 0.0,
                ..AnimationProfile::default()
            },
            AnimationProfile {
                smoothing: 1.5,
                ..AnimationProfile::default()
            },
            AnimationProfile {
                min_creep: 0.0,
                settle_gain: 0.0,
                ..AnimationProfile::default()
            },
            AnimationProfile {
                settle_gain: -0.1,
                ..AnimationProfile::default()
            },
            AnimationProfile {
                min_velocity: 50.0,
                max_velocity: 10.0,
                ..AnimationProfile::default()
            },
            AnimationProfile {
                max_velocity: f64::INFINITY,
                ..AnimationProfile::default()
            },
            AnimationProfile {
                coverage: f64::NAN,
                ..AnimationProfile::default()
            },
        ];

        for profile in cases {
            assert!(profile.validate().is_err(), "{profile:?}");
        }
    }

    #[test]
    fn test_minimal_valid_profile_still_lands() {
        let profile = AnimationProfile {
            min_velocity: 0.0,
            settle_gain: 0.0,
            min_creep: 0.05,
            smoothing: 1.0,
            ..AnimationProfile::default()
        };
        assert_eq!(profile.validate(), Ok(()));

        let mut animator = RotationAnimator::new(profile);
        animator.start(0.0, 1890.0, &mut rng()).unwrap();
        let (_, last) = drive(&mut animator, FRAME_INTERVAL);
        assert_eq!(last, Step::Finished(1890.0));
    }
}
