use super::animator::{AnimationProfile, CancelToken, RotationAnimator, Step};
use super::geometry::{WheelLayout, normalize};
use super::outcome::{GenerateOptions, OutcomeGenerator, SpinId, SpinOutcome};
use super::prize::{Prize, PrizeTable};
use super::resolver::{assert_consistent, resolve};
use super::SpinError;
use crate::events::SpinEvent;
use async_channel::Sender;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Result surfaced to the host when a spin finishes on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub spin_id: SpinId,
    pub final_angle: f64,
    /// Generated slot; authoritative even when the wheel visibly stopped elsewhere.
    pub slot: usize,
    pub prize: Prize,
    /// Slot read back from `final_angle`.
    pub resolved_slot: usize,
}

impl Completion {
    pub fn is_consistent(&self) -> bool {
        self.slot == self.resolved_slot
    }
}

pub trait SpinObserver {
    fn on_generate(&mut self, _outcome: &SpinOutcome) {}
    fn on_progress(&mut self, _angle: f64) {}
    fn on_complete(&mut self, _completion: &Completion) {}
    fn on_cancel(&mut self, _angle: f64) {}
}

/// Forwards wheel callbacks into a channel.
pub struct ChannelObserver(Sender<SpinEvent>);

impl ChannelObserver {
    pub fn new(tx: Sender<SpinEvent>) -> Self {
        Self(tx)
    }

    fn forward(&self, event: SpinEvent) {
        if let Err(e) = self.0.try_send(event) {
            log::warn!("Dropping spin event: {}", e);
        }
    }
}

impl SpinObserver for ChannelObserver {
    fn on_generate(&mut self, outcome: &SpinOutcome) {
        self.forward(SpinEvent::Generated(outcome.clone()));
    }

    fn on_progress(&mut self, angle: f64) {
        self.forward(SpinEvent::Progress(angle));
    }

    fn on_complete(&mut self, completion: &Completion) {
        self.forward(SpinEvent::Completed(completion.clone()));
    }

    fn on_cancel(&mut self, angle: f64) {
        self.forward(SpinEvent::Cancelled(angle));
    }
}

pub struct SpinHandle {
    outcome: SpinOutcome,
    token: CancelToken,
}

impl SpinHandle {
    pub fn outcome(&self) -> &SpinOutcome {
        &self.outcome
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// One wheel instance: its layout, its rotation and at most one live animation.
pub struct Wheel {
    layout: Option<WheelLayout>,
    prizes: Option<PrizeTable>,
    animator: RotationAnimator,
    rotation: f64,
    active: Option<SpinOutcome>,
    observer: Option<Box<dyn SpinObserver + Send>>,
    rng: StdRng,
}

impl Wheel {
    pub fn new(profile: AnimationProfile) -> Self {
        Self {
            layout: None,
            prizes: None,
            animator: RotationAnimator::new(profile),
            rotation: 0.0,
            active: None,
            observer: None,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn init_wheel(&mut self, layout: WheelLayout, prizes: PrizeTable) {
        log::debug!(
            "Wheel initialised with {} slots, pointer at {:.1}, {} prizes",
            layout.slot_count(),
            layout.pointer_angle(),
            prizes.len()
        );
        self.layout = Some(layout);
        self.prizes = Some(prizes);
    }

    pub fn set_observer(&mut self, observer: impl SpinObserver + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn layout(&self) -> Option<&WheelLayout> {
        self.layout.as_ref()
    }

    pub fn prizes(&self) -> Option<&PrizeTable> {
        self.prizes.as_ref()
    }

    /// Absolute rotation; keeps growing across spins.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Rotation wrapped into `[0, 360)` for drawing.
    pub fn display_rotation(&self) -> f64 {
        normalize(self.rotation)
    }

    pub fn is_spinning(&self) -> bool {
        self.animator.is_running()
    }

    pub fn spin<R: Rng>(
        &mut self,
        generator: &mut OutcomeGenerator<R>,
        mut options: GenerateOptions,
    ) -> Result<SpinHandle, SpinError> {
        let layout = self
            .layout
            .ok_or(SpinError::NotConfigured("wheel has not been initialised"))?;
        if generator.layout() != &layout {
            return Err(SpinError::LayoutMismatch {
                generator: generator.layout().slot_count(),
                wheel: layout.slot_count(),
            });
        }
        // checked before generating so a refused spin leaves the tally alone
        if self.animator.is_running() {
            return Err(SpinError::Busy);
        }

        options.current_rotation = self.rotation;
        let outcome = generator.generate(&options)?;

        // a run cancelled since the last frame is replaced before it reported
        if let Some(previous) = self.active.take() {
            log::debug!("Spin {} cancelled at {:.2}", previous.id, self.rotation);
            if let Some(observer) = self.observer.as_mut() {
                observer.on_cancel(self.rotation);
            }
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.on_generate(&outcome);
        }

        let token = self
            .animator
            .start(self.rotation, outcome.rotation_delta, &mut self.rng)?;
        self.active = Some(outcome.clone());

        Ok(SpinHandle { outcome, token })
    }

    pub fn cancel(&self) {
        self.animator.cancel();
    }

    /// Advances the live spin by one frame.
    pub fn tick(&mut self, dt: Duration) -> Step {
        let step = self.animator.tick(dt);
        match step {
            Step::Idle => {}
            Step::Progress(angle) => {
                self.rotation = angle;
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_progress(angle);
                }
            }
            Step::Finished(angle) => {
                self.rotation = angle;
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_progress(angle);
                }
                self.complete(angle);
            }
            Step::Cancelled(angle) => {
                self.rotation = angle;
                if let Some(outcome) = self.active.take() {
                    log::debug!("Spin {} cancelled at {:.2}", outcome.id, angle);
                }
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_cancel(angle);
                }
            }
        }
        step
    }

    fn complete(&mut self, final_angle: f64) {
        let (Some(outcome), Some(layout)) = (self.active.take(), self.layout) else {
            return;
        };

        let resolved_slot = match assert_consistent(&outcome, final_angle, &layout) {
            Ok(slot) => slot,
            Err(e) => {
                log::error!("{}; keeping generated result for spin {}", e, outcome.id);
                resolve(final_angle, &layout)
            }
        };

        let completion = Completion {
            spin_id: outcome.id,
            final_angle,
            slot: outcome.target_slot,
            prize: outcome.prize,
            resolved_slot,
        };
        log::debug!(
            "Spin {} stopped at {:.2} on slot {}",
            completion.spin_id,
            final_angle,
            completion.slot
        );

        if let Some(observer) = self.observer.as_mut() {
            observer.on_complete(&completion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wheel::FRAME_INTERVAL;
    use crate::wheel::stats::StatisticsSnapshot;
    use async_channel::Receiver;

    fn prizes() -> PrizeTable {
        PrizeTable::new(
            (0..12)
                .map(|i| Prize::new(format!("Prize {i}"), i as f64, "icon"))
                .collect(),
        )
        .unwrap()
    }

    fn setup() -> (Wheel, OutcomeGenerator, Receiver<SpinEvent>) {
        let layout = WheelLayout::new(12, 270.0).unwrap();
        let mut wheel = Wheel::new(AnimationProfile::default());
        wheel.init_wheel(layout, prizes());
        let (tx, rx) = async_channel::unbounded();
        wheel.set_observer(ChannelObserver::new(tx));
        (wheel, OutcomeGenerator::seeded(layout, prizes(), 99), rx)
    }

    fn run_to_end(wheel: &mut Wheel) -> Step {
        for _ in 0..10_000 {
            match wheel.tick(FRAME_INTERVAL) {
                Step::Progress(_) => {}
                step => return step,
            }
        }
        panic!("spin did not finish");
    }

    fn drain(rx: &Receiver<SpinEvent>) -> Vec<SpinEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_forced_spin_lands_on_slot() {
        let (mut wheel, mut generator, rx) = setup();
        let handle = wheel
            .spin(&mut generator, GenerateOptions::forced(5).with_full_turns(6))
            .unwrap();
        let delta = handle.outcome().rotation_delta;
        assert_eq!(
            delta,
            2160.0 + wheel.layout().unwrap().slot_to_alignment_angle(5)
        );

        assert_eq!(run_to_end(&mut wheel), Step::Finished(delta));
        assert_eq!(wheel.rotation(), delta);
        assert_eq!(resolve(wheel.rotation(), wheel.layout().unwrap()), 5);

        let events = drain(&rx);
        assert!(matches!(events.first(), Some(SpinEvent::Generated(o)) if o.target_slot == 5));
        let completions: Vec<&Completion> = events
            .iter()
            .filter_map(|e| match e {
                SpinEvent::Completed(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].slot, 5);
        assert!(completions[0].is_consistent());
        assert_eq!(completions[0].prize.label.as_str(), "Prize 5");
    }

    #[test]
    fn test_consecutive_spins_continue_from_rotation() {
        let (mut wheel, mut generator, _rx) = setup();
        for _ in 0..5 {
            let handle = wheel.spin(&mut generator, GenerateOptions::default()).unwrap();
            let target = handle.outcome().target_slot;
            let start = wheel.rotation();

            run_to_end(&mut wheel);
            assert_eq!(wheel.rotation(), start + handle.outcome().rotation_delta);
            assert_eq!(resolve(wheel.rotation(), wheel.layout().unwrap()), target);
        }
        assert_eq!(generator.statistics().total_spins, 5);
    }

    #[test]
    fn test_cancel_mid_cruise() {
        let (mut wheel, mut generator, rx) = setup();
        let handle = wheel.spin(&mut generator, GenerateOptions::forced(2)).unwrap();
        let before: StatisticsSnapshot = generator.statistics();

        // 1.5s in: past acceleration, inside the cruise
        for _ in 0..90 {
            wheel.tick(FRAME_INTERVAL);
        }
        let frozen = wheel.rotation();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(!wheel.is_spinning());

        assert_eq!(wheel.tick(FRAME_INTERVAL), Step::Cancelled(frozen));
        for _ in 0..600 {
            assert_eq!(wheel.tick(FRAME_INTERVAL), Step::Idle);
        }
        assert_eq!(wheel.rotation(), frozen);
        assert_eq!(generator.statistics(), before);

        let events = drain(&rx);
        assert!(!events.iter().any(|e| matches!(e, SpinEvent::Completed(_))));
        assert_eq!(events.last(), Some(&SpinEvent::Cancelled(frozen)));
    }

    #[test]
    fn test_spin_while_running_is_refused() {
        let (mut wheel, mut generator, _rx) = setup();
        wheel.spin(&mut generator, GenerateOptions::default()).unwrap();
        wheel.tick(FRAME_INTERVAL);

        let result = wheel.spin(&mut generator, GenerateOptions::default());
        assert!(matches!(result, Err(SpinError::Busy)));
        assert_eq!(generator.statistics().total_spins, 1);

        wheel.cancel();
        assert!(wheel.spin(&mut generator, GenerateOptions::default()).is_ok());
    }

    #[test]
    fn test_respin_right_after_cancel_reports_cancellation() {
        let (mut wheel, mut generator, rx) = setup();
        let first = wheel.spin(&mut generator, GenerateOptions::forced(1)).unwrap();
        for _ in 0..30 {
            wheel.tick(FRAME_INTERVAL);
        }
        let frozen = wheel.rotation();

        first.cancel();
        let second = wheel.spin(&mut generator, GenerateOptions::forced(4)).unwrap();

        let events = drain(&rx);
        let tail = &events[events.len() - 2..];
        assert_eq!(tail[0], SpinEvent::Cancelled(frozen));
        assert!(matches!(&tail[1], SpinEvent::Generated(o) if o.id == second.outcome().id));

        assert_eq!(run_to_end(&mut wheel), Step::Finished(frozen + second.outcome().rotation_delta));
        let events = drain(&rx);
        assert!(!events.iter().any(|e| matches!(e, SpinEvent::Cancelled(_))));
        assert!(matches!(events.last(), Some(SpinEvent::Completed(c)) if c.slot == 4));
    }

    #[test]
    fn test_uninitialised_wheel() {
        let layout = WheelLayout::new(12, 270.0).unwrap();
        let mut generator = OutcomeGenerator::seeded(layout, prizes(), 1);
        let mut wheel = Wheel::new(AnimationProfile::default());

        let result = wheel.spin(&mut generator, GenerateOptions::default());
        assert!(matches!(result, Err(SpinError::NotConfigured(_))));
        assert_eq!(generator.statistics().total_spins, 0);
    }

    #[test]
    fn test_generator_for_other_layout() {
        let (mut wheel, _, _rx) = setup();
        let other = WheelLayout::new(8, 270.0).unwrap();
        let mut generator = OutcomeGenerator::seeded(other, prizes(), 1);

        let result = wheel.spin(&mut generator, GenerateOptions::default());
        assert!(matches!(
            result,
            Err(SpinError::LayoutMismatch {
                generator: 8,
                wheel: 12
            })
        ));
    }

    #[test]
    fn test_display_rotation_wraps() {
        let (mut wheel, mut generator, _rx) = setup();
        wheel
            .spin(&mut generator, GenerateOptions::forced(3).with_full_turns(5))
            .unwrap();
        run_to_end(&mut wheel);
        assert!(wheel.rotation() > 1800.0);
        assert!((wheel.display_rotation() - 180.0).abs() < 1e-9);
    }
}
