use super::geometry::{WheelLayout, normalize};
use super::prize::{Prize, PrizeKey, PrizeTable};
use super::stats::{ResetScope, RunningStatistics, StatisticsSnapshot};
use super::{DEFAULT_MAX_REPEATS, FULL_TURN, MAX_FULL_TURNS, MIN_FULL_TURNS, SpinError};
use derive_more::{Display, From, Into};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub struct SpinId(Uuid);

impl SpinId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpinId {
    fn default() -> Self {
        Self::new()
    }
}

/// What counts as "the same result" for repeat suppression.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RepeatGranularity {
    #[default]
    Slot,
    Prize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub forced_slot: Option<usize>,
    pub weights: Option<Vec<f64>>,
    pub anti_repeat: bool,
    pub max_repeats: usize,
    pub repeat_granularity: RepeatGranularity,
    pub full_turns: Option<u32>,
    /// Absolute rotation the wheel is at when the spin starts.
    pub current_rotation: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            forced_slot: None,
            weights: None,
            anti_repeat: true,
            max_repeats: DEFAULT_MAX_REPEATS,
            repeat_granularity: RepeatGranularity::Slot,
            full_turns: None,
            current_rotation: 0.0,
        }
    }
}

impl GenerateOptions {
    pub fn forced(slot: usize) -> Self {
        Self {
            forced_slot: Some(slot),
            ..Self::default()
        }
    }

    pub fn with_full_turns(mut self, turns: u32) -> Self {
        self.full_turns = Some(turns);
        self
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn from_rotation(mut self, rotation: f64) -> Self {
        self.current_rotation = rotation;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinOutcome {
    pub id: SpinId,
    pub target_slot: usize,
    pub prize: Prize,
    pub full_turns: u32,
    /// Part of the delta below one turn, in `[0, 360)`.
    pub alignment_angle: f64,
    pub rotation_delta: f64,
}

#[derive(Debug, Clone, Default)]
struct RepeatHistory {
    last_slot: Option<usize>,
    slot_streak: usize,
    last_prize: Option<PrizeKey>,
    prize_streak: usize,
}

impl RepeatHistory {
    fn push(&mut self, slot: usize, prize: PrizeKey) {
        if self.last_slot == Some(slot) {
            self.slot_streak += 1;
        } else {
            self.last_slot = Some(slot);
            self.slot_streak = 1;
        }

        if self.last_prize.as_ref() == Some(&prize) {
            self.prize_streak += 1;
        } else {
            self.last_prize = Some(prize);
            self.prize_streak = 1;
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Checks that `weights` gives every slot a usable, non-negative weight.
pub fn validate_weights(weights: &[f64], slot_count: usize) -> Result<(), SpinError> {
    if weights.len() != slot_count {
        return Err(SpinError::InvalidWeights(format!(
            "expected {} weights, got {}",
            slot_count,
            weights.len()
        )));
    }
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(SpinError::InvalidWeights(format!(
            "weight {bad} is not a non-negative number"
        )));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(SpinError::InvalidWeights("weights sum to zero".to_string()));
    }
    Ok(())
}

/// Picks spin results for one wheel and keeps the running tally.
///
/// Owned by the caller; nothing here is shared implicitly between wheels.
pub struct OutcomeGenerator<R = StdRng> {
    layout: WheelLayout,
    prizes: PrizeTable,
    stats: RunningStatistics,
    history: RepeatHistory,
    rng: R,
}

impl OutcomeGenerator<StdRng> {
    pub fn new(layout: WheelLayout, prizes: PrizeTable) -> Self {
        Self::with_rng(layout, prizes, StdRng::from_entropy())
    }

    pub fn seeded(layout: WheelLayout, prizes: PrizeTable, seed: u64) -> Self {
        Self::with_rng(layout, prizes, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> OutcomeGenerator<R> {
    pub fn with_rng(layout: WheelLayout, prizes: PrizeTable, rng: R) -> Self {
        Self {
            stats: RunningStatistics::new(layout.slot_count()),
            history: RepeatHistory::default(),
            layout,
            prizes,
            rng,
        }
    }

    pub fn layout(&self) -> &WheelLayout {
        &self.layout
    }

    pub fn prizes(&self) -> &PrizeTable {
        &self.prizes
    }

    pub fn generate(&mut self, options: &GenerateOptions) -> Result<SpinOutcome, SpinError> {
        let slot_count = self.layout.slot_count();
        if slot_count == 0 || self.prizes.is_empty() {
            return Err(SpinError::NotConfigured("generator has no slots or prizes"));
        }

        let target_slot = match options.forced_slot {
            Some(slot) if self.layout.contains(slot) => slot,
            Some(slot) => return Err(SpinError::InvalidSlot { slot, slot_count }),
            None => {
                let weights = self.base_weights(options.weights.as_deref())?;
                self.sample_slot(&weights, options)
            }
        };

        let full_turns = options
            .full_turns
            .unwrap_or_else(|| self.rng.gen_range(MIN_FULL_TURNS..MAX_FULL_TURNS));
        let alignment_angle = normalize(
            self.layout.slot_to_alignment_angle(target_slot) - normalize(options.current_rotation),
        );
        let rotation_delta = full_turns as f64 * FULL_TURN + alignment_angle;

        let prize = self.prizes.prize_for_slot(target_slot).clone();
        self.stats.record(target_slot, &prize);
        self.history.push(target_slot, prize.key());

        let outcome = SpinOutcome {
            id: SpinId::new(),
            target_slot,
            prize,
            full_turns,
            alignment_angle,
            rotation_delta,
        };

        log::debug!(
            "Generated spin {}: slot {} ({}), {} turns, delta {:.2}",
            outcome.id,
            outcome.target_slot,
            outcome.prize.label,
            outcome.full_turns,
            outcome.rotation_delta
        );

        Ok(outcome)
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&mut self, scope: ResetScope) {
        self.stats.reset();
        if scope == ResetScope::All {
            self.history.clear();
        }
    }

    fn base_weights(&self, weights: Option<&[f64]>) -> Result<Vec<f64>, SpinError> {
        let slot_count = self.layout.slot_count();
        match weights {
            Some(weights) => {
                validate_weights(weights, slot_count)?;
                Ok(weights.to_vec())
            }
            None => Ok(vec![1.0; slot_count]),
        }
    }

    fn sample_slot(&mut self, weights: &[f64], options: &GenerateOptions) -> usize {
        let excluded = self.excluded_slots(options);
        if excluded.iter().any(|&e| e) {
            let restricted = weights
                .iter()
                .zip(&excluded)
                .map(|(&w, &skip)| if skip { 0.0 } else { w });
            // every remaining slot weighs zero: fall back to the full distribution
            if let Ok(dist) = WeightedIndex::new(restricted) {
                return dist.sample(&mut self.rng);
            }
            log::debug!("Anti-repeat excluded every slot, sampling unrestricted");
        }

        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            // validated in base_weights
            Err(_) => self.rng.gen_range(0..self.layout.slot_count()),
        }
    }

    fn excluded_slots(&self, options: &GenerateOptions) -> Vec<bool> {
        let slot_count = self.layout.slot_count();
        let mut excluded = vec![false; slot_count];
        if !options.anti_repeat {
            return excluded;
        }
        let max_repeats = options.max_repeats.max(1);

        match options.repeat_granularity {
            RepeatGranularity::Slot => {
                if let Some(slot) = self.history.last_slot
                    && self.history.slot_streak >= max_repeats
                    && slot < slot_count
                {
                    excluded[slot] = true;
                }
            }
            RepeatGranularity::Prize => {
                if let Some(key) = &self.history.last_prize
                    && self.history.prize_streak >= max_repeats
                {
                    for (slot, prize) in self.prizes.for_slots(slot_count).enumerate() {
                        excluded[slot] = &prize.key() == key;
                    }
                }
            }
        }
        excluded
    }
}
