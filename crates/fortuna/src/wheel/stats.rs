use super::prize::{Prize, PrizeKey};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display as StrumDisplay, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, StrumDisplay)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum ResetScope {
    /// Zero the counters, keep the anti-repeat history.
    #[default]
    Counters,
    /// Zero the counters and forget recent results.
    All,
}

#[derive(Debug, Clone)]
pub struct RunningStatistics {
    total_spins: u64,
    slot_hits: Vec<u64>,
    prize_hits: BTreeMap<PrizeKey, u64>,
}

impl RunningStatistics {
    pub fn new(slot_count: usize) -> Self {
        Self {
            total_spins: 0,
            slot_hits: vec![0; slot_count],
            prize_hits: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, slot: usize, prize: &Prize) {
        self.total_spins += 1;
        if let Some(hits) = self.slot_hits.get_mut(slot) {
            *hits += 1;
        }
        *self.prize_hits.entry(prize.key()).or_default() += 1;
    }

    pub fn reset(&mut self) {
        self.total_spins = 0;
        self.slot_hits.fill(0);
        self.prize_hits.clear();
    }

    pub fn total_spins(&self) -> u64 {
        self.total_spins
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let weighted: f64 = self
            .slot_hits
            .iter()
            .enumerate()
            .map(|(slot, &hits)| hits as f64 * slot as f64)
            .sum();
        let average_slot = if self.total_spins == 0 {
            0.0
        } else {
            weighted / self.total_spins as f64
        };

        StatisticsSnapshot {
            total_spins: self.total_spins,
            slot_hits: self.slot_hits.clone(),
            prize_hits: self.prize_hits.clone(),
            average_slot,
        }
    }
}

/// Detached copy of the tally; later spins do not show up in it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSnapshot {
    pub total_spins: u64,
    pub slot_hits: Vec<u64>,
    pub prize_hits: BTreeMap<PrizeKey, u64>,
    pub average_slot: f64,
}

impl StatisticsSnapshot {
    pub fn slot_share(&self, slot: usize) -> f64 {
        match (self.total_spins, self.slot_hits.get(slot)) {
            (0, _) | (_, None) => 0.0,
            (total, Some(&hits)) => hits as f64 / total as f64,
        }
    }
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "spins: {}", self.total_spins)?;
        writeln!(f, "average slot: {:.3}", self.average_slot)?;
        for (slot, hits) in self.slot_hits.iter().enumerate() {
            writeln!(
                f,
                "slot {slot:>3}: {hits:>8} ({:>5.1}%)",
                self.slot_share(slot) * 100.0
            )?;
        }
        for (key, hits) in &self.prize_hits {
            writeln!(f, "prize {key}: {hits}")?;
        }
        Ok(())
    }
}
