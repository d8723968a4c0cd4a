//! Slot/angle convention shared by outcome generation and outcome resolution.
//!
//! Angles are in degrees, counter-clockwise from the +x axis, so 270 is the bottom of
//! the wheel. In the wheel's own frame slot 0 is centered at 0 and slot `i` at
//! `i * slot_width`. Rotating the wheel by `r` moves every slot by `+r`; the pointer
//! never moves. Both mappings below are derived from this single model.

use super::{FULL_TURN, SpinError};

/// Wraps any angle into `[0, 360)`. Non-finite input maps to 0.
pub fn normalize(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(FULL_TURN);
    // rem_euclid rounds tiny negatives up to exactly 360
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelLayout {
    slot_count: usize,
    pointer_angle: f64,
}

/// Angular extent of one slot in the wheel's own frame. `start` may be negative for
/// slot 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector {
    pub start: f64,
    pub center: f64,
    pub end: f64,
}

impl WheelLayout {
    pub fn new(slot_count: usize, pointer_angle: f64) -> Result<Self, SpinError> {
        if slot_count == 0 {
            return Err(SpinError::NotConfigured("slot count must be positive"));
        }
        Ok(Self {
            slot_count,
            pointer_angle: normalize(pointer_angle),
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn pointer_angle(&self) -> f64 {
        self.pointer_angle
    }

    pub fn slot_width(&self) -> f64 {
        FULL_TURN / self.slot_count as f64
    }

    pub fn contains(&self, slot: usize) -> bool {
        slot < self.slot_count
    }

    pub fn sector(&self, slot: usize) -> Sector {
        let width = self.slot_width();
        let center = (slot % self.slot_count) as f64 * width;
        Sector {
            start: center - width / 2.0,
            center,
            end: center + width / 2.0,
        }
    }

    /// Wheel rotation (mod 360) that puts the center of `slot` under the pointer.
    pub fn slot_to_alignment_angle(&self, slot: usize) -> f64 {
        normalize(self.pointer_angle - self.sector(slot).center)
    }

    /// Slot under the pointer for an absolute wheel rotation.
    ///
    /// Exact inverse of [`slot_to_alignment_angle`](Self::slot_to_alignment_angle): the
    /// pointer's position in the wheel's own frame is `pointer - rotation`, and the
    /// slot whose sector contains it wins. Sectors are centered on their slot, so an
    /// aligned rotation sits half a slot away from either boundary.
    pub fn angle_to_slot(&self, rotation: f64) -> usize {
        let width = self.slot_width();
        let offset = normalize(self.pointer_angle - normalize(rotation));
        ((offset + width / 2.0) / width).floor() as usize % self.slot_count
    }
}
