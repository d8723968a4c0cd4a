use super::SpinError;
use super::geometry::WheelLayout;
use super::outcome::SpinOutcome;

/// Slot under the pointer once the wheel has stopped at `final_angle`.
pub fn resolve(final_angle: f64, layout: &WheelLayout) -> usize {
    layout.angle_to_slot(final_angle)
}

/// Checks that the wheel visibly stopped on the slot that was generated.
pub fn assert_consistent(
    outcome: &SpinOutcome,
    final_angle: f64,
    layout: &WheelLayout,
) -> Result<usize, SpinError> {
    let actual = resolve(final_angle, layout);
    if actual == outcome.target_slot {
        Ok(actual)
    } else {
        Err(SpinError::OutcomeMismatch {
            expected: outcome.target_slot,
            actual,
            angle: final_angle,
        })
    }
}
