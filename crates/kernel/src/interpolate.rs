use crate::state::SimulationState;

/// Blend two adjacent simulation states into a presentation state.
///
/// Positions are lerped by `factor`; every other field, direction included,
/// comes from `next` unchanged. `out` is refilled in place.
///
/// `prev` and `next` must be index-aligned (same entities in the same order).
pub fn interpolate(
    prev: &SimulationState,
    next: &SimulationState,
    factor: f32,
    out: &mut SimulationState,
) {
    debug_assert_eq!(
        prev.len(),
        next.len(),
        "interpolated buffers must be index-aligned"
    );

    out.enemies.clone_from(&next.enemies);

    // The endpoints are copied rather than lerped so they come out exact.
    if factor >= 1.0 {
        return;
    }
    for (blended, before) in out.enemies.iter_mut().zip(&prev.enemies) {
        blended.position = if factor <= 0.0 {
            before.position
        } else {
            before.position.lerp(blended.position, factor)
        };
    }
}
