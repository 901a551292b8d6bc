use rand::Rng;

use crate::simulation::config::Traffic;
use crate::simulation::error::Result;
use crate::simulation::network::Zone;
use crate::simulation::traffic::TimeSlice;

/// Combined scaling of the base volume for trips starting in `zone` during `slice`.
pub fn demand_factor(traffic: &Traffic, slice: TimeSlice, zone: Zone) -> Result<f64> {
    let hour_multiplier = traffic
        .hour_multipliers
        .multiplier(slice.hour, slice.is_weekend())?;
    Ok(hour_multiplier * traffic.zone_factors.factor(zone))
}

/// Number of trips starting at one intersection. A base volume is drawn uniformly from
/// `0..=max` and scaled by the time of day and the zone of the intersection.
pub fn simulate_count<R: Rng + ?Sized>(
    traffic: &Traffic,
    slice: TimeSlice,
    zone: Zone,
    max: u32,
    rng: &mut R,
) -> Result<u32> {
    let base = rng.random_range(0..=max);
    let scaled = (base as f64 * demand_factor(traffic, slice, zone)?).floor();
    Ok(scaled.max(0.) as u32)
}
