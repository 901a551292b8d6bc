pub mod counts;
pub mod demand;
pub mod destinations;
pub mod generator;
pub mod time_slice;
pub mod trip;

pub use counts::{HourCounts, TrafficCounts};
pub use generator::{SliceTrips, TrafficGenerator};
pub use time_slice::TimeSlice;
pub use trip::{Trip, TripIdGenerator, TripKind, VehicleType};
