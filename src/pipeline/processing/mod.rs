// Pure table transforms: each takes the previous stage's table and returns the next

pub mod aggregate;
pub mod clean;
pub mod percentile;

pub use clean::{CleanOutput, CleaningStats, TripType};
