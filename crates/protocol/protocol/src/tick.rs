//! Aggregation ticks.

/// Resolution of the live aggregation series, in seconds.
pub const AGGREGATION_RESOLUTION: u64 = 10;

/// Number of ticks in the live aggregation series: 60 buckets of 10 seconds cover the trailing
/// ten minutes.
pub const AGGREGATION_TICKS: usize = 60;

/// One bucket of an aggregation series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick<T> {
    /// The bucket timestamp, in unix seconds.
    pub timestamp: u64,
    /// The aggregated value.
    pub value: T,
}

impl<T> Tick<T> {
    /// Creates a new [`Tick`].
    pub const fn new(timestamp: u64, value: T) -> Self {
        Self { timestamp, value }
    }
}

/// A tick carrying a summed count (transactions, gas).
pub type CountTick = Tick<u64>;

/// A tick carrying an averaged value (time-to-finality).
pub type FloatTick = Tick<f64>;

/// A single time-to-finality observation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TtfSample {
    /// When the sample was taken, in unix seconds.
    pub timestamp: u64,
    /// Time to finality, in seconds.
    pub value: f64,
}

/// Returns the start of the `resolution` wide bucket containing `timestamp`.
pub const fn aggregation_bucket(timestamp: u64, resolution: u64) -> u64 {
    timestamp / resolution * resolution
}

/// Returns the `ticks` timestamps of a series ending at `end`, spaced by `resolution`, in
/// ascending order.
pub fn series_timestamps(end: u64, resolution: u64, ticks: usize) -> impl Iterator<Item = u64> {
    let first = end.saturating_sub(resolution.saturating_mul(ticks.saturating_sub(1) as u64));
    (0..ticks as u64).map(move |i| first + i * resolution)
}
