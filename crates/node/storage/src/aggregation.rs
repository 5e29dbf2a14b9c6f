//! Time-bucketed aggregation of timestamped samples.
//!
//! A series for `(end, resolution, ticks)` covers the window `(end - ticks * resolution, end]`.
//! A sample at `timestamp` lands in the bucket stamped
//! `end - resolution * floor((end - timestamp) / resolution)`, so bucket stamps are inclusive
//! upper bounds. Buckets without samples carry zero.

use opera_protocol::{CountTick, FloatTick, Tick, series_timestamps};

/// Returns the index of the bucket holding `timestamp`, or `None` if it falls outside the
/// window.
fn bucket_index(timestamp: u64, end: u64, resolution: u64, ticks: usize) -> Option<usize> {
    if timestamp > end {
        return None;
    }
    let offset = (end - timestamp) / resolution;
    if offset >= ticks as u64 {
        return None;
    }
    Some(ticks - 1 - offset as usize)
}

/// Sums `(timestamp, value)` samples into `ticks` buckets ending at `end`.
pub fn sum_series<I>(samples: I, end: u64, resolution: u64, ticks: usize) -> Vec<CountTick>
where
    I: IntoIterator<Item = (u64, u64)>,
{
    let resolution = resolution.max(1);
    let mut sums = vec![0u64; ticks];
    for (timestamp, value) in samples {
        if let Some(index) = bucket_index(timestamp, end, resolution, ticks) {
            sums[index] = sums[index].saturating_add(value);
        }
    }
    series_timestamps(end, resolution, ticks)
        .zip(sums)
        .map(|(ts, sum)| Tick::new(ts, sum))
        .collect()
}

/// Averages `(timestamp, value)` samples into `ticks` buckets ending at `end`.
///
/// Averages are rounded half-to-even to two decimals.
pub fn average_series<I>(samples: I, end: u64, resolution: u64, ticks: usize) -> Vec<FloatTick>
where
    I: IntoIterator<Item = (u64, f64)>,
{
    let resolution = resolution.max(1);
    let mut buckets = vec![(0f64, 0u64); ticks];
    for (timestamp, value) in samples {
        if let Some(index) = bucket_index(timestamp, end, resolution, ticks) {
            buckets[index].0 += value;
            buckets[index].1 += 1;
        }
    }
    series_timestamps(end, resolution, ticks)
        .zip(buckets)
        .map(|(ts, (sum, n))| {
            let average = if n == 0 { 0.0 } else { round_two_decimals(sum / n as f64) };
            Tick::new(ts, average)
        })
        .collect()
}

/// Rounds half-to-even to two decimals.
fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
