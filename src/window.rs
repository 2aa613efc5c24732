//! Display windowing of feature series
//!
//! Plotting front-ends hand over a window in tick units (typically the span
//! of the tagging records) and get back an independent copy of the series
//! clipped to that window, widened by a small margin on both sides.

use crate::types::FeatureSeries;

/// Fraction of the window's index span added as margin on each side
const WINDOW_MARGIN: f64 = 0.05;

impl FeatureSeries {
    /// Copy of this series clipped to `[start_tick, stop_tick]`
    ///
    /// The power group is windowed on its own clock and the HF group on
    /// its, each widened by `WINDOW_MARGIN` of the index span. The copy
    /// shares no storage with `self`.
    pub fn clipped(&self, start_tick: f64, stop_tick: f64) -> FeatureSeries {
        let power = index_window(&self.time_ticks, start_tick, stop_tick);
        let hf = index_window(&self.hf_time_ticks, start_tick, stop_tick);

        FeatureSeries {
            real: slice_vec(&self.real, power),
            reactive: slice_vec(&self.reactive, power),
            apparent: slice_vec(&self.apparent, power),
            power_factor: slice_vec(&self.power_factor, power),
            time_ticks: slice_vec(&self.time_ticks, power),
            datetimes: slice_vec(&self.datetimes, power),
            hf: slice_vec(&self.hf, hf),
            hf_time_ticks: slice_vec(&self.hf_time_ticks, hf),
            hf_datetimes: slice_vec(&self.hf_datetimes, hf),
            tags: self.tags.clone(),
        }
    }

    /// Overall on/off span of the tagging records, if any
    pub fn tag_span(&self) -> Option<(f64, f64)> {
        let tags = self.tags.as_deref()?;
        let on = tags.iter().map(|tag| tag.on_time).reduce(f64::min)?;
        let off = tags.iter().map(|tag| tag.off_time).reduce(f64::max)?;
        Some((on, off))
    }
}

/// Half-open index range covering `[start_tick, stop_tick]` on `ticks`,
/// widened by the margin; `None` when the series is empty
fn index_window(ticks: &[f64], start_tick: f64, stop_tick: f64) -> Option<(usize, usize)> {
    let start = closest_idx(ticks, start_tick)?;
    let stop = closest_idx(ticks, stop_tick)?;
    let margin = ((stop as f64 - start as f64) * WINDOW_MARGIN) as isize;
    let lo = (start as isize - margin).max(0) as usize;
    let hi = (stop as isize + margin).min(ticks.len() as isize - 1).max(0) as usize;
    Some((lo, hi))
}

/// Index of the tick closest to `target`, first match on ties
fn closest_idx(ticks: &[f64], target: f64) -> Option<usize> {
    ticks
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (**a - target).abs();
            let db = (**b - target).abs();
            da.total_cmp(&db)
        })
        .map(|(index, _)| index)
}

fn slice_vec<T: Clone>(values: &[T], window: Option<(usize, usize)>) -> Vec<T> {
    match window {
        Some((lo, hi)) => values.get(lo..hi).map(<[T]>::to_vec).unwrap_or_default(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagRecord;
    use chrono::{DateTime, Local, Utc};
    use pretty_assertions::assert_eq;

    fn datetimes_for(ticks: &[f64]) -> Vec<DateTime<Local>> {
        ticks
            .iter()
            .map(|&t| {
                DateTime::<Utc>::from_timestamp(t as i64, 0)
                    .unwrap()
                    .with_timezone(&Local)
            })
            .collect()
    }

    fn make_test_series() -> FeatureSeries {
        let ticks: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let hf_ticks: Vec<f64> = (0..10).map(|i| 100.0 + 2.0 * i as f64).collect();
        FeatureSeries {
            real: (0..40).map(f64::from).collect(),
            reactive: vec![0.0; 40],
            apparent: (0..40).map(f64::from).collect(),
            power_factor: vec![1.0; 40],
            datetimes: datetimes_for(&ticks),
            time_ticks: ticks,
            hf: (0..10).map(|i| vec![i as f64; 3]).collect(),
            hf_datetimes: datetimes_for(&hf_ticks),
            hf_time_ticks: hf_ticks,
            tags: Some(vec![
                TagRecord {
                    device_id: 3,
                    device_name: "fridge".to_string(),
                    on_time: 105.0,
                    off_time: 120.0,
                },
                TagRecord {
                    device_id: 7,
                    device_name: "kettle".to_string(),
                    on_time: 90.0,
                    off_time: 118.0,
                },
            ]),
        }
    }

    #[test]
    fn test_clipped_power_window() {
        let series = make_test_series();
        let window = series.clipped(110.0, 120.0);

        // Closest indices 10 and 20, margin floor(10 * 0.05) = 0; the stop
        // sample itself falls outside the half-open range.
        assert_eq!(window.time_ticks.len(), 10);
        assert_eq!(window.time_ticks[0], 110.0);
        assert_eq!(*window.time_ticks.last().unwrap(), 119.0);
        assert_eq!(window.real, (10..20).map(f64::from).collect::<Vec<_>>());
        assert_eq!(window.datetimes.len(), 10);
        assert_eq!(window.power_factor.len(), 10);
    }

    #[test]
    fn test_clipped_applies_margin() {
        let series = make_test_series();
        let window = series.clipped(105.0, 135.0);

        // Indices 5..35 span 30, margin floor(30 * 0.05) = 1 on each side.
        assert_eq!(window.time_ticks.len(), 32);
        assert_eq!(window.time_ticks[0], 104.0);
        assert_eq!(*window.time_ticks.last().unwrap(), 135.0);
    }

    #[test]
    fn test_clipped_clamps_to_bounds() {
        let series = make_test_series();
        let window = series.clipped(50.0, 500.0);

        // Both targets clamp to the ends; the final sample stays excluded.
        assert_eq!(window.time_ticks.len(), 39);
        assert_eq!(window.time_ticks[0], 100.0);
        assert_eq!(*window.time_ticks.last().unwrap(), 138.0);
    }

    #[test]
    fn test_clipped_hf_uses_own_clock() {
        let series = make_test_series();
        let window = series.clipped(110.0, 120.0);

        // HF ticks run 100, 102, .. 118: closest are indices 5 and 9.
        assert_eq!(window.hf_time_ticks, vec![110.0, 112.0, 114.0, 116.0]);
        assert_eq!(window.hf.len(), 4);
        assert_eq!(window.hf[0], vec![5.0, 5.0, 5.0]);
        assert_eq!(window.hf_datetimes.len(), 4);
    }

    #[test]
    fn test_clipped_keeps_tags() {
        let series = make_test_series();
        let window = series.clipped(110.0, 120.0);
        assert_eq!(window.tags, series.tags);
    }

    #[test]
    fn test_clipped_empty_series() {
        let series = FeatureSeries {
            real: vec![],
            reactive: vec![],
            apparent: vec![],
            power_factor: vec![],
            time_ticks: vec![],
            datetimes: vec![],
            hf: vec![],
            hf_time_ticks: vec![],
            hf_datetimes: vec![],
            tags: None,
        };
        let window = series.clipped(0.0, 10.0);
        assert!(window.real.is_empty());
        assert!(window.hf.is_empty());
        assert_eq!(window.tags, None);
    }

    #[test]
    fn test_clipped_reversed_window() {
        let series = make_test_series();
        let window = series.clipped(120.0, 110.0);

        // Swapped ends yield an empty copy rather than a stray tail slice.
        assert!(window.real.is_empty());
        assert!(window.time_ticks.is_empty());
        assert!(window.datetimes.is_empty());
        assert!(window.hf.is_empty());
        assert!(window.hf_time_ticks.is_empty());
    }

    #[test]
    fn test_tag_span() {
        let series = make_test_series();
        assert_eq!(series.tag_span(), Some((90.0, 120.0)));

        let mut untagged = series.clone();
        untagged.tags = None;
        assert_eq!(untagged.tag_span(), None);

        let mut empty_tags = series;
        empty_tags.tags = Some(vec![]);
        assert_eq!(empty_tags.tag_span(), None);
    }

    #[test]
    fn test_closest_idx_prefers_first_tie() {
        assert_eq!(closest_idx(&[0.0, 1.0, 1.0, 2.0], 1.0), Some(1));
        assert_eq!(closest_idx(&[0.0, 1.0, 1.0, 2.0], 0.6), Some(1));
        assert_eq!(closest_idx(&[], 1.0), None);
    }
}
