//! 2-D position binning for heatmaps.
//!
//! Converts raw event payloads carrying `x`/`y` coordinates into a
//! fixed-size count histogram. The output orientation is part of the
//! contract: rows index the Y axis, columns index the X axis.

use json::Value;

use crate::entity::event;

pub type Matrix = Vec<Vec<u64>>;

/// Half-unit margin applied when an axis range collapses to a point.
const POINT_MARGIN: f64 = 0.5;

/// Bins one day's events for a level into a `grid_size x grid_size`
/// count matrix. Events without a numeric position are dropped, never an
/// error; an empty input yields an all-zero matrix.
pub fn bin(
  events: &[event::Model],
  grid_size: usize,
  x_range: Option<(f64, f64)>,
  y_range: Option<(f64, f64)>,
) -> Matrix {
  histogram(&positions(events), grid_size, x_range, y_range)
}

/// Numeric (x, y) pairs extracted from event payloads. Missing or
/// non-numeric coordinates exclude the event; numeric strings are
/// coerced.
pub fn positions(events: &[event::Model]) -> Vec<(f64, f64)> {
  events
    .iter()
    .filter_map(|event| {
      let x = coord(&event.payload, "x")?;
      let y = coord(&event.payload, "y")?;
      Some((x, y))
    })
    .collect()
}

fn coord(payload: &Value, key: &str) -> Option<f64> {
  match payload.get(key)? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Equal-width 2-D histogram over the given ranges, auto-ranged to the
/// data when no override is supplied. A value exactly on the upper bound
/// lands in the last bin; values outside the range are dropped.
pub fn histogram(
  points: &[(f64, f64)],
  grid_size: usize,
  x_range: Option<(f64, f64)>,
  y_range: Option<(f64, f64)>,
) -> Matrix {
  let mut matrix = vec![vec![0u64; grid_size]; grid_size];
  if points.is_empty() || grid_size == 0 {
    return matrix;
  }

  let (x_lo, x_hi) = axis_range(points.iter().map(|&(x, _)| x), x_range);
  let (y_lo, y_hi) = axis_range(points.iter().map(|&(_, y)| y), y_range);

  for &(x, y) in points {
    let (Some(col), Some(row)) = (
      bin_index(x, x_lo, x_hi, grid_size),
      bin_index(y, y_lo, y_hi, grid_size),
    ) else {
      continue;
    };
    matrix[row][col] += 1;
  }

  matrix
}

fn axis_range(
  values: impl Iterator<Item = f64>,
  explicit: Option<(f64, f64)>,
) -> (f64, f64) {
  let (lo, hi) = explicit.unwrap_or_else(|| {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
      (lo.min(v), hi.max(v))
    })
  });

  // Widen a zero-width range so the single point still gets a bin.
  if lo == hi { (lo - POINT_MARGIN, hi + POINT_MARGIN) } else { (lo, hi) }
}

fn bin_index(value: f64, lo: f64, hi: f64, bins: usize) -> Option<usize> {
  if !(value >= lo && value <= hi) {
    return None;
  }
  let idx = ((value - lo) / (hi - lo) * bins as f64) as usize;
  Some(idx.min(bins - 1))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn event_with(payload: Value) -> event::Model {
    let now = Utc::now().naive_utc();
    event::Model {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      session_id: None,
      event_type: String::from("move"),
      event_name: String::from("position"),
      payload,
      timestamp: now,
      created_at: now,
    }
  }

  fn total(matrix: &Matrix) -> u64 {
    matrix.iter().flatten().sum()
  }

  #[test]
  fn test_empty_input_yields_zero_matrix() {
    let matrix = bin(&[], 50, None, None);

    assert_eq!(matrix.len(), 50);
    assert!(matrix.iter().all(|row| row.len() == 50));
    assert_eq!(total(&matrix), 0);
  }

  #[test]
  fn test_single_point_range_is_widened() {
    let events: Vec<_> =
      (0..3).map(|_| event_with(json::json!({ "x": 2.0, "y": 2.0 }))).collect();

    let matrix = bin(&events, 4, None, None);

    // Range widens to [1.5, 2.5] on both axes; 2.0 falls in bin 2.
    assert_eq!(total(&matrix), 3);
    assert_eq!(matrix[2][2], 3);
  }

  #[test]
  fn test_two_by_two_example() {
    let events = vec![
      event_with(json::json!({ "x": 1, "y": 1 })),
      event_with(json::json!({ "x": 1, "y": 1 })),
      event_with(json::json!({ "x": 9, "y": 9 })),
    ];

    let matrix = bin(&events, 2, None, None);

    assert_eq!(matrix, vec![vec![2, 0], vec![0, 1]]);
  }

  #[test]
  fn test_rows_index_y_axis() {
    let events = vec![
      event_with(json::json!({ "x": 0.0, "y": 0.0 })),
      event_with(json::json!({ "x": 5.0, "y": 0.0 })),
      event_with(json::json!({ "x": 9.0, "y": 0.0 })),
    ];

    let matrix = bin(&events, 3, Some((0.0, 9.0)), Some((0.0, 9.0)));

    // All points share y = 0, so everything lands in row 0 while the
    // columns spread across the X bins.
    assert_eq!(matrix[0], vec![1, 1, 1]);
    assert_eq!(total(&matrix), 3);
  }

  #[test]
  fn test_explicit_range_drops_outliers() {
    let points = [(5.0, 0.5), (0.25, 0.25), (1.0, 1.0)];

    let matrix = histogram(&points, 2, Some((0.0, 1.0)), Some((0.0, 1.0)));

    // (5.0, 0.5) is outside the override; (1.0, 1.0) sits exactly on the
    // upper bound and goes to the last bin.
    assert_eq!(total(&matrix), 2);
    assert_eq!(matrix[0][0], 1);
    assert_eq!(matrix[1][1], 1);
  }

  #[test]
  fn test_malformed_payloads_are_dropped() {
    let events = vec![
      event_with(json::json!({ "x": 1.0 })),
      event_with(json::json!({ "x": true, "y": 2.0 })),
      event_with(json::json!({ "x": "3.5", "y": " 4 " })),
      event_with(json::json!({})),
    ];

    assert_eq!(positions(&events), vec![(3.5, 4.0)]);
  }
}
