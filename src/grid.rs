//! # Grid Resolution Module
//!
//! Locates the model grid cell closest to a target coordinate.
//!
//! Regular lat/lon grids are described by two 1-D coordinate axes, so the
//! cheap separable search in [`nearest_cell`] applies: per-axis absolute
//! differences combined with a Chebyshev (max-of-axes) cost. That shortcut
//! is only meaningful when the grid really is the outer product of its two
//! axes; for curvilinear grids with full 2-D coordinate arrays use
//! [`nearest_cell_curvilinear`], which minimizes great-circle distance over
//! the actual cell centers.

use serde::Serialize;
use thiserror::Error;

/// Mean Earth radius in kilometers, used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Grid axis '{0}' is empty")]
    EmptyAxis(&'static str),

    #[error("Curvilinear coordinate arrays have mismatched lengths: lat {lat_len}, lon {lon_len}")]
    MismatchedAxes { lat_len: usize, lon_len: usize },

    #[error("Curvilinear coordinate arrays ({len} values) do not match shape {rows}x{cols}")]
    ShapeMismatch { len: usize, rows: usize, cols: usize },

    #[error("Cell ({row}, {col}) lies outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

/// A grid cell identified by indices into the latitude and longitude axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellIndex {
    pub row: usize,
    pub col: usize,
}

/// Bounding rectangle of a grid cell, in degrees.
///
/// Edges are halfway to the neighboring cell centers; at the grid boundary
/// the cell extends outward by the same half-step as on its inner side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// Finds the grid cell whose center is nearest to the target point under
/// the Chebyshev metric over a separable lat/lon grid.
///
/// The cost of cell `(i, j)` is `max(|lats[i] - lat|, |lons[j] - lon|)`;
/// the minimizing cell is returned. When several cells tie for the minimum,
/// the first one in row-major scan order wins (smallest row index, then
/// smallest column index within that row) - a documented tie-break rather
/// than an accident of evaluation order.
///
/// A target lying exactly on a grid point resolves to that point with cost
/// zero. The Chebyshev cost approximates true nearest-neighbor distance;
/// it is adequate for roughly regular small-cell grids but is not a
/// great-circle search.
pub fn nearest_cell(lats: &[f64], lons: &[f64], lat: f64, lon: f64) -> Result<CellIndex, GridError> {
    if lats.is_empty() {
        return Err(GridError::EmptyAxis("latitude"));
    }
    if lons.is_empty() {
        return Err(GridError::EmptyAxis("longitude"));
    }

    let abs_lat: Vec<f64> = lats.iter().map(|&v| (v - lat).abs()).collect();
    let abs_lon: Vec<f64> = lons.iter().map(|&v| (v - lon).abs()).collect();

    let mut best = CellIndex { row: 0, col: 0 };
    let mut best_cost = f64::INFINITY;

    for (i, &dlat) in abs_lat.iter().enumerate() {
        for (j, &dlon) in abs_lon.iter().enumerate() {
            let cost = dlat.max(dlon);
            // Strict improvement only, so row-major-first ties stand.
            if cost < best_cost {
                best_cost = cost;
                best = CellIndex { row: i, col: j };
            }
        }
    }

    Ok(best)
}

/// Nearest-neighbor search for curvilinear grids.
///
/// `lat2d` and `lon2d` hold the cell-center coordinates of a `rows x cols`
/// grid in row-major order. The cell minimizing great-circle (haversine)
/// distance to the target wins; ties resolve to the first cell in row-major
/// order, matching [`nearest_cell`].
pub fn nearest_cell_curvilinear(
    lat2d: &[f64],
    lon2d: &[f64],
    rows: usize,
    cols: usize,
    lat: f64,
    lon: f64,
) -> Result<CellIndex, GridError> {
    if rows == 0 || cols == 0 {
        return Err(GridError::EmptyAxis(if rows == 0 { "latitude" } else { "longitude" }));
    }
    if lat2d.len() != lon2d.len() {
        return Err(GridError::MismatchedAxes {
            lat_len: lat2d.len(),
            lon_len: lon2d.len(),
        });
    }
    if lat2d.len() != rows * cols {
        return Err(GridError::ShapeMismatch {
            len: lat2d.len(),
            rows,
            cols,
        });
    }

    let mut best = CellIndex { row: 0, col: 0 };
    let mut best_dist = f64::INFINITY;

    for idx in 0..lat2d.len() {
        let dist = haversine_km(lat, lon, lat2d[idx], lon2d[idx]);
        if dist < best_dist {
            best_dist = dist;
            best = CellIndex {
                row: idx / cols,
                col: idx % cols,
            };
        }
    }

    Ok(best)
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Computes the bounding rectangle of a grid cell.
///
/// Each edge lies halfway between the cell center and its neighbor on that
/// side. Boundary cells reuse the half-step of their inner side, so a
/// single-cell axis gets a degenerate zero-width extent.
pub fn cell_bounds(
    lats: &[f64],
    lons: &[f64],
    cell: CellIndex,
) -> Result<CellBounds, GridError> {
    if lats.is_empty() {
        return Err(GridError::EmptyAxis("latitude"));
    }
    if lons.is_empty() {
        return Err(GridError::EmptyAxis("longitude"));
    }
    if cell.row >= lats.len() || cell.col >= lons.len() {
        return Err(GridError::OutOfBounds {
            row: cell.row,
            col: cell.col,
            rows: lats.len(),
            cols: lons.len(),
        });
    }

    let (lat_min, lat_max) = axis_extent(lats, cell.row);
    let (lon_min, lon_max) = axis_extent(lons, cell.col);

    Ok(CellBounds {
        lat_min,
        lat_max,
        lon_min,
        lon_max,
    })
}

fn axis_extent(axis: &[f64], idx: usize) -> (f64, f64) {
    let center = axis[idx];
    let half_before = if idx > 0 {
        (center - axis[idx - 1]).abs() / 2.0
    } else if axis.len() > 1 {
        (axis[1] - center).abs() / 2.0
    } else {
        0.0
    };
    let half_after = if idx + 1 < axis.len() {
        (axis[idx + 1] - center).abs() / 2.0
    } else {
        half_before
    };

    let a = center - half_before;
    let b = center + half_after;
    (a.min(b), a.max(b))
}
