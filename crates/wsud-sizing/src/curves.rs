//! Design-curve tables and the piecewise-linear, clamped lookup used by the
//! curve-based Design Adapter backend.
//!
//! A design curve relates a service-level percentage (for one purpose —
//! quantity or quality) to the surface fraction (relative to contributing
//! impervious area) a system needs to achieve it. Curves are keyed by
//! technology type, a canonical depth parameter, and the governing
//! infiltration rate (the minimum of soil and liner rates), matching §4.1.

use std::collections::HashMap;

use wsud_core::TechCode;

/// Identifies one design-curve table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurveKey {
    pub tech: &'static str,
    /// Depth parameter bucketed to 0.01 m resolution so near-identical
    /// configurations share a curve.
    pub depth_param_centi: i64,
    /// Governing infiltration rate (min of soil/liner), bucketed to
    /// 1 mm/h resolution.
    pub infiltration_mmh: i64,
}

impl CurveKey {
    pub fn new(tech: TechCode, depth_param: f64, infiltration_rate: f64) -> CurveKey {
        CurveKey {
            tech: Box::leak(tech.to_string().into_boxed_str()),
            depth_param_centi: (depth_param * 100.0).round() as i64,
            infiltration_mmh: infiltration_rate.round() as i64,
        }
    }
}

/// A single tabulated (service%, surface-fraction) relation, sorted by
/// service percentage ascending.
#[derive(Debug, Clone)]
pub struct DesignCurve {
    points: Vec<(f64, f64)>,
}

impl DesignCurve {
    /// `points` need not be pre-sorted; duplicate x-values keep the first
    /// occurrence.
    pub fn new(mut points: Vec<(f64, f64)>) -> DesignCurve {
        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        points.dedup_by_key(|p| p.0);
        DesignCurve { points }
    }

    /// Piecewise-linear interpolation, clamped at the curve's domain
    /// extremes. Returns `f64::INFINITY` if the curve is empty or the
    /// target lies strictly outside `[min_x, max_x]` by more than a
    /// floating-point tolerance — out-of-range means infeasible, not an
    /// extrapolated guess.
    pub fn interpolate(&self, target_service_pct: f64) -> f64 {
        if self.points.is_empty() {
            return f64::INFINITY;
        }
        let (min_x, _) = self.points[0];
        let (max_x, _) = *self.points.last().unwrap();
        const EPS: f64 = 1e-9;
        if target_service_pct < min_x - EPS || target_service_pct > max_x + EPS {
            return f64::INFINITY;
        }
        let x = target_service_pct.clamp(min_x, max_x);

        for window in self.points.windows(2) {
            let (x0, y0) = window[0];
            let (x1, y1) = window[1];
            if x >= x0 && x <= x1 {
                if (x1 - x0).abs() < EPS {
                    return y0;
                }
                let t = (x - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        self.points.last().unwrap().1
    }
}

/// Read-mostly cache of design curves, shared across basins.
#[derive(Debug, Clone, Default)]
pub struct DesignCurveCache {
    curves: HashMap<CurveKey, DesignCurve>,
}

impl DesignCurveCache {
    pub fn new() -> Self {
        DesignCurveCache::default()
    }

    pub fn insert(&mut self, key: CurveKey, curve: DesignCurve) {
        self.curves.insert(key, curve);
    }

    pub fn get(&self, key: &CurveKey) -> Option<&DesignCurve> {
        self.curves.get(key)
    }

    /// Parses a design-curve text matrix: one header-free row per line,
    /// whitespace-separated `service_pct surface_fraction` pairs, matching
    /// the "text matrices" external-interface format.
    pub fn parse_curve_text(text: &str) -> DesignCurve {
        let points: Vec<(f64, f64)> = text
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                let mut parts = line.split_whitespace();
                let service = parts.next()?.parse::<f64>().ok()?;
                let fraction = parts.next()?.parse::<f64>().ok()?;
                Some((service, fraction))
            })
            .collect();
        DesignCurve::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_linearly_between_points() {
        let curve = DesignCurve::new(vec![(0.0, 0.0), (50.0, 0.05), (100.0, 0.2)]);
        assert!((curve.interpolate(25.0) - 0.025).abs() < 1e-9);
        assert!((curve.interpolate(75.0) - 0.125).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_is_infeasible() {
        let curve = DesignCurve::new(vec![(0.0, 0.0), (100.0, 0.2)]);
        assert!(curve.interpolate(150.0).is_infinite());
        assert!(curve.interpolate(-1.0).is_infinite());
    }

    #[test]
    fn exact_endpoint_is_not_infeasible() {
        let curve = DesignCurve::new(vec![(0.0, 0.0), (100.0, 0.2)]);
        assert!((curve.interpolate(100.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn parses_whitespace_separated_text_matrix() {
        let text = "0 0.0\n50 0.05\n100 0.2\n";
        let curve = DesignCurveCache::parse_curve_text(text);
        assert!((curve.interpolate(50.0) - 0.05).abs() < 1e-9);
    }
}
