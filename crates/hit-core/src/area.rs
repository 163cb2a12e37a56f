//! Membership predicates.
//!
//! The engine only knows the `Area` trait; the shape is supplied by the
//! embedder. `QuadrantArea` is the area the lab form plots.

use crate::validation::NormalizedInput;

/// Comparison slack applied on every boundary of `QuadrantArea`.
pub const BOUNDARY_EPS: f64 = 1e-9;

/// A region of the plane parameterized by a radius.
///
/// Implementations must be pure and deterministic, and treat boundaries as
/// part of the region.
pub trait Area: Send + Sync {
    fn contains(&self, x: f64, y: f64, r: f64) -> bool;

    fn name(&self) -> &str {
        "custom"
    }

    fn evaluate(&self, input: &NormalizedInput) -> bool {
        self.contains(input.x, input.y, input.r)
    }
}

/// Three-quadrant area:
/// - quadrant I: quarter disc of radius `r/2`
/// - quadrant IV: triangle under the axes down to the line `y = x - r/2`
/// - quadrant III: rectangle `[-r, 0] x [-r/2, 0]`
/// - quadrant II: empty
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadrantArea;

impl Area for QuadrantArea {
    fn contains(&self, x: f64, y: f64, r: f64) -> bool {
        let half_r = r / 2.0;

        if x >= -BOUNDARY_EPS && y >= -BOUNDARY_EPS {
            return x <= half_r + BOUNDARY_EPS
                && y <= half_r + BOUNDARY_EPS
                && x * x + y * y <= half_r * half_r + BOUNDARY_EPS;
        }
        if x >= -BOUNDARY_EPS && y <= BOUNDARY_EPS {
            return x <= half_r + BOUNDARY_EPS
                && y >= -half_r - BOUNDARY_EPS
                && y >= x - half_r - BOUNDARY_EPS;
        }
        if x <= BOUNDARY_EPS && y <= BOUNDARY_EPS {
            return x >= -r - BOUNDARY_EPS && y >= -half_r - BOUNDARY_EPS;
        }
        false
    }

    fn name(&self) -> &str {
        "quadrant"
    }
}

/// Adapter turning a closure into an `Area`.
pub struct FnArea<F> {
    name: String,
    predicate: F,
}

impl<F> FnArea<F>
where
    F: Fn(f64, f64, f64) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Area for FnArea<F>
where
    F: Fn(f64, f64, f64) -> bool + Send + Sync,
{
    fn contains(&self, x: f64, y: f64, r: f64) -> bool {
        (self.predicate)(x, y, r)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
