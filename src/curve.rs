//! Affine short-Weierstrass kernels on top of the field engine.
//!
//! A point is two consecutive arena elements `(x, y)` in Montgomery form.
//! The point at infinity never reaches these kernels; MSM filters it out
//! before batching.

use crate::arena::Ptr;
use crate::field::FieldEngine;

impl FieldEngine {
    /// Affine addition `out = p1 + p2` with the inverted denominator
    /// `d = 1/(x2 - x1)` supplied by the caller, usually from one
    /// [`batch_inverse`](Self::batch_inverse) over a whole bucket.
    ///
    /// Needs three elements of scratch, all distinct from the points and
    /// `d`. `out` may alias `p1` but not `p2`. The inputs must be distinct
    /// points with `x1 != x2`, neither at infinity.
    pub fn add_affine(&mut self, scratch: &[Ptr], out: Ptr, p1: Ptr, p2: Ptr, d: Ptr) {
        let n = self.layout.n;
        let (x1, y1) = (p1, p1.offset(1, n));
        let (x2, y2) = (p2, p2.offset(1, n));
        let (x3, y3) = (out, out.offset(1, n));
        let (slope, x3t, t) = (scratch[0], scratch[1], scratch[2]);
        debug_assert!(!self.is_equal(x1, x2));

        // slope = (y2 - y1) / (x2 - x1)
        self.subtract(slope, y2, y1);
        self.multiply(slope, slope, d);

        // x3 = slope^2 - x1 - x2, kept in scratch until x1 is consumed
        self.square(x3t, slope);
        self.subtract(x3t, x3t, x1);
        self.subtract(x3t, x3t, x2);

        // y3 = slope * (x1 - x3) - y1
        self.subtract(t, x1, x3t);
        self.multiply(t, slope, t);
        self.subtract(y3, t, y1);
        self.copy(x3, x3t);
    }

    /// Cube-root endomorphism `(x, y) -> (beta * x, y)`. With the curve's
    /// `beta` installed via
    /// [`install_montgomery_constant`](Self::install_montgomery_constant),
    /// this computes `lambda * P` in one field multiplication. `out` may
    /// alias `p`.
    pub fn endomorphism(&mut self, out: Ptr, p: Ptr, beta: Ptr) {
        let n = self.layout.n;
        self.multiply(out, p, beta);
        self.copy(out.offset(1, n), p.offset(1, n));
    }
}
