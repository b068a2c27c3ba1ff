//! GLV scalar decomposition for MSM.
//!
//! Two variants. [`GlvDecomposer`] exploits the shape
//! `q = lambda^2 + lambda + 1` of the BLS12-381 scalar field, where the
//! split is plain division with remainder by `lambda`, computed with one
//! Barrett quotient over a half-width limb layout. [`GeneralGlvDecomposer`]
//! works for any endomorphism eigenvalue: it reduces the lattice spanned by
//! `(q, 0)` and `(lambda, -1)` to a short basis at construction time, then
//! decomposes by Babai rounding with mod-q arithmetic in an embedded
//! [`FieldEngine`].

use core::cmp::Ordering;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::{Integer, Roots};
use num_traits::{One, Zero};
use rand_core::RngCore;
use tracing::debug;

use crate::arena::{MemoryArena, Ptr};
use crate::arithmetic;
use crate::error::Error;
use crate::field::FieldEngine;
use crate::layout::{bytes_to_limbs, LimbLayout};

/// Scalar splitter for `q = lambda^2 + lambda + 1`.
///
/// The limb layout is taken over `lambda`, so a full scalar occupies two
/// consecutive arena elements (`2n` limbs) and each half of a decomposed
/// scalar occupies one. For `s < q` the quotient `s1 = floor(s / lambda)`
/// is at most `lambda + 1`, so both halves fit one element with the top
/// limb slack the bit-slicer relies on.
pub struct GlvDecomposer {
    layout: LimbLayout,
    arena: MemoryArena,
    lambda: BigUint,
    q: BigUint,
    lambda_limbs: Vec<u64>,
    lambda_wide: Vec<u64>,
    q_wide: Vec<u64>,
    /// `floor(2^(2k) / lambda)`, the Barrett reciprocal.
    barrett_m: Vec<u64>,
    prod_buf: Vec<u64>,
    l_buf: Vec<u64>,
    q_n_bytes: usize,
    q_msb_mask: u8,
}

impl GlvDecomposer {
    /// `q` must equal `lambda^2 + lambda + 1`.
    pub fn new(q: &BigUint, lambda: &BigUint, w: u32) -> Result<GlvDecomposer, Error> {
        debug_assert_eq!(*q, lambda * lambda + lambda + 1u32);
        let layout = LimbLayout::new(lambda, w)?;
        let n = layout.n;
        let m = (BigUint::one() << (2 * layout.k)) / lambda;
        let m_len = ((m.bits() as u32 + w - 1) / w) as usize;
        let q_bits = q.bits() as u32;
        let q_n_bytes = ((q_bits + 7) / 8) as usize;
        let q_msb_mask = ((1u32 << (q_bits - 8 * (q_n_bytes as u32 - 1))) - 1) as u8;
        Ok(GlvDecomposer {
            arena: MemoryArena::new(n),
            lambda: lambda.clone(),
            q: q.clone(),
            lambda_limbs: layout.to_limbs(lambda),
            lambda_wide: layout.to_limbs_len(lambda, 2 * n),
            q_wide: layout.to_limbs_len(q, 2 * n),
            barrett_m: layout.to_limbs_len(&m, m_len),
            prod_buf: vec![0; 2 * n + m_len],
            l_buf: vec![0; n],
            q_n_bytes,
            q_msb_mask,
            layout,
        })
    }

    pub fn layout(&self) -> &LimbLayout {
        &self.layout
    }

    pub fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    pub fn modulus(&self) -> &BigUint {
        &self.q
    }

    // arena management

    /// Allocate the two consecutive elements of a full scalar, returning
    /// the handle of the low half.
    pub fn alloc_scalar(&mut self) -> Ptr {
        let lo = self.arena.alloc();
        self.arena.alloc();
        lo
    }

    /// Allocate a single half-width element.
    pub fn alloc_half(&mut self) -> Ptr {
        self.arena.alloc()
    }

    /// Handle of the high half of a full scalar.
    pub fn high_half(&self, s: Ptr) -> Ptr {
        s.offset(1, self.layout.n)
    }

    pub fn checkpoint(&self) -> usize {
        self.arena.checkpoint()
    }

    pub fn reset_to(&mut self, mark: usize) {
        self.arena.reset_to(mark)
    }

    pub fn reset(&mut self) {
        self.arena.reset()
    }

    // decomposition

    /// Split `s = s0 + s1 * lambda` in place: afterwards the low element
    /// holds `s0 < lambda` and the high element holds `s1 <= lambda + 1`.
    /// The scalar must be below `q`.
    pub fn decompose(&mut self, s: Ptr) {
        self.split(s, true);
    }

    /// Like [`decompose`](Self::decompose) but without the correction
    /// loop, so `s0` stays below `3 * lambda` instead of `lambda`.
    /// Returns `true` when `s0 >= lambda`; MSM bucket code absorbs the
    /// overshoot instead of paying for the correction on every scalar.
    pub fn decompose_no_msb(&mut self, s: Ptr) -> bool {
        self.split(s, false)
    }

    fn split(&mut self, s: Ptr, correct: bool) -> bool {
        let GlvDecomposer {
            layout,
            arena,
            lambda_limbs,
            lambda_wide,
            q_wide,
            barrett_m,
            prod_buf,
            l_buf,
            ..
        } = self;
        let n = layout.n;
        let w = layout.w;
        let s_limbs = arena.limbs_n_mut(s, 2);
        debug_assert_eq!(arithmetic::cmp(s_limbs, q_wide), Ordering::Less);

        // l = (s * m) >> 2k, off from floor(s / lambda) by at most 2
        arithmetic::mul(prod_buf, s_limbs, barrett_m, w);
        debug_assert!(arithmetic::is_zero(&prod_buf[3 * n..]));
        l_buf.copy_from_slice(&prod_buf[2 * n..3 * n]);

        // r = s - l * lambda
        arithmetic::mul(&mut prod_buf[..2 * n], l_buf, lambda_limbs, w);
        let borrow = arithmetic::sub_assign(s_limbs, &prod_buf[..2 * n], w);
        debug_assert_eq!(borrow, 0);

        let mut overshoot = arithmetic::cmp(s_limbs, lambda_wide) != Ordering::Less;
        if correct {
            while overshoot {
                arithmetic::sub_assign(s_limbs, lambda_wide, w);
                arithmetic::add_word(l_buf, 1, w);
                overshoot = arithmetic::cmp(s_limbs, lambda_wide) != Ordering::Less;
            }
        }
        debug_assert!(arithmetic::is_zero(&s_limbs[n..]));
        s_limbs[n..].copy_from_slice(l_buf);
        overshoot
    }

    /// Bit window `[start, start + length)` of a half-width element, the
    /// MSM bucket-index primitive. `length` must not exceed the limb
    /// width; windows past the top read as zero.
    pub fn extract_bit_slice(&self, x: Ptr, start: u32, length: u32) -> u32 {
        debug_assert!(length <= self.layout.w);
        let w = self.layout.w;
        let limbs = self.arena.limbs(x);
        let index = (start / w) as usize;
        let offset = start % w;
        let mask = (1u64 << length) - 1;
        let mut bits = if index < limbs.len() {
            limbs[index] >> offset
        } else {
            0
        };
        if w - offset < length && index + 1 < limbs.len() {
            bits |= limbs[index + 1] << (w - offset);
        }
        (bits & mask) as u32
    }

    // codecs

    /// Load a half-width element from exactly `n_packed_bytes` bytes.
    pub fn from_packed_bytes(&mut self, out: Ptr, bytes: &[u8]) -> Result<(), Error> {
        let expected = self.layout.n_packed_bytes;
        if bytes.len() != expected {
            return Err(Error::InvalidByteLength {
                expected,
                got: bytes.len(),
            });
        }
        bytes_to_limbs(self.arena.limbs_mut(out), bytes, self.layout.w);
        Ok(())
    }

    /// Load a full scalar from its mod-q byte length.
    pub fn from_packed_bytes_wide(&mut self, out: Ptr, bytes: &[u8]) -> Result<(), Error> {
        let expected = self.q_n_bytes;
        if bytes.len() != expected {
            return Err(Error::InvalidByteLength {
                expected,
                got: bytes.len(),
            });
        }
        bytes_to_limbs(self.arena.limbs_n_mut(out, 2), bytes, self.layout.w);
        Ok(())
    }

    /// Store a half-width element into exactly `n_packed_bytes` bytes.
    pub fn to_packed_bytes(&self, bytes: &mut [u8], x: Ptr) -> Result<(), Error> {
        let expected = self.layout.n_packed_bytes;
        if bytes.len() != expected {
            return Err(Error::InvalidByteLength {
                expected,
                got: bytes.len(),
            });
        }
        crate::layout::limbs_to_bytes(bytes, self.arena.limbs(x), self.layout.w);
        Ok(())
    }

    pub fn write_bigint(&mut self, dst: Ptr, x: &BigUint) {
        let limbs = self.layout.to_limbs(x);
        self.arena.limbs_mut(dst).copy_from_slice(&limbs);
    }

    pub fn write_bigint_wide(&mut self, dst: Ptr, x: &BigUint) {
        let limbs = self.layout.to_limbs_len(x, 2 * self.layout.n);
        self.arena.limbs_n_mut(dst, 2).copy_from_slice(&limbs);
    }

    pub fn read_bigint(&self, x: Ptr) -> BigUint {
        self.layout.from_limbs(self.arena.limbs(x))
    }

    pub fn read_bigint_wide(&self, x: Ptr) -> BigUint {
        self.layout.from_limbs(self.arena.limbs_n(x, 2))
    }

    /// Uniform scalar in `[0, q)`, written to the full scalar width.
    pub fn random_scalar(&mut self, rng: &mut impl RngCore, out: Ptr) {
        let GlvDecomposer {
            layout,
            arena,
            q_wide,
            q_n_bytes,
            q_msb_mask,
            ..
        } = self;
        let mut buf = vec![0u8; *q_n_bytes];
        loop {
            rng.fill_bytes(&mut buf);
            if let Some(last) = buf.last_mut() {
                *last &= *q_msb_mask;
            }
            bytes_to_limbs(arena.limbs_n_mut(out, 2), &buf, layout.w);
            if arithmetic::cmp(arena.limbs_n(out, 2), q_wide) == Ordering::Less {
                return;
            }
        }
    }
}

/// Babai-rounding splitter for arbitrary `(q, lambda)`.
///
/// Construction reduces the lattice `{(a, b) : a + b * lambda ≡ 0 (mod q)}`
/// to a short basis `(a1, b1), (a2, b2)` with determinant `+q` and folds the
/// basis signs into four mod-q constants, so the per-scalar work is two
/// truncated high products and a handful of Montgomery multiplies.
pub struct GeneralGlvDecomposer {
    engine: FieldEngine,
    lambda: BigUint,
    /// `floor(2^(2k) * |b2| / q)` and `floor(2^(2k) * |b1| / q)`.
    g1: Vec<u64>,
    g2: Vec<u64>,
    a1m: Ptr,
    a2m: Ptr,
    b1m: Ptr,
    b2m: Ptr,
    half_q: Ptr,
    prod_buf: Vec<u64>,
}

impl GeneralGlvDecomposer {
    pub fn new(q: &BigUint, lambda: &BigUint, w: u32) -> Result<GeneralGlvDecomposer, Error> {
        let mut engine = FieldEngine::new(q, w)?;
        let ((a1, b1), (a2, b2)) = reduce_basis(q, lambda);
        debug!(%a1, %b1, %a2, %b2, "reduced glv basis");
        let q_int = BigInt::from(q.clone());
        let lambda_int = BigInt::from(lambda.clone());
        debug_assert!(((&a1 + &b1 * &lambda_int) % &q_int).is_zero());
        debug_assert!(((&a2 + &b2 * &lambda_int) % &q_int).is_zero());

        // c1 = round(s * b2 / q) and c2 = round(-s * b1 / q); the signs move
        // into the folded constants so the limb work stays unsigned
        let sigma1 = b2.sign();
        let sigma2 = match b1.sign() {
            Sign::Plus => Sign::Minus,
            Sign::Minus => Sign::Plus,
            Sign::NoSign => Sign::NoSign,
        };
        let a1m = engine.install_montgomery_constant(&fold_constant(sigma1, &a1, &q_int));
        let a2m = engine.install_montgomery_constant(&fold_constant(sigma2, &a2, &q_int));
        let b1m = engine.install_montgomery_constant(&fold_constant(sigma1, &b1, &q_int));
        let b2m = engine.install_montgomery_constant(&fold_constant(sigma2, &b2, &q_int));
        let half_q = engine.alloc_stable();
        engine.write_bigint(half_q, &((q - 1u32) >> 1));

        let layout = engine.layout();
        let (n, k) = (layout.n, layout.k);
        let shift = BigUint::one() << (2 * k);
        let g1_value = (&shift * b2.magnitude()) / q;
        let g2_value = (&shift * b1.magnitude()) / q;
        let g1_len = g_limb_len(&g1_value, w);
        let g2_len = g_limb_len(&g2_value, w);
        debug_assert!(g1_len <= 2 * n && g2_len <= 2 * n);
        let g1 = layout.to_limbs_len(&g1_value, g1_len);
        let g2 = layout.to_limbs_len(&g2_value, g2_len);
        let prod_len = (n + g1_len.max(g2_len)).max(2 * n);

        Ok(GeneralGlvDecomposer {
            engine,
            lambda: lambda.clone(),
            g1,
            g2,
            a1m,
            a2m,
            b1m,
            b2m,
            half_q,
            prod_buf: vec![0; prod_len],
        })
    }

    /// The embedded mod-q engine, for allocation and element I/O.
    pub fn engine(&mut self) -> &mut FieldEngine {
        &mut self.engine
    }

    pub fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    /// Split `s` (plain form, below `q`) into signed halves with
    /// `±s0 ± s1 * lambda ≡ s (mod q)` and both magnitudes near `sqrt(q)`.
    /// Returns the negation flags. Needs three elements of scratch, all
    /// distinct from `s`, `s0` and `s1`; `s` is left unchanged.
    pub fn decompose(&mut self, scratch: &[Ptr], s: Ptr, s0: Ptr, s1: Ptr) -> (bool, bool) {
        let (c1, c2, t) = (scratch[0], scratch[1], scratch[2]);
        self.rounding_coefficient(c1, s, true);
        self.rounding_coefficient(c2, s, false);

        let (a1m, a2m, b1m, b2m) = (self.a1m, self.a2m, self.b1m, self.b2m);
        let engine = &mut self.engine;
        engine.to_montgomery(c1);
        engine.to_montgomery(c2);

        // s0 = s + c1 * A1 + c2 * A2 mod q
        engine.copy(s0, s);
        engine.to_montgomery(s0);
        engine.multiply(t, c1, a1m);
        engine.add(s0, s0, t);
        engine.multiply(t, c2, a2m);
        engine.add(s0, s0, t);
        engine.from_montgomery(s0);

        // s1 = c1 * B1 + c2 * B2 mod q
        engine.multiply(s1, c1, b1m);
        engine.multiply(t, c2, b2m);
        engine.add(s1, s1, t);
        engine.from_montgomery(s1);

        (self.to_signed(s0), self.to_signed(s1))
    }

    /// Signed recombination check for tests: `±s0 ± s1 * lambda ≡ s (mod q)`.
    pub fn verify(&self, s: Ptr, s0: Ptr, neg0: bool, s1: Ptr, neg1: bool) -> bool {
        let q = BigInt::from(self.engine.modulus().clone());
        let signed = |negated: bool, v: BigUint| {
            if negated {
                -BigInt::from(v)
            } else {
                BigInt::from(v)
            }
        };
        let v0 = signed(neg0, self.engine.read_bigint(s0));
        let v1 = signed(neg1, self.engine.read_bigint(s1));
        let lhs = v0 + v1 * BigInt::from(self.lambda.clone());
        let rhs = BigInt::from(self.engine.read_bigint(s));
        (lhs - rhs).mod_floor(&q).is_zero()
    }

    /// `out = floor(s * g / 2^(2k))`, the truncated Babai coefficient.
    fn rounding_coefficient(&mut self, out: Ptr, s: Ptr, first: bool) {
        let GeneralGlvDecomposer {
            engine,
            g1,
            g2,
            prod_buf,
            ..
        } = self;
        let g = if first { &g1[..] } else { &g2[..] };
        let n = engine.layout.n;
        let w = engine.layout.w;
        let len = n + g.len();
        arithmetic::mul(&mut prod_buf[..len], engine.arena.limbs(s), g, w);
        let hi = &prod_buf[(2 * n).min(len)..len];
        let out_limbs = engine.arena.limbs_mut(out);
        out_limbs[..hi.len()].copy_from_slice(hi);
        out_limbs[hi.len()..].fill(0);
    }

    /// Map a canonical element to its signed representative, negating mod q
    /// when it lies above `(q - 1) / 2`. Returns the negation flag.
    fn to_signed(&mut self, x: Ptr) -> bool {
        let engine = &mut self.engine;
        let modulus = engine.constants().modulus;
        if engine.is_greater(x, self.half_q) {
            engine.subtract_positive(x, modulus, x);
            true
        } else {
            false
        }
    }
}

fn g_limb_len(g: &BigUint, w: u32) -> usize {
    (((g.bits() as u32 + w - 1) / w) as usize).max(1)
}

/// `(-sigma * v) mod q` as an unsigned value.
fn fold_constant(sigma: Sign, v: &BigInt, q: &BigInt) -> BigUint {
    let negated = match sigma {
        Sign::Plus => -v.clone(),
        Sign::Minus => v.clone(),
        Sign::NoSign => BigInt::zero(),
    };
    negated.mod_floor(q).magnitude().clone()
}

/// Lattice reduction for the GLV basis: run the extended Euclidean
/// algorithm on `(q, lambda)` until the remainder drops below `sqrt(q)`,
/// then take `(r, -t)` rows as basis vectors. Each row satisfies
/// `r - t * lambda ≡ 0 (mod q)`; the second vector is the shorter of the
/// neighbouring rows, with `(a2, b2)` negated if needed so the determinant
/// comes out `+q`.
fn reduce_basis(q: &BigUint, lambda: &BigUint) -> ((BigInt, BigInt), (BigInt, BigInt)) {
    let sqrt_q = q.sqrt();
    let mut r0 = BigInt::from(q.clone());
    let mut t0 = BigInt::zero();
    let mut r1 = BigInt::from(lambda.clone());
    let mut t1 = BigInt::one();
    while *r1.magnitude() >= sqrt_q {
        let (quotient, remainder) = r0.div_rem(&r1);
        let t2 = &t0 - &quotient * &t1;
        r0 = core::mem::replace(&mut r1, remainder);
        t0 = core::mem::replace(&mut t1, t2);
    }
    let (quotient, r2) = r0.div_rem(&r1);
    let t2 = &t0 - &quotient * &t1;

    let (a1, b1) = (r1, -t1);
    let first = (r0, -t0);
    let second = (r2, -t2);
    let norm = |v: &(BigInt, BigInt)| &v.0 * &v.0 + &v.1 * &v.1;
    let (a2, b2) = if norm(&first) <= norm(&second) {
        first
    } else {
        second
    };
    let det = &a1 * &b2 - &a2 * &b1;
    debug_assert_eq!(det.magnitude(), q);
    let (a2, b2) = if det.sign() == Sign::Minus {
        (-a2, -b2)
    } else {
        (a2, b2)
    };
    ((a1, b1), (a2, b2))
}
