//! Prime field engine parameterized at runtime by a modulus and limb width.
//!
//! Elements are handles into an owned [`MemoryArena`] and are kept in
//! Montgomery form, lazily reduced to `[0, 2p)`. Addition and subtraction
//! stay closed over that range; the CIOS multiplier maps two lazy inputs
//! back into it, which requires the radix check `R > 4p` performed at
//! construction.

use core::cmp::Ordering;

use num_bigint::BigUint;
use num_traits::One;
use rand_core::RngCore;

use crate::arena::{MemoryArena, Ptr};
use crate::arithmetic::{self, adc, sbb};
use crate::error::Error;
use crate::layout::{bytes_to_limbs, limbs_to_bytes, LimbLayout};

/// Stable handles to the precomputed constants of a [`FieldEngine`].
#[derive(Debug)]
pub struct FieldConstants {
    pub zero: Ptr,
    /// Plain 1, not in Montgomery form. Multiplying by it maps out of
    /// Montgomery form.
    pub one: Ptr,
    /// The modulus itself.
    pub modulus: Ptr,
    /// R^2 mod p. Multiplying by it maps into Montgomery form.
    pub r2: Ptr,
    /// 2^(3k - 2 * bit_length) mod p, consumed by the inverse recombination.
    pub r2corr: Ptr,
    /// 1, 2, 4 and 8 in Montgomery form.
    pub mg1: Ptr,
    pub mg2: Ptr,
    pub mg4: Ptr,
    pub mg8: Ptr,
}

#[derive(Debug)]
pub(crate) struct Sampler {
    limbs: Vec<u64>,
    n_bytes: usize,
    msb_mask: u8,
}

impl Sampler {
    fn new(layout: &LimbLayout, bound: &BigUint) -> Self {
        let bits = bound.bits() as u32;
        let n_bytes = ((bits + 7) / 8) as usize;
        let msb_mask = ((1u32 << (bits - 8 * (n_bytes as u32 - 1))) - 1) as u8;
        Sampler {
            limbs: layout.to_limbs(bound),
            n_bytes,
            msb_mask,
        }
    }
}

#[derive(Debug)]
pub struct FieldEngine {
    pub(crate) layout: LimbLayout,
    pub(crate) arena: MemoryArena,
    modulus: BigUint,
    pub(crate) p_limbs: Vec<u64>,
    pub(crate) p2_limbs: Vec<u64>,
    mu: u64,
    constants: FieldConstants,
    mul_buf: Vec<u64>,
    samplers: [Sampler; 3],
    // Tonelli-Shanks tables, filled during construction
    pub(crate) sqrt_s: u32,
    pub(crate) sqrt_t: BigUint,
    pub(crate) sqrt_t_half: BigUint,
    pub(crate) sqrt_c: Ptr,
}

impl FieldEngine {
    pub fn new(modulus: &BigUint, w: u32) -> Result<FieldEngine, Error> {
        // Montgomery reduction needs gcd(modulus, R) = 1
        if !modulus.bit(0) {
            return Err(Error::ModulusEven);
        }
        let layout = LimbLayout::new(modulus, w)?;
        // products of lazy-reduced inputs land back in [0, 2p) only if R > 4p
        if (BigUint::one() << layout.k) <= (modulus << 2u32) {
            return Err(Error::RadixTooSmall { k: layout.k });
        }

        let p0 = layout.to_limbs(modulus)[0];
        let mut inv: u64 = 1;
        for _ in 0..63 {
            inv = inv.wrapping_mul(inv);
            inv = inv.wrapping_mul(p0);
        }
        let mu = inv.wrapping_neg() & layout.limb_mask;

        let mut arena = MemoryArena::new(layout.n);
        let r = (BigUint::one() << layout.k) % modulus;
        let values = [
            BigUint::from(0u64),
            BigUint::from(1u64),
            modulus.clone(),
            (&r * &r) % modulus,
            (BigUint::one() << (3 * layout.k - 2 * layout.bit_length)) % modulus,
            r.clone(),
            (&r * 2u32) % modulus,
            (&r * 4u32) % modulus,
            (&r * 8u32) % modulus,
        ];
        let ptrs = arena.alloc_stable_many(values.len());
        for (ptr, value) in ptrs.iter().zip(values.iter()) {
            arena
                .limbs_mut(*ptr)
                .copy_from_slice(&layout.to_limbs(value));
        }
        let sqrt_c = arena.alloc_stable();

        let samplers = [
            Sampler::new(&layout, modulus),
            Sampler::new(&layout, &(modulus * 2u32)),
            Sampler::new(&layout, &(modulus * 4u32)),
        ];

        let mut engine = FieldEngine {
            p_limbs: layout.to_limbs(modulus),
            p2_limbs: layout.to_limbs(&(modulus * 2u32)),
            mul_buf: vec![0; layout.n],
            layout,
            arena,
            modulus: modulus.clone(),
            mu,
            constants: FieldConstants {
                zero: ptrs[0],
                one: ptrs[1],
                modulus: ptrs[2],
                r2: ptrs[3],
                r2corr: ptrs[4],
                mg1: ptrs[5],
                mg2: ptrs[6],
                mg4: ptrs[7],
                mg8: ptrs[8],
            },
            samplers,
            sqrt_s: 0,
            sqrt_t: BigUint::one(),
            sqrt_t_half: BigUint::one(),
            sqrt_c,
        };
        engine.init_sqrt_tables();
        Ok(engine)
    }

    pub fn layout(&self) -> &LimbLayout {
        &self.layout
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn constants(&self) -> &FieldConstants {
        &self.constants
    }

    // arena management

    pub fn alloc(&mut self) -> Ptr {
        self.arena.alloc()
    }

    pub fn alloc_many(&mut self, count: usize) -> Vec<Ptr> {
        self.arena.alloc_many(count)
    }

    /// Pin a long-lived element below the arena floor. Must be called
    /// before any scratch allocation is live.
    pub fn alloc_stable(&mut self) -> Ptr {
        self.arena.alloc_stable()
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

    /// Pin a constant given in standard form, storing it in Montgomery form.
    pub fn install_montgomery_constant(&mut self, value: &BigUint) -> Ptr {
        let ptr = self.alloc_stable();
        self.write_bigint(ptr, value);
        self.to_montgomery(ptr);
        ptr
    }

    // predicates

    pub fn is_zero(&self, x: Ptr) -> bool {
        arithmetic::is_zero(self.arena.limbs(x))
    }

    /// Exact limb equality. Lazy values should be [`reduce`](Self::reduce)d
    /// first when canonical equality is intended.
    pub fn is_equal(&self, x: Ptr, y: Ptr) -> bool {
        arithmetic::cmp(self.arena.limbs(x), self.arena.limbs(y)) == Ordering::Equal
    }

    pub fn is_greater(&self, x: Ptr, y: Ptr) -> bool {
        arithmetic::cmp(self.arena.limbs(x), self.arena.limbs(y)) == Ordering::Greater
    }

    pub fn copy(&mut self, dst: Ptr, src: Ptr) {
        self.arena.check(dst, 1);
        self.arena.check(src, 1);
        let n = self.layout.n;
        self.arena.data_mut().copy_within(src.0..src.0 + n, dst.0);
    }

    // arithmetic, closed over [0, 2p)

    /// `out = x + y`, lazily reduced.
    pub fn add(&mut self, out: Ptr, x: Ptr, y: Ptr) {
        self.arena.check(out, 1);
        self.arena.check(x, 1);
        self.arena.check(y, 1);
        let FieldEngine {
            arena,
            layout,
            p2_limbs,
            ..
        } = self;
        let (n, w) = (layout.n, layout.w);
        let d = arena.data_mut();
        let mut carry = 0;
        for i in 0..n {
            let (lo, c) = adc(d[x.0 + i], d[y.0 + i], carry, w);
            d[out.0 + i] = lo;
            carry = c;
        }
        debug_assert_eq!(carry, 0);
        if cmp_at(d, out.0, p2_limbs) != Ordering::Less {
            let borrow = sub_limbs_at(d, out.0, p2_limbs, w);
            debug_assert_eq!(borrow, 0);
        }
    }

    /// Plain limb addition without reduction. Returns the carry.
    pub(crate) fn add_raw(&mut self, out: Ptr, x: Ptr, y: Ptr) -> u64 {
        self.arena.check(out, 1);
        self.arena.check(x, 1);
        self.arena.check(y, 1);
        let (n, w) = (self.layout.n, self.layout.w);
        let d = self.arena.data_mut();
        let mut carry = 0;
        for i in 0..n {
            let (lo, c) = adc(d[x.0 + i], d[y.0 + i], carry, w);
            d[out.0 + i] = lo;
            carry = c;
        }
        carry
    }

    /// `out = x - y`, adding back 2p on borrow.
    pub fn subtract(&mut self, out: Ptr, x: Ptr, y: Ptr) {
        self.arena.check(out, 1);
        self.arena.check(x, 1);
        self.arena.check(y, 1);
        let FieldEngine {
            arena,
            layout,
            p2_limbs,
            ..
        } = self;
        let (n, w) = (layout.n, layout.w);
        let d = arena.data_mut();
        let mut borrow = 0;
        for i in 0..n {
            let (lo, b) = sbb(d[x.0 + i], d[y.0 + i], borrow, w);
            d[out.0 + i] = lo;
            borrow = b;
        }
        if borrow == 1 {
            let carry = add_limbs_at(d, out.0, p2_limbs, w);
            debug_assert_eq!(carry, 1);
        }
    }

    /// `out = x - y` for `x >= y`. No correction step.
    pub fn subtract_positive(&mut self, out: Ptr, x: Ptr, y: Ptr) {
        self.arena.check(out, 1);
        self.arena.check(x, 1);
        self.arena.check(y, 1);
        let (n, w) = (self.layout.n, self.layout.w);
        let d = self.arena.data_mut();
        let mut borrow = 0;
        for i in 0..n {
            let (lo, b) = sbb(d[x.0 + i], d[y.0 + i], borrow, w);
            d[out.0 + i] = lo;
            borrow = b;
        }
        debug_assert_eq!(borrow, 0);
    }

    /// Conditional final subtraction of p, canonicalizing into `[0, p)`.
    pub fn reduce(&mut self, x: Ptr) {
        self.arena.check(x, 1);
        let FieldEngine {
            arena,
            layout,
            p_limbs,
            ..
        } = self;
        let d = arena.data_mut();
        if cmp_at(d, x.0, p_limbs) != Ordering::Less {
            let borrow = sub_limbs_at(d, x.0, p_limbs, layout.w);
            debug_assert_eq!(borrow, 0);
        }
    }

    /// Montgomery product `out = x * y * R^-1 mod p` by interleaved CIOS.
    ///
    /// Inputs below 2p give an output below 2p. `out` may alias either
    /// input; the product is accumulated in a separate buffer.
    pub fn multiply(&mut self, out: Ptr, x: Ptr, y: Ptr) {
        self.arena.check(out, 1);
        self.arena.check(x, 1);
        self.arena.check(y, 1);
        let FieldEngine {
            arena,
            layout,
            p_limbs,
            mu,
            mul_buf,
            ..
        } = self;
        let (n, w, mask) = (layout.n, layout.w, layout.limb_mask);
        let mu = *mu;
        let d = arena.data_mut();
        let t = &mut mul_buf[..];
        t.fill(0);
        for i in 0..n {
            let xi = d[x.0 + i];
            // first column also fixes the quotient limb m
            let tmp = t[0] + xi * d[y.0];
            let mut a = tmp >> w;
            let m = ((tmp & mask) * mu) & mask;
            let tmp = (tmp & mask) + m * p_limbs[0];
            let mut carry = tmp >> w;
            for j in 1..n {
                let tmp = t[j] + xi * d[y.0 + j] + a;
                a = tmp >> w;
                let tmp = (tmp & mask) + m * p_limbs[j] + carry;
                t[j - 1] = tmp & mask;
                carry = tmp >> w;
            }
            t[n - 1] = a + carry;
        }
        d[out.0..out.0 + n].copy_from_slice(t);
    }

    pub fn square(&mut self, out: Ptr, x: Ptr) {
        self.multiply(out, x, x);
    }

    /// `out = x * 2^bits mod p` by repeated lazy doubling.
    pub fn left_shift(&mut self, out: Ptr, x: Ptr, bits: u32) {
        if out != x {
            self.copy(out, x);
        }
        for _ in 0..bits {
            self.add(out, out, out);
        }
    }

    /// `out = base^exp`, square-and-multiply from the least significant bit.
    /// `scratch` must be distinct from `out`; `out` may alias `base`.
    pub fn power(&mut self, scratch: Ptr, out: Ptr, base: Ptr, exp: &BigUint) {
        debug_assert!(scratch != out);
        let one = self.constants.mg1;
        self.copy(scratch, base);
        self.copy(out, one);
        for i in 0..exp.bits() {
            if exp.bit(i) {
                self.multiply(out, out, scratch);
            }
            self.square(scratch, scratch);
        }
    }

    /// In-place map into Montgomery form.
    pub fn to_montgomery(&mut self, x: Ptr) {
        let r2 = self.constants.r2;
        self.multiply(x, x, r2);
    }

    /// In-place map out of Montgomery form, canonicalized.
    pub fn from_montgomery(&mut self, x: Ptr) {
        let one = self.constants.one;
        self.multiply(x, x, one);
        self.reduce(x);
    }

    // codecs

    /// Load an element from exactly `n_packed_bytes` little-endian bytes.
    /// The value is taken as-is; callers keep the `< 2p` representation
    /// invariant themselves.
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

    /// Store a canonical element into exactly `n_packed_bytes` bytes.
    pub fn to_packed_bytes(&self, bytes: &mut [u8], x: Ptr) -> Result<(), Error> {
        let expected = self.layout.n_packed_bytes;
        if bytes.len() != expected {
            return Err(Error::InvalidByteLength {
                expected,
                got: bytes.len(),
            });
        }
        limbs_to_bytes(bytes, self.arena.limbs(x), self.layout.w);
        Ok(())
    }

    pub fn write_bigint(&mut self, dst: Ptr, x: &BigUint) {
        let limbs = self.layout.to_limbs(x);
        self.arena.limbs_mut(dst).copy_from_slice(&limbs);
    }

    pub fn read_bigint(&self, x: Ptr) -> BigUint {
        self.layout.from_limbs(self.arena.limbs(x))
    }

    // sampling

    /// Uniform element in `[0, p)`.
    pub fn random_canonical(&mut self, rng: &mut impl RngCore, out: Ptr) {
        self.sample(rng, out, 0)
    }

    /// Uniform element in `[0, 2p)`, the lazy-reduced range.
    pub fn random_lazy(&mut self, rng: &mut impl RngCore, out: Ptr) {
        self.sample(rng, out, 1)
    }

    /// Uniform element in `[0, 4p)`.
    pub fn random_wide(&mut self, rng: &mut impl RngCore, out: Ptr) {
        self.sample(rng, out, 2)
    }

    fn sample(&mut self, rng: &mut impl RngCore, out: Ptr, which: usize) {
        self.arena.check(out, 1);
        let FieldEngine {
            arena,
            layout,
            samplers,
            ..
        } = self;
        let sampler = &samplers[which];
        let mut buf = vec![0u8; sampler.n_bytes];
        loop {
            rng.fill_bytes(&mut buf);
            if let Some(last) = buf.last_mut() {
                *last &= sampler.msb_mask;
            }
            bytes_to_limbs(arena.limbs_mut(out), &buf, layout.w);
            if arithmetic::cmp(arena.limbs(out), &sampler.limbs) == Ordering::Less {
                return;
            }
        }
    }
}

fn cmp_at(d: &[u64], at: usize, c: &[u64]) -> Ordering {
    arithmetic::cmp(&d[at..at + c.len()], c)
}

fn sub_limbs_at(d: &mut [u64], at: usize, c: &[u64], w: u32) -> u64 {
    let mut borrow = 0;
    for (i, &ci) in c.iter().enumerate() {
        let (lo, b) = sbb(d[at + i], ci, borrow, w);
        d[at + i] = lo;
        borrow = b;
    }
    borrow
}

fn add_limbs_at(d: &mut [u64], at: usize, c: &[u64], w: u32) -> u64 {
    let mut carry = 0;
    for (i, &ci) in c.iter().enumerate() {
        let (lo, cy) = adc(d[at + i], ci, carry, w);
        d[at + i] = lo;
        carry = cy;
    }
    carry
}
