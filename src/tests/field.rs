use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand_core::RngCore;

use super::{base_engine, rng};
use crate::bls12_381::{SCALAR_LIMB_WIDTH, SCALAR_MODULUS};
use crate::{Error, FieldEngine};

#[test]
fn construction_is_checked() {
    let even = BigUint::from(1000002u64);
    assert_eq!(FieldEngine::new(&even, 17).unwrap_err(), Error::ModulusEven);
    // w = 32 over the 255-bit scalar modulus gives k = 256 < log2(4q)
    assert_eq!(
        FieldEngine::new(&SCALAR_MODULUS, 32).unwrap_err(),
        Error::RadixTooSmall { k: 256 }
    );
}

#[test]
fn montgomery_constants_match_bigint() {
    let engine = base_engine();
    let p = engine.modulus().clone();
    let k = engine.layout().k;
    let bit_length = engine.layout().bit_length;
    let r = (BigUint::one() << k) % &p;
    let c = engine.constants();
    assert_eq!(engine.read_bigint(c.one), BigUint::one());
    assert_eq!(engine.read_bigint(c.modulus), p.clone());
    assert_eq!(engine.read_bigint(c.mg1), r.clone());
    assert_eq!(engine.read_bigint(c.mg2), (&r * 2u32) % &p);
    assert_eq!(engine.read_bigint(c.mg8), (&r * 8u32) % &p);
    assert_eq!(engine.read_bigint(c.r2), (&r * &r) % &p);
    assert_eq!(
        engine.read_bigint(c.r2corr),
        (BigUint::one() << (3 * k - 2 * bit_length)) % &p
    );
}

#[test]
fn montgomery_round_trip() {
    let mut engine = base_engine();
    let mut rng = rng();
    let x = engine.alloc();
    for _ in 0..100 {
        engine.random_canonical(&mut rng, x);
        let value = engine.read_bigint(x);
        engine.to_montgomery(x);
        engine.from_montgomery(x);
        assert_eq!(engine.read_bigint(x), value);
    }
}

#[test]
fn arithmetic_matches_bigint() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let ptrs = engine.alloc_many(3);
    let (a, b, out) = (ptrs[0], ptrs[1], ptrs[2]);
    for _ in 0..1000 {
        engine.random_canonical(&mut rng, a);
        engine.random_canonical(&mut rng, b);
        let va = engine.read_bigint(a);
        let vb = engine.read_bigint(b);
        engine.to_montgomery(a);
        engine.to_montgomery(b);

        engine.add(out, a, b);
        engine.from_montgomery(out);
        assert_eq!(engine.read_bigint(out), (&va + &vb) % &p);

        engine.subtract(out, a, b);
        engine.from_montgomery(out);
        assert_eq!(engine.read_bigint(out), (&va + &p - &vb) % &p);

        engine.multiply(out, a, b);
        engine.from_montgomery(out);
        assert_eq!(engine.read_bigint(out), (&va * &vb) % &p);

        engine.square(out, a);
        engine.from_montgomery(out);
        assert_eq!(engine.read_bigint(out), (&va * &va) % &p);
    }
}

#[test]
fn lazy_outputs_stay_below_2p() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let p2 = &p * 2u32;
    let r = (BigUint::one() << engine.layout().k) % &p;
    let ptrs = engine.alloc_many(3);
    let (a, b, out) = (ptrs[0], ptrs[1], ptrs[2]);
    for _ in 0..200 {
        engine.random_lazy(&mut rng, a);
        engine.random_lazy(&mut rng, b);
        let va = engine.read_bigint(a);
        let vb = engine.read_bigint(b);

        engine.add(out, a, b);
        let sum = engine.read_bigint(out);
        assert!(sum < p2);
        assert_eq!(&sum % &p, (&va + &vb) % &p);

        engine.subtract(out, a, b);
        let diff = engine.read_bigint(out);
        assert!(diff < p2);
        assert_eq!(&diff % &p, (&va + &p2 - &vb) % &p);

        // Montgomery product: out * R = a * b (mod p)
        engine.multiply(out, a, b);
        let prod = engine.read_bigint(out);
        assert!(prod < p2);
        assert_eq!(prod * &r % &p, (&va * &vb) % &p);
    }
}

#[test]
fn reduce_canonicalizes_lazy_values() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let x = engine.alloc();
    let mut seen_above_p = false;
    for _ in 0..100 {
        engine.random_lazy(&mut rng, x);
        let value = engine.read_bigint(x);
        seen_above_p |= value >= p;
        engine.reduce(x);
        assert_eq!(engine.read_bigint(x), value % &p);
    }
    assert!(seen_above_p);
}

#[test]
fn power_matches_modpow() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let ptrs = engine.alloc_many(3);
    let (base, out, scratch) = (ptrs[0], ptrs[1], ptrs[2]);
    let mut exp_bytes = [0u8; 48];
    for _ in 0..20 {
        engine.random_canonical(&mut rng, base);
        let vb = engine.read_bigint(base);
        rng.fill_bytes(&mut exp_bytes);
        let exp = BigUint::from_bytes_le(&exp_bytes);
        engine.to_montgomery(base);
        engine.power(scratch, out, base, &exp);
        engine.from_montgomery(out);
        assert_eq!(engine.read_bigint(out), vb.modpow(&exp, &p));
    }
}

#[test]
fn left_shift_matches_doubling() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let x = engine.alloc();
    let out = engine.alloc();
    for bits in [0u32, 1, 2, 13, 64] {
        engine.random_canonical(&mut rng, x);
        let value = engine.read_bigint(x);
        engine.to_montgomery(x);
        engine.left_shift(out, x, bits);
        engine.from_montgomery(out);
        assert_eq!(engine.read_bigint(out), (value << bits) % &p);
    }
}

#[test]
fn inverse_matches_fermat() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let x = engine.alloc();
    let inv = engine.alloc();
    let prod = engine.alloc();
    let scratch = engine.alloc_many(3);
    let mg1 = engine.constants().mg1;
    for _ in 0..100 {
        loop {
            engine.random_canonical(&mut rng, x);
            if !engine.is_zero(x) {
                break;
            }
        }
        let value = engine.read_bigint(x);
        engine.to_montgomery(x);
        engine.inverse(&scratch, inv, x);
        engine.multiply(prod, inv, x);
        engine.reduce(prod);
        assert!(engine.is_equal(prod, mg1));
        engine.from_montgomery(inv);
        assert_eq!(
            engine.read_bigint(inv),
            value.modpow(&(&p - 2u32), &p)
        );
    }
}

#[test]
fn batch_inverse_matches_single() {
    let mut engine = base_engine();
    let mut rng = rng();
    let scratch = engine.alloc_many(4);
    let single = engine.alloc();
    for count in [1usize, 2, 16, 100] {
        let mark = engine.checkpoint();
        let xs = engine.alloc_many(count);
        let outs = engine.alloc_many(count);
        for &x in &xs {
            loop {
                engine.random_canonical(&mut rng, x);
                if !engine.is_zero(x) {
                    break;
                }
            }
            engine.to_montgomery(x);
        }
        engine.batch_inverse(&scratch, &outs, &xs);
        for (&x, &out) in xs.iter().zip(outs.iter()) {
            engine.inverse(&scratch[..3], single, x);
            engine.reduce(single);
            engine.reduce(out);
            assert!(engine.is_equal(out, single));
        }
        engine.reset_to(mark);
    }
}

#[test]
fn batch_inverse_of_empty_slice() {
    let mut engine = base_engine();
    let scratch = engine.alloc_many(4);
    engine.batch_inverse(&scratch, &[], &[]);
}

#[test]
fn sqrt_agrees_with_euler_criterion() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let euler = (&p - 1u32) >> 1;
    let x = engine.alloc();
    let out = engine.alloc();
    let check = engine.alloc();
    let scratch = engine.alloc_many(5);
    let mut residues = 0;
    let mut non_residues = 0;
    for _ in 0..50 {
        engine.random_canonical(&mut rng, x);
        let value = engine.read_bigint(x);
        engine.to_montgomery(x);
        let found = engine.sqrt(&scratch, out, x);
        let is_square = value.is_zero() || value.modpow(&euler, &p).is_one();
        assert_eq!(found, is_square);
        if found {
            residues += 1;
            engine.square(check, out);
            engine.from_montgomery(check);
            assert_eq!(engine.read_bigint(check), value);
        } else {
            non_residues += 1;
        }
    }
    assert!(residues > 0 && non_residues > 0);
}

#[test]
fn sqrt_handles_deep_two_adicity() {
    let mut engine = FieldEngine::new(&SCALAR_MODULUS, SCALAR_LIMB_WIDTH).unwrap();
    let mut rng = rng();
    let q = engine.modulus().clone();
    // q - 1 is divisible by 2^32, so the discrete log loop runs deep
    assert_eq!((&q - 1u32).trailing_zeros(), Some(32));
    let euler = (&q - 1u32) >> 1;
    let x = engine.alloc();
    let out = engine.alloc();
    let check = engine.alloc();
    let scratch = engine.alloc_many(5);
    let mut residues = 0;
    let mut non_residues = 0;
    for _ in 0..20 {
        engine.random_canonical(&mut rng, x);
        let value = engine.read_bigint(x);
        engine.to_montgomery(x);
        let found = engine.sqrt(&scratch, out, x);
        let is_square = value.is_zero() || value.modpow(&euler, &q).is_one();
        assert_eq!(found, is_square);
        if found {
            residues += 1;
            engine.square(check, out);
            engine.from_montgomery(check);
            assert_eq!(engine.read_bigint(check), value);
        } else {
            non_residues += 1;
        }
    }
    assert!(residues > 0 && non_residues > 0);
}

#[test]
fn sqrt_of_zero_is_zero() {
    let mut engine = base_engine();
    let x = engine.alloc();
    let out = engine.alloc();
    let scratch = engine.alloc_many(5);
    let zero = engine.constants().zero;
    engine.copy(x, zero);
    assert!(engine.sqrt(&scratch, out, x));
    assert!(engine.is_zero(out));
}

#[test]
fn sampling_respects_bounds() {
    let mut engine = base_engine();
    let mut rng = rng();
    let p = engine.modulus().clone();
    let x = engine.alloc();
    let mut lazy_above_p = false;
    for _ in 0..100 {
        engine.random_canonical(&mut rng, x);
        assert!(engine.read_bigint(x) < p);
        engine.random_lazy(&mut rng, x);
        let value = engine.read_bigint(x);
        assert!(value < &p * 2u32);
        lazy_above_p |= value >= p;
        engine.random_wide(&mut rng, x);
        assert!(engine.read_bigint(x) < &p * 4u32);
    }
    assert!(lazy_above_p);
}

#[test]
fn packed_bytes_round_trip() {
    let mut engine = base_engine();
    let mut rng = rng();
    let x = engine.alloc();
    let y = engine.alloc();
    assert_eq!(
        engine.from_packed_bytes(x, &[0u8; 5]).unwrap_err(),
        Error::InvalidByteLength {
            expected: 48,
            got: 5
        }
    );
    let mut buf = [0u8; 48];
    for _ in 0..20 {
        engine.random_canonical(&mut rng, x);
        engine.to_packed_bytes(&mut buf, x).unwrap();
        engine.from_packed_bytes(y, &buf).unwrap();
        assert!(engine.is_equal(x, y));
    }
}

#[test]
fn checkpoints_reuse_scratch_space() {
    let mut engine = base_engine();
    let mut rng = rng();
    let pinned = engine.alloc();
    engine.random_canonical(&mut rng, pinned);
    let value = engine.read_bigint(pinned);
    let mark = engine.checkpoint();
    let a = engine.alloc();
    engine.random_canonical(&mut rng, a);
    engine.reset_to(mark);
    let b = engine.alloc();
    assert_eq!(a, b);
    assert_eq!(engine.read_bigint(pinned), value);
}
