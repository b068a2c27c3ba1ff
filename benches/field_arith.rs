use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use msm_fields::{bls12_381, FieldEngine, GeneralGlvDecomposer, GlvDecomposer};
use rand_core::SeedableRng;
use rand_xorshift::XorShiftRng;

const SEED: [u8; 16] = [
    0x59, 0x62, 0xbe, 0x5d, 0x76, 0x3d, 0x31, 0x8d, 0x17, 0xdb, 0x37, 0x32, 0x54, 0x06, 0xbc, 0xe5,
];

pub fn bench_base_field(c: &mut Criterion) {
    let mut rng = XorShiftRng::from_seed(SEED);
    let mut engine =
        FieldEngine::new(&bls12_381::MODULUS, bls12_381::BASE_LIMB_WIDTH).unwrap();
    let a = engine.alloc();
    let b = engine.alloc();
    let sq = engine.alloc();
    let out = engine.alloc();
    let scratch = engine.alloc_many(5);
    engine.random_lazy(&mut rng, a);
    engine.random_lazy(&mut rng, b);
    engine.square(sq, a);

    let mut group = c.benchmark_group("BLS12-381 base field");
    group.significance_level(0.1).sample_size(10000);
    group.throughput(Throughput::Elements(1));
    group.bench_function("fp_add", |bencher| {
        bencher.iter(|| engine.add(out, black_box(a), black_box(b)))
    });
    group.bench_function("fp_sub", |bencher| {
        bencher.iter(|| engine.subtract(out, black_box(a), black_box(b)))
    });
    group.bench_function("fp_mul", |bencher| {
        bencher.iter(|| engine.multiply(out, black_box(a), black_box(b)))
    });
    group.bench_function("fp_square", |bencher| {
        bencher.iter(|| engine.square(out, black_box(a)))
    });
    group.bench_function("fp_invert", |bencher| {
        bencher.iter(|| engine.inverse(&scratch[..3], out, black_box(a)))
    });
    group.bench_function("fp_sqrt", |bencher| {
        bencher.iter(|| engine.sqrt(&scratch, out, black_box(sq)))
    });
    group.finish();
}

pub fn bench_scalar_decomposition(c: &mut Criterion) {
    let mut rng = XorShiftRng::from_seed(SEED);
    let mut glv = GlvDecomposer::new(
        &bls12_381::SCALAR_MODULUS,
        &bls12_381::LAMBDA,
        bls12_381::SCALAR_LIMB_WIDTH,
    )
    .unwrap();
    let s = glv.alloc_scalar();
    glv.random_scalar(&mut rng, s);
    let mut bytes = [0u8; 32];
    let le = glv.read_bigint_wide(s).to_bytes_le();
    bytes[..le.len()].copy_from_slice(&le);

    let mut general = GeneralGlvDecomposer::new(
        &bls12_381::SCALAR_MODULUS,
        &bls12_381::LAMBDA,
        bls12_381::SCALAR_LIMB_WIDTH,
    )
    .unwrap();
    let (gs, s0, s1, gscratch) = {
        let engine = general.engine();
        (
            engine.alloc(),
            engine.alloc(),
            engine.alloc(),
            engine.alloc_many(3),
        )
    };
    general.engine().random_canonical(&mut rng, gs);

    let mut group = c.benchmark_group("BLS12-381 scalar decomposition");
    group.significance_level(0.1).sample_size(10000);
    group.throughput(Throughput::Elements(1));
    group.bench_function("glv_fast", |bencher| {
        bencher.iter(|| {
            glv.from_packed_bytes_wide(s, black_box(&bytes)).unwrap();
            glv.decompose(s);
        })
    });
    group.bench_function("glv_fast_no_msb", |bencher| {
        bencher.iter(|| {
            glv.from_packed_bytes_wide(s, black_box(&bytes)).unwrap();
            glv.decompose_no_msb(s)
        })
    });
    group.bench_function("glv_general", |bencher| {
        bencher.iter(|| general.decompose(&gscratch, black_box(gs), s0, s1))
    });
    group.finish();
}

criterion_group!(benches, bench_base_field, bench_scalar_decomposition);
criterion_main!(benches);
