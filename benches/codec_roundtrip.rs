//! Benchmark: encode, decode and encode+decode of representative value trees
//! (a wide map of mixed scalars, a long integer array, a few large strings).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minipack::{decode_slice, encode_to_vec, DecodeOptions, EncodeOptions, Map, Value};

fn wide_map() -> Value {
    let mut m = Map::new();
    for i in 0..256u32 {
        let v = match i % 4 {
            0 => Value::Int(-(i as i64) * 1000),
            1 => Value::UInt(u64::from(i) << 20),
            2 => Value::F64(f64::from(i) / 3.0),
            _ => Value::from(format!("value-{}", i)),
        };
        m.insert(format!("key-{}", i), v);
    }
    Value::Map(m)
}

fn int_array() -> Value {
    Value::Array((0..10_000i64).map(|i| Value::Int(i * 37 - 50_000)).collect())
}

fn big_strings() -> Value {
    Value::Array((0..8).map(|i| Value::from("x".repeat(4096 * (i + 1)))).collect())
}

fn bench_codec(c: &mut Criterion) {
    let enc = EncodeOptions::default();
    let dec = DecodeOptions::default();
    let cases = [("wide_map", wide_map()), ("int_array", int_array()), ("big_strings", big_strings())];

    for (name, value) in &cases {
        let bytes = encode_to_vec(value, &enc).expect("encode");

        c.bench_function(&format!("encode_{}", name), |b| {
            b.iter(|| encode_to_vec(black_box(value), &enc).expect("encode"))
        });
        c.bench_function(&format!("decode_{}", name), |b| {
            b.iter(|| decode_slice(black_box(&bytes), &dec).expect("decode"))
        });
        c.bench_function(&format!("roundtrip_{}", name), |b| {
            b.iter(|| {
                let bytes = encode_to_vec(black_box(value), &enc).expect("encode");
                decode_slice(&bytes, &dec).expect("decode")
            })
        });
    }
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
