use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use swf_test_fixtures::samples;
use swf_tree::registry;

fn bench_samples(c: &mut Criterion) {
    let reg = registry();
    let mut group = c.benchmark_group("tag_codec");
    for name in samples::keys() {
        let ty = samples::type_name(&name).expect("sample type");
        let bytes = samples::bytes(&name).expect("sample bytes");
        let value = reg.decode(&bytes, ty).expect("sample decodes");
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("decode", &name), &bytes, |b, bytes| {
            b.iter(|| reg.decode(black_box(bytes), ty).expect("decode"))
        });
        group.bench_with_input(BenchmarkId::new("encode", &name), &value, |b, value| {
            b.iter(|| reg.encode(black_box(value), ty).expect("encode"))
        });
        group.bench_with_input(BenchmarkId::new("to_json", &name), &value, |b, value| {
            b.iter(|| reg.encode_json(black_box(value), ty).expect("json"))
        });
    }
    group.finish();
}

fn bench_registry_build(c: &mut Criterion) {
    c.bench_function("registry_build", |b| {
        b.iter(|| swf_tree::build_registry().expect("declarations build"))
    });
}

criterion_group!(benches, bench_samples, bench_registry_build);
criterion_main!(benches);
