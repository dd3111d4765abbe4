use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ebcdic_convert::{
    CodePage, EncodingDetector, SourceSelection, Translator, choose_destination, convert_bytes,
    detect_plausibility,
};

/// "ABC 123" in EBCDIC
const ABC_123: [u8; 7] = [0xC1, 0xC2, 0xC3, 0x40, 0xF1, 0xF2, 0xF3];

fn benchmark_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");

    for repetitions in [100usize, 10_000, 100_000] {
        let data = ABC_123.repeat(repetitions);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(data.len()), &data, |b, data| {
            let detector = EncodingDetector::new();
            b.iter(|| detector.detect(black_box(data)))
        });
    }

    group.finish();

    // Gate only looks at the first 4096 bytes
    c.bench_function("plausibility_1mb", |b| {
        let data = ABC_123.repeat(150_000);
        b.iter(|| detect_plausibility(black_box(&data)))
    });
}

fn benchmark_decode_and_select(c: &mut Criterion) {
    let data = ABC_123.repeat(10_000);

    c.bench_function("decode_lossy_70kb", |b| {
        let translator = Translator::new(CodePage::Cp500);
        b.iter(|| translator.decode_lossy(black_box(&data)))
    });

    c.bench_function("choose_destination_70kb", |b| {
        let text = Translator::new(CodePage::Cp500).decode_lossy(&data).text;
        b.iter(|| choose_destination(black_box(&text)))
    });

    c.bench_function("convert_bytes_1mb", |b| {
        let data = ABC_123.repeat(150_000);
        b.iter(|| convert_bytes(black_box(&data), SourceSelection::Auto, None))
    });
}

criterion_group!(benches, benchmark_detection, benchmark_decode_and_select);
criterion_main!(benches);
