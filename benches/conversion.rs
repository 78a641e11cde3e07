use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tabular_crunch::conversion::json::JsonTabularizer;
use tabular_crunch::conversion::{ExportOptions, convert_to_writer};
use tabular_crunch::narrowing::TypeNarrower;

fn write_listing(records: usize) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("tabular-crunch-bench-{records}-{nanos}.json"));

    let mut doc = String::from(r#"{"kind":"Listing","data":{"children":["#);
    for i in 0..records {
        if i > 0 {
            doc.push(',');
        }
        doc.push_str(&format!(
            r#"{{"kind":"t3","data":{{"id":"r{i}","score":{},"ratio":0.{},"over_18":{},"tags":["a","b"],"author":{{"name":"user{}","karma":{}}}}}}}"#,
            i * 7,
            i % 100,
            i % 2 == 0,
            i % 50,
            i * 13
        ));
    }
    doc.push_str("]}}");
    std::fs::write(&path, doc).unwrap();
    path
}

fn bench_json_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_two_pass");
    let options = ExportOptions::default();

    for records in [1_000usize, 10_000] {
        let path = write_listing(records);
        group.throughput(Throughput::Elements(records as u64));
        group.bench_with_input(BenchmarkId::from_parameter(records), &path, |b, path| {
            b.iter(|| {
                let mut out = Vec::with_capacity(records * 64);
                let summary =
                    convert_to_writer(&JsonTabularizer::new(), path, "/data/children", &mut out, &options).unwrap();
                black_box((summary, out))
            })
        });
        std::fs::remove_file(&path).unwrap();
    }
    group.finish();
}

fn bench_type_probe(c: &mut Criterion) {
    let narrower = TypeNarrower::default();
    let values: Vec<Option<String>> = (0..10_000).map(|i| Some(format!("{}.{}", i, i % 1000))).collect();

    c.bench_function("find_fitting_type_10k_decimals", |b| {
        b.iter(|| black_box(narrower.find_fitting_type(black_box(&values))))
    });
}

criterion_group!(benches, bench_json_conversion, bench_type_probe);
criterion_main!(benches);
