use criterion::{Criterion, criterion_group, criterion_main};
use modlist::services::FolderNameCodec;
use std::hint::black_box;

fn bench_codec(c: &mut Criterion) {
    let codec = FolderNameCodec::default();
    let names: Vec<String> = (0..256)
        .map(|i| match i % 3 {
            0 => format!("Outfit {i}"),
            1 => format!("DISABLED_Outfit {i}"),
            _ => format!("DISABLEDOutfit {i}"),
        })
        .collect();

    c.bench_function("is_disabled_name x256", |b| {
        b.iter(|| {
            names
                .iter()
                .filter(|name| codec.is_disabled_name(black_box(name)))
                .count()
        })
    });

    c.bench_function("apply_disabled_marker x256", |b| {
        b.iter(|| {
            for name in &names {
                black_box(codec.apply_disabled_marker(black_box(name)));
            }
        })
    });

    c.bench_function("strip_disabled_marker x256", |b| {
        b.iter(|| {
            for name in &names {
                black_box(codec.strip_disabled_marker(black_box(name)));
            }
        })
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
