use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_stylesheet::{parse, StylesheetManager};

fn large_sheet() -> String {
    (0..500)
        .map(|i| {
            format!(
                "[data-trellis-dom-id=\"node-{i}\"] {{ color: red; width: {i}px; margin: 0 auto }}\n"
            )
        })
        .collect()
}

fn parse_large_sheet(c: &mut Criterion) {
    let source = large_sheet();
    c.bench_function("parse_large_sheet", |b| b.iter(|| parse(black_box(&source))));
}

fn update_style_burst(c: &mut Criterion) {
    let source = large_sheet();
    c.bench_function("update_style_burst", |b| {
        b.iter(|| {
            let mut manager = StylesheetManager::from_css(&source).unwrap();
            for step in 0..50 {
                manager.update_style(black_box("node-250"), "width", &format!("{step}px"));
            }
        })
    });
}

criterion_group!(benches, parse_large_sheet, update_style_burst);
criterion_main!(benches);
