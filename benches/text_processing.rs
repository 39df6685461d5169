use criterion::{black_box, criterion_group, criterion_main, Criterion};
use file_search_engine::text_processing::TextProcessor;

fn sample_text() -> String {
    let paragraph = "The quarterly report summarizes revenue, expenses and the \
                     projected growth of the organization. Relatório de ação \
                     com acentuação, pontuação... e palavras repetidas! ";
    paragraph.repeat(50)
}

fn bench_normalize(c: &mut Criterion) {
    let processor = TextProcessor::new().unwrap();
    let text = sample_text();
    c.bench_function("normalize", |b| {
        b.iter(|| processor.normalize(black_box(&text)))
    });
}

fn bench_tokenize_with_positions(c: &mut Criterion) {
    let processor = TextProcessor::new().unwrap();
    let text = sample_text();
    c.bench_function("tokenize_with_positions", |b| {
        b.iter(|| processor.tokenize_with_positions(black_box(&text)))
    });
}

criterion_group!(benches, bench_normalize, bench_tokenize_with_positions);
criterion_main!(benches);
