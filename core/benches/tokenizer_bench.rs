use criterion::{criterion_group, criterion_main, Criterion};
use irlab_core::corpus::Document;
use irlab_core::indexer::build_index;
use irlab_core::tokenizer::{ComplexTokenizer, SimpleTokenizer, Tokenizer};
use irlab_core::WeightScheme;

const ABSTRACT: &str = "An experimental study of a wing in a propeller slipstream was made in order \
to determine the spanwise distribution of the lift increase due to slipstream at different angles \
of attack of the wing and at different free stream to slipstream velocity ratios. The results were \
intended in part as an evaluation basis for different theoretical treatments of this problem. The \
comparative span loading curves, together with supporting evidence, showed that a substantial part \
of the lift increment produced by the slipstream was due to a /destalling/ or boundary-layer-control \
effect. The integrated remaining lift increment, after subtracting this destalling lift, was found to \
agree well with a potential flow theory. Mach 2.5 tests of the B-47 model at 1,200 ft/s followed.";

fn corpus() -> Vec<Document> {
    (1..=200)
        .map(|id| Document { id, text: ABSTRACT.repeat(1 + (id as usize % 3)) })
        .collect()
}

fn bench_tokenize(c: &mut Criterion) {
    let complex = ComplexTokenizer::new();
    c.bench_function("tokenize_complex", |b| b.iter(|| complex.tokenize(ABSTRACT)));
    c.bench_function("tokenize_simple", |b| b.iter(|| SimpleTokenizer.tokenize(ABSTRACT)));
}

fn bench_build(c: &mut Criterion) {
    let docs = corpus();
    let tokenizer = ComplexTokenizer::new();
    c.bench_function("build_frequency_index", |b| {
        b.iter(|| build_index(&docs, WeightScheme::Frequency, &tokenizer))
    });
    c.bench_function("build_weighted_index", |b| {
        b.iter(|| build_index(&docs, WeightScheme::Weighted, &tokenizer))
    });
}

criterion_group!(benches, bench_tokenize, bench_build);
criterion_main!(benches);
