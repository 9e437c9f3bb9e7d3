use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lectern_core::{
    ImageRecoveryConfig, ParsedTree, Pipeline, Readability, SanitizeConfig, chunk, collect, prepare, sanitize,
};

const ARTICLE_URL: &str = "https://www.journal.test/2024/night-trains";

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name)).unwrap()
}

fn bench_sanitize(c: &mut Criterion) {
    let html = fixture("article.html");
    let config = SanitizeConfig::default();

    c.bench_function("sanitize", |b| {
        b.iter(|| sanitize(ParsedTree::parse_document(black_box(&html)), &config).to_html())
    });
}

fn bench_readability(c: &mut Criterion) {
    let html = fixture("article.html");
    let reader = Readability::new();

    c.bench_function("readability", |b| b.iter(|| reader.extract(black_box(&html), None)));
}

fn bench_collect_images(c: &mut Criterion) {
    let html = fixture("article.html");
    let config = ImageRecoveryConfig::default();

    c.bench_function("collect_images", |b| b.iter(|| collect(black_box(&html), &config, None)));
}

fn bench_web_extraction(c: &mut Criterion) {
    let html = fixture("article.html");
    let pipeline = Pipeline::new();

    c.bench_function("web_extraction", |b| {
        b.iter(|| pipeline.extract_web(black_box(&html), ARTICLE_URL))
    });
}

fn bench_email(c: &mut Criterion) {
    let raw = std::fs::read("../../tests/fixtures/newsletter.eml").unwrap();
    let pipeline = Pipeline::new();

    c.bench_function("email_newsletter", |b| b.iter(|| pipeline.parse_email(black_box(&raw))));
}

fn bench_chunking(c: &mut Criterion) {
    let text = prepare(&fixture("sample.md")).repeat(200);
    let mut group = c.benchmark_group("chunk");

    for max in [200usize, 1000, 4000] {
        group.bench_with_input(BenchmarkId::from_parameter(max), &max, |b, &max| {
            b.iter(|| chunk(black_box(&text), max))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sanitize,
    bench_readability,
    bench_collect_images,
    bench_web_extraction,
    bench_email,
    bench_chunking
);
criterion_main!(benches);
