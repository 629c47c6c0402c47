use criterion::{black_box, criterion_group, criterion_main, Criterion};
use graph_rag::graphrag::{
    Chunker, EntityLinkExtractor, HashingEmbedder, KeywordLinkExtractor, LinkExtractor, Metadata,
    MmrSelector,
};
use graph_rag::config::DEFAULT_ENTITY_LABELS;

fn chunker_benchmark(c: &mut Criterion) {
    let text = "Graph RAG splits documents into chunks.\n\nVector search ranks chunks, \
        graph traversal follows links between them.\n"
        .repeat(64);

    let words = Chunker::new(64, 8);
    c.bench_function("chunker_words_long_text", |b| {
        b.iter(|| {
            let chunks = words.chunk(black_box(text.as_str()), "bench");
            black_box(chunks.len());
        });
    });

    let recursive = Chunker::recursive(1024, 64);
    c.bench_function("chunker_recursive_long_text", |b| {
        b.iter(|| {
            let chunks = recursive.chunk(black_box(text.as_str()), "bench");
            black_box(chunks.len());
        });
    });
}

fn extractor_benchmark(c: &mut Criterion) {
    let text = "Alice builds Rust pipelines with Cassandra and LangChain in Berlin, \
        linking chunks by keywords and entities for graph traversal."
        .repeat(32);
    let metadata = Metadata::new();

    let keywords = KeywordLinkExtractor::new(5);
    c.bench_function("keyword_links_dense_text", |b| {
        b.iter(|| black_box(keywords.extract(black_box(&text), &metadata).len()));
    });

    let entities = EntityLinkExtractor::new(DEFAULT_ENTITY_LABELS);
    c.bench_function("entity_links_dense_text", |b| {
        b.iter(|| black_box(entities.extract(black_box(&text), &metadata).len()));
    });
}

fn mmr_benchmark(c: &mut Criterion) {
    let embedder = HashingEmbedder::new(256);
    let candidates: Vec<Vec<f32>> = (0..200)
        .map(|i| embedder.embed_text(&format!("chunk {} about graph traversal topic {}", i, i % 7)))
        .collect();
    let query = embedder.embed_text("graph traversal topic 3");

    c.bench_function("mmr_select_10_of_200", |b| {
        b.iter(|| {
            let Ok(mut selector) = MmrSelector::new(10, query.clone(), 0.5, None) else {
                return;
            };
            selector.add_candidates(
                candidates
                    .iter()
                    .enumerate()
                    .map(|(node, emb)| (node, emb.clone(), 0)),
            );
            while let Some(sel) = selector.pop_best() {
                black_box(sel.node);
            }
        });
    });
}

criterion_group!(benches, chunker_benchmark, extractor_benchmark, mmr_benchmark);
criterion_main!(benches);
