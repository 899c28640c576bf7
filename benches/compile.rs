//! Benchmarks for the compile pipeline.
//!
//! Run with: cargo bench

use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};

use ipfc::{CompileOptions, Document, FileOpener, Scanner, compile};

/// A generated document with `pages` headings, each holding a paragraph,
/// a list, an index entry and a link to the next page.
fn sample_source(pages: usize) -> String {
    let mut text = String::from(":userdoc.\n:title.Benchmark Guide\n");
    for n in 0..pages {
        let next = (n + 1) % pages + 1;
        text.push_str(&format!(":h{} res={} id=page{}.Topic number {}\n", n % 3 + 1, n + 1, n, n));
        text.push_str(&format!(":i1.Topic {n}\n"));
        text.push_str(":p.The quick brown fox jumps over the lazy dog. ");
        text.push_str(&format!("Word{n} appears only here.\n"));
        text.push_str(":ul.\n:li.first item\n:li.second item\n:eul.\n");
        text.push_str(&format!(":link reftype=hd res={next}.Next topic:elink.\n"));
    }
    text.push_str(":euserdoc.\n");
    text
}

fn bench_parse(c: &mut Criterion) {
    let text = sample_source(500);
    c.bench_function("parse_500_pages", |b| {
        b.iter(|| {
            let mut doc = Document::new(CompileOptions::default());
            doc.parse(Box::new(Scanner::new("bench.ipf", text.clone())), &FileOpener)
                .unwrap();
            black_box(doc)
        });
    });
}

fn bench_compile(c: &mut Criterion) {
    let text = sample_source(500);
    c.bench_function("compile_500_pages", |b| {
        b.iter(|| {
            let mut out = Cursor::new(Vec::with_capacity(1 << 20));
            compile(
                Box::new(Scanner::new("bench.ipf", text.clone())),
                &FileOpener,
                CompileOptions::default(),
                &mut out,
            )
            .unwrap();
            black_box(out.into_inner())
        });
    });
}

fn bench_compile_searchable(c: &mut Criterion) {
    let text = sample_source(500);
    c.bench_function("compile_500_pages_searchable", |b| {
        b.iter(|| {
            let mut out = Cursor::new(Vec::with_capacity(1 << 20));
            compile(
                Box::new(Scanner::new("bench.ipf", text.clone())),
                &FileOpener,
                CompileOptions::default().with_searchable(true),
                &mut out,
            )
            .unwrap();
            black_box(out.into_inner())
        });
    });
}

criterion_group!(benches, bench_parse, bench_compile, bench_compile_searchable);
criterion_main!(benches);
