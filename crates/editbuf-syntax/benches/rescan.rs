use criterion::{Criterion, criterion_group, criterion_main};
use editbuf_core::Document;
use editbuf_syntax::CppSyntaxer;
use std::hint::black_box;

fn source(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        match i % 6 {
            0 => text.push_str("#define VALUE(x) ((x) * 2)"),
            1 => text.push_str("int compute(int a, int b) {"),
            2 => text.push_str("    /* multiply then add */ return a * b + 0x1F;"),
            3 => text.push_str("    const char* s = \"tab\\t\";"),
            4 => text.push_str("}"),
            _ => text.push_str("// trailing comment"),
        }
        text.push('\n');
    }
    text
}

fn bench_full_rescan(c: &mut Criterion) {
    let text = source(20_000);
    c.bench_function("full_rescan_20k_lines", |b| {
        b.iter(|| {
            let document = Document::from_text(&text);
            let mut syntaxer = CppSyntaxer::new();
            black_box(document.rescan_stale(&mut syntaxer));
        })
    });
}

fn bench_comment_toggle(c: &mut Criterion) {
    let document = Document::from_text(&source(20_000));
    let mut syntaxer = CppSyntaxer::new();
    document.rescan_stale(&mut syntaxer);
    let original = document.line(10_000).unwrap_or_default();

    c.bench_function("comment_toggle_mid_file", |b| {
        b.iter(|| {
            document.put_line(10_000, &format!("/*{original}"));
            black_box(document.rescan_stale(&mut syntaxer));
            document.put_line(10_000, &original);
            black_box(document.rescan_stale(&mut syntaxer));
        })
    });
}

criterion_group!(benches, bench_full_rescan, bench_comment_toggle);
criterion_main!(benches);
