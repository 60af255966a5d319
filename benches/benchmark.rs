use criterion::{Criterion, criterion_group, criterion_main};
use neuromorph::diagnostics::{Diagnostics, WarningPolicy};
use neuromorph::model::SectionTree;
use neuromorph::{LoadOptions, asc, columnar, swc};
use std::fmt::Write;

/// (name, bifurcation depth, samples per section)
const GENERATED_CELLS: &[(&str, u32, usize)] = &[("small", 6, 10), ("medium", 9, 20), ("large", 12, 20)];

/// SWC text of a single point soma and a full binary dendrite.
fn generate_swc(depth: u32, samples_per_section: usize) -> String {
    let mut out = String::from("1 1 0 0 0 5 -1\n");
    let mut next_id = 2usize;
    // (parent sample, x, y, remaining depth)
    let mut stack = vec![(1usize, 0.0f64, 0.0f64, depth)];
    while let Some((parent, x, y, remaining)) = stack.pop() {
        let mut last = parent;
        for i in 1..=samples_per_section {
            let _ = writeln!(out, "{} 3 {} {} 0 0.5 {}", next_id, x, y + i as f64, last);
            last = next_id;
            next_id += 1;
        }
        if remaining > 0 {
            let y = y + samples_per_section as f64;
            stack.push((last, x - 1.0, y, remaining - 1));
            stack.push((last, x + 1.0, y, remaining - 1));
        }
    }
    out
}

fn quiet() -> Diagnostics {
    Diagnostics::new(WarningPolicy::collecting())
}

fn options() -> LoadOptions {
    LoadOptions::default().with_policy(WarningPolicy::collecting())
}

fn parsing(c: &mut Criterion) {
    for &(name, depth, samples) in GENERATED_CELLS {
        let swc_text = generate_swc(depth, samples);
        let morph = swc::parse_str_with(&swc_text, name, &options(), &mut quiet()).unwrap();
        let asc_text = asc::to_asc_string(&morph, &mut quiet()).unwrap().unwrap();
        let bytes = columnar::to_table_store(&morph, &mut quiet()).unwrap().unwrap().to_bytes().unwrap();

        c.bench_function(&format!("swc/{name}"), |b| {
            b.iter(|| swc::parse_str_with(&swc_text, name, &options(), &mut quiet()).unwrap());
        });
        c.bench_function(&format!("asc/{name}"), |b| {
            b.iter(|| asc::parse_str_with(&asc_text, name, &options(), &mut quiet()).unwrap());
        });
        c.bench_function(&format!("columnar/{name}"), |b| {
            b.iter(|| columnar::parse_bytes_with(&bytes, name, &options(), &mut quiet()).unwrap());
        });
    }
}

fn writing_and_traversal(c: &mut Criterion) {
    let (name, depth, samples) = GENERATED_CELLS[GENERATED_CELLS.len() - 1];
    let morph = swc::parse_str_with(&generate_swc(depth, samples), name, &options(), &mut quiet()).unwrap();

    c.bench_function("write_swc", |b| {
        b.iter(|| swc::to_swc_string(&morph, &mut quiet()).unwrap());
    });
    c.bench_function("write_columnar", |b| {
        b.iter(|| columnar::to_table_store(&morph, &mut quiet()).unwrap());
    });
    c.bench_function("freeze", |b| {
        b.iter(|| morph.to_immutable());
    });
    let frozen = morph.to_immutable();
    c.bench_function("breadth_first", |b| {
        b.iter(|| frozen.breadth_first().count());
    });
}

criterion_group!(regression, parsing);
criterion_group! {
    name = reporting;
    config = Criterion::default().sample_size(10);
    targets = writing_and_traversal
}
criterion_main!(regression, reporting);
