use criterion::{Criterion, criterion_group, criterion_main};
use matlab_runner::infra::xml::Document;
use matlab_runner::ingest::{cobertura, tap};
use std::fmt::Write;
use std::hint::black_box;

/// A coverage report with `classes` user classes and one driver package.
fn coverage_report(classes: usize) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<coverage line-rate=\"0.5\" lines-covered=\"1\" lines-valid=\"2\">\
         <sources><source>/ws</source><source>/tmp/genscript_bench</source></sources><packages><package name=\"src\"><classes>",
    );
    for i in 0..classes {
        let _ = write!(
            xml,
            "<class name=\"c{i}\" filename=\"c{i}.m\"><methods/><lines>\
             <line number=\"1\" hits=\"1\"/><line number=\"2\" hits=\"0\"/></lines></class>"
        );
    }
    xml.push_str(
        "</classes></package><package name=\"+scriptgen\"><classes>\
         <class name=\"selectTests\" filename=\"+scriptgen/selectTests.m\"><lines><line number=\"1\" hits=\"1\"/></lines></class>\
         </classes></package></packages></coverage>",
    );
    xml
}

fn tap_report(tests: usize) -> String {
    let mut text = format!("TAP version 13\n1..{}\n", tests);
    for i in 1..=tests {
        let _ = writeln!(text, "ok {} - suite/test{}", i, i);
    }
    text
}

fn bench_ingest(c: &mut Criterion) {
    let markers: Vec<String> = ["+scriptgen", "genscript", "runner_"]
        .iter()
        .map(|m| m.to_string())
        .collect();
    let coverage = coverage_report(500);
    let tap_text = tap_report(2000);

    c.bench_function("cobertura_sanitize", |b| {
        b.iter(|| {
            let mut doc = Document::parse(black_box(&coverage)).unwrap();
            let removed = cobertura::sanitize(&mut doc, &markers);
            black_box((removed, doc.to_xml().unwrap()))
        });
    });

    c.bench_function("tap_parse", |b| {
        b.iter(|| tap::parse(black_box(&tap_text)).unwrap());
    });
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);
