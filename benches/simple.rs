use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rdgen::{Config, Generator};

const ARITHMETIC: &str = r#"
expr   = term , { ( "+" | "-" ) , term } ;
term   = factor , { ( "*" | "/" ) , factor } ;
factor = integerConstant | "(" , expr , ")" ;
"#;

fn expression_input(terms: usize) -> String {
    let mut input = String::from("1");
    for i in 0..terms {
        input.push_str(if i % 2 == 0 { "+2*(3-4)" } else { "-5/(6+7)" });
    }
    input
}

fn run_recognizer(generator: &Generator, input: &str) {
    generator.recognize(input).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut c = c.benchmark_group("Simple");
    c.measurement_time(Duration::from_secs(10)).sample_size(100);
    let generator = Generator::new(ARITHMETIC).unwrap();
    let input = expression_input(100);
    c.bench_function("arithmetic 100 terms", |b| {
        b.iter(|| run_recognizer(black_box(&generator), &input))
    });
    let mut no_memo_config = Config::default();
    no_memo_config.runtime.memoization = false;
    let generator = Generator::with_config(ARITHMETIC, no_memo_config).unwrap();
    c.bench_function("arithmetic 100 terms (no memoization)", |b| {
        b.iter(|| run_recognizer(black_box(&generator), &input))
    });
    let input = expression_input(10);
    c.bench_function("arithmetic 10 terms (no memoization)", |b| {
        b.iter(|| run_recognizer(black_box(&generator), &input))
    });
    let generator = Generator::new(ARITHMETIC).unwrap();
    c.bench_function("generate source", |b| {
        b.iter(|| black_box(&generator).generate_source())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
