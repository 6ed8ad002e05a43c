use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lexi::{parse, tokenize, Lexi};

const PROGRAM: &str = r#"
{
    // Sum of squares with a loop and a helper function
    fun square(x) : x * x;
    var i : 0;
    var total : 0;
    while i < 100 : {
        var total : total + (square -> (i));
        var i : i + 1
    }[];
    total
}!
"#;

fn lexer_benchmark(c: &mut Criterion) {
    c.bench_function("tokenize program", |b| {
        b.iter(|| tokenize("<bench>", black_box(PROGRAM)).unwrap())
    });
}

fn parser_benchmark(c: &mut Criterion) {
    let tokens = tokenize("<bench>", PROGRAM).unwrap();
    c.bench_function("parse program", |b| {
        b.iter(|| parse(black_box(tokens.clone())).unwrap())
    });
}

fn execution_benchmark(c: &mut Criterion) {
    let lexi = Lexi::new();
    c.bench_function("run loop with calls", |b| {
        b.iter(|| lexi.run("<bench>", black_box(PROGRAM)).unwrap())
    });

    c.bench_function("recursive fibonacci", |b| {
        b.iter(|| {
            lexi.run(
                "<bench>",
                black_box("{fun fib(n) : if n < 2 : n else : (fib -> (n - 1)) + (fib -> (n - 2)); fib -> (15)}!"),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, lexer_benchmark, parser_benchmark, execution_benchmark);
criterion_main!(benches);
