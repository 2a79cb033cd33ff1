use conduit::ast::BinaryOperator;
use conduit::eval::operators::OperatorTable;
use conduit::parser::parse_expression;
use conduit::Value;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_operators(c: &mut Criterion) {
    let table = OperatorTable::standard();
    let left = Value::Integer(40);
    let right = Value::Float(2.5);
    c.bench_function("apply int * float", |b| {
        b.iter(|| table.apply(BinaryOperator::Multiply, black_box(&left), black_box(&right)))
    });
}

fn bench_parser(c: &mut Criterion) {
    let source = "lang.string:length(\"abc\") * 2 + 3 < 10 && x != 4";
    c.bench_function("parse expression", |b| {
        b.iter(|| parse_expression(black_box(source), "bench.bal"))
    });
}

// ベンチマークグループの定義
criterion_group!(benches, bench_operators, bench_parser);
criterion_main!(benches);
