use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wirespec::prelude::*;

fn bench_scope() -> Scope {
    let program = ProgramNode::new(vec![
        DefinitionNode::Enum(EnumNode::new("Status", vec![("OK", 0), ("DEGRADED", 1)])),
        DefinitionNode::Record(RecordNode::new(
            "Item",
            RecordNodeKind::Struct,
            vec![
                FieldNode::new(1, "id", TypeRefNode::I64).required(),
                FieldNode::new(2, "label", TypeRefNode::String),
                FieldNode::new(3, "status", TypeRefNode::named("Status")),
            ],
        )),
        DefinitionNode::Record(RecordNode::new(
            "Batch",
            RecordNodeKind::Struct,
            vec![
                FieldNode::new(1, "items", TypeRefNode::List(Box::new(TypeRefNode::named("Item")))),
                FieldNode::new(
                    2,
                    "scores",
                    TypeRefNode::Map(Box::new(TypeRefNode::String), Box::new(TypeRefNode::Double)),
                ),
            ],
        )),
    ]);
    let mut scope = Scope::new();
    compile_program(&mut scope, &program).unwrap();
    scope.link().unwrap();
    scope
}

fn bench_value(items: usize) -> Value {
    let items: Vec<Value> = (0..items)
        .map(|n| {
            Value::Record(
                RecordValue::new()
                    .with(1, Value::I64(n as i64))
                    .with(2, Value::from(format!("item-{n}").as_str()))
                    .with(3, Value::Enum("Status".to_owned(), (n % 2) as i32)),
            )
        })
        .collect();
    let scores = vec![
        (Value::from("p50"), Value::Double(0.8)),
        (Value::from("p99"), Value::Double(2.5)),
    ];
    Value::Record(
        RecordValue::new()
            .with(1, Value::List(items))
            .with(2, Value::Map(scores)),
    )
}

fn encode_bench(c: &mut Criterion) {
    let scope = bench_scope();
    let spec = scope.spec(scope.lookup_type("Batch").unwrap());
    let value = bench_value(64);

    c.bench_function("encode_batch_64", |b| {
        b.iter(|| black_box(dumps(&scope, spec, black_box(&value)).unwrap()))
    });
}

fn decode_bench(c: &mut Criterion) {
    let scope = bench_scope();
    let spec = scope.spec(scope.lookup_type("Batch").unwrap());
    let bytes = dumps(&scope, spec, &bench_value(64)).unwrap();

    c.bench_function("decode_batch_64", |b| {
        b.iter(|| black_box(loads(&scope, spec, black_box(&bytes)).unwrap()))
    });
}

fn compile_link_bench(c: &mut Criterion) {
    c.bench_function("compile_and_link", |b| b.iter(|| black_box(bench_scope())));
}

criterion_group!(benches, encode_bench, decode_bench, compile_link_bench);
criterion_main!(benches);
