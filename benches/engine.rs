use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hermes::schema::{flatten, resolve, Catalog, Synthesizer, ValidationModel};
use serde_json::{json, Value};

fn document() -> Value {
    json!({
        "components": { "schemas": {
            "Order": {
                "type": "object",
                "required": ["id", "lines"],
                "properties": {
                    "id": { "type": "string", "format": "uuid" },
                    "customer": { "$ref": "#/components/schemas/Customer" },
                    "lines": {
                        "type": "array",
                        "minItems": 1,
                        "maxItems": 20,
                        "items": { "$ref": "#/components/schemas/Line" }
                    }
                }
            },
            "Customer": {
                "type": "object",
                "properties": {
                    "email": { "type": "string", "format": "email" },
                    "iban": { "type": "string", "format": "iban" },
                    "referrer": { "$ref": "#/components/schemas/Customer" }
                }
            },
            "Line": {
                "type": "object",
                "properties": {
                    "sku": { "type": "string", "pattern": "^[A-Z]{3}-[0-9]{4}$" },
                    "quantity": { "type": "integer", "minimum": 1, "maximum": 99 },
                    "price": { "type": "number", "minimum": 0, "maximum": 1000, "multipleOf": 0.05 }
                }
            }
        } }
    })
}

fn benchmark_resolve(c: &mut Criterion) {
    let catalog = Catalog::from_document(&document());
    let root = json!({ "$ref": "#/components/schemas/Order" });

    c.bench_function("resolve_order", |b| {
        b.iter(|| resolve(black_box(&root), &catalog).unwrap());
    });
}

fn benchmark_synthesize(c: &mut Criterion) {
    let catalog = Catalog::from_document(&document());
    let node = resolve(&json!({ "$ref": "#/components/schemas/Order" }), &catalog).unwrap();
    let mut synthesizer = Synthesizer::seeded(7);

    c.bench_function("synthesize_order", |b| {
        b.iter(|| synthesizer.synthesize(black_box(&node)).unwrap());
    });
}

fn benchmark_validate(c: &mut Criterion) {
    let catalog = Catalog::from_document(&document());
    let node = resolve(&json!({ "$ref": "#/components/schemas/Order" }), &catalog).unwrap();
    let model = ValidationModel::from_node(&node);
    let payload = Synthesizer::seeded(7).synthesize(&node).unwrap();

    c.bench_function("validate_order", |b| {
        b.iter(|| model.validate(black_box(&payload)).unwrap());
    });
}

fn benchmark_flatten(c: &mut Criterion) {
    let catalog = Catalog::from_document(&document());
    let root = json!({ "$ref": "#/components/schemas/Order" });

    c.bench_function("flatten_order", |b| {
        b.iter(|| flatten(black_box(&root), &catalog, "JSON Message Body").unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_resolve,
    benchmark_synthesize,
    benchmark_validate,
    benchmark_flatten
);
criterion_main!(benches);
