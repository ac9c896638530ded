use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use vizij_scm_core::{Sampler, SamplerConfig, Scm};

/// A layered model: `width` roots feeding `depth` layers of additive nodes.
fn layered_scm(width: usize, depth: usize) -> Scm {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut equations = serde_json::Map::new();
    let mut noise = serde_json::Map::new();

    for layer in 0..=depth {
        for i in 0..width {
            let id = format!("n{layer}_{i}");
            noise.insert(id.clone(), json!("N(0, 1)"));
            if layer > 0 {
                let left = format!("n{}_{}", layer - 1, i);
                let right = format!("n{}_{}", layer - 1, (i + 1) % width);
                edges.push(json!([left.clone(), id.clone()]));
                if right != left {
                    edges.push(json!([right.clone(), id.clone()]));
                    equations.insert(
                        id.clone(),
                        json!(format!("lambda {left}, {right}: 0.5 * {left} + np.tanh({right})")),
                    );
                } else {
                    equations.insert(id.clone(), json!(format!("lambda {left}: 0.5 * {left}")));
                }
            }
            nodes.push(id);
        }
    }

    let spec = json!({
        "nodes": nodes,
        "edges": edges,
        "equations": equations,
        "noise": noise,
    });
    Scm::from_json(&spec.to_string()).expect("benchmark scm should load")
}

fn bench_sampling(c: &mut Criterion) {
    let scm = layered_scm(8, 6);
    let mut group = c.benchmark_group("scm_sampling");
    for &n in &[100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("observational", n), &n, |b, &n| {
            let mut sampler = Sampler::new(&SamplerConfig::seeded(42));
            b.iter(|| black_box(sampler.sample_observational(&scm, n).expect("sample")));
        });
        let interventions = json!({ "n0_0": 1.0, "n3_4": { "value": -1.0 }, "n5_2": {} });
        group.bench_with_input(BenchmarkId::new("interventional", n), &n, |b, &n| {
            let mut sampler = Sampler::new(&SamplerConfig::seeded(42));
            b.iter(|| {
                black_box(
                    sampler
                        .sample_interventional(&scm, n, &interventions)
                        .expect("sample"),
                )
            });
        });
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    c.bench_function("scm_load_8x6", |b| b.iter(|| black_box(layered_scm(8, 6))));
}

criterion_group!(benches, bench_sampling, bench_load);
criterion_main!(benches);
