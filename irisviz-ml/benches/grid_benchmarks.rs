use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use irisviz_ml::algorithms::{Classifier, get_models};
use irisviz_ml::data::get_data;
use irisviz_ml::grid::{EvalMode, evaluate, make_grid};

fn bench_make_grid(c: &mut Criterion) {
    let two_d = get_data(2, false).unwrap();
    let three_d = get_data(3, false).unwrap();

    c.bench_function("make_grid_2d_res100", |b| {
        b.iter(|| make_grid(black_box(two_d.features.view()), 100, 1.0).unwrap())
    });

    c.bench_function("make_grid_3d_res25", |b| {
        b.iter(|| make_grid(black_box(three_d.features.view()), 25, 0.5).unwrap())
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let data = get_data(3, false).unwrap();
    let grid = make_grid(data.features.view(), 20, 0.5).unwrap();

    let mut group = c.benchmark_group("evaluate_3d_res20");
    for mut model in get_models() {
        model.fit(data.features.view(), data.labels.view()).unwrap();
        group.bench_with_input(
            BenchmarkId::new("probability", model.name()),
            &model,
            |b, m| b.iter(|| evaluate(m, black_box(grid.points()), EvalMode::Probability).unwrap()),
        );
        group.bench_with_input(BenchmarkId::new("class", model.name()), &model, |b, m| {
            b.iter(|| evaluate(m, black_box(grid.points()), EvalMode::Class).unwrap())
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let data = get_data(2, false).unwrap();
    let mut group = c.benchmark_group("fit_2d");
    group.sample_size(10);
    for model in get_models() {
        let name = model.name().to_string();
        let algorithm = model.algorithm().clone();
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut m = irisviz_ml::Pipeline::new(algorithm.clone());
                m.fit(black_box(data.features.view()), data.labels.view()).unwrap();
                m
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_make_grid, bench_evaluate, bench_fit);
criterion_main!(benches);
