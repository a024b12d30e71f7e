use criterion::{criterion_group, criterion_main, Criterion};
use ctxpack::{ContextEngine, ContextRequest, EngineConfig, MemorySource, Outcome};
use std::hint::black_box;

fn synthetic_repo(modules: usize) -> MemorySource {
    let mut source = MemorySource::new("/bench");
    for i in 0..modules {
        let import = if i > 0 {
            format!("from pkg.module{} import handler{}\n\n", i - 1, i - 1)
        } else {
            String::new()
        };
        source.insert(
            &format!("pkg/module{i}.py"),
            &format!(
                "{import}def handler{i}(request):\n    user = authenticate(request.token)\n    \
                 return render_invoice(user, {i})\n"
            ),
        );
    }
    source
}

fn bench_build_profile(c: &mut Criterion) {
    let engine = ContextEngine::new(EngineConfig::default());
    engine.index(&synthetic_repo(200)).unwrap();

    c.bench_function("build_profile_200_modules", |b| {
        b.iter(|| {
            engine
                .build(
                    "bench",
                    ContextRequest::new(black_box("fix invoice rendering bug in module42.py"))
                        .with_budget(2000)
                        .discarding_current(),
                )
                .unwrap()
        });
    });
}

fn bench_switch_and_resume(c: &mut Criterion) {
    let engine = ContextEngine::new(EngineConfig::default());
    engine.index(&synthetic_repo(100)).unwrap();
    engine
        .build("bench", ContextRequest::new("fix invoice rendering bug"))
        .unwrap();

    c.bench_function("switch_and_resume_100_modules", |b| {
        b.iter(|| {
            let switched = engine
                .switch_to("bench", ContextRequest::new(black_box("add token refresh feature")))
                .unwrap();
            let id = switched.suspended.unwrap();
            engine.resume("bench", &id).unwrap()
        });
    });
}

fn bench_learn(c: &mut Criterion) {
    let engine = ContextEngine::new(EngineConfig::default());
    engine.index(&synthetic_repo(100)).unwrap();
    let accessed: Vec<String> = (0..5).map(|i| format!("pkg/module{i}.py")).collect();

    c.bench_function("finish_session_inline_learning", |b| {
        b.iter(|| {
            engine
                .build("bench", ContextRequest::new("fix invoice rendering bug"))
                .unwrap();
            engine
                .finish_session("bench", accessed.clone(), Outcome::Completed, Some(4))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_build_profile, bench_switch_and_resume, bench_learn);
criterion_main!(benches);
