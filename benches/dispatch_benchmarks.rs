//! Performance benchmarks for calls through bound native callables.
//!
//! This benchmark suite measures the per-call cost of the trampolines:
//! - Arity: class methods taking 0 to 12 arguments
//! - Receivers: shared and exclusive instance methods
//! - Construction: `new` through a bound constructor, including finalization
//! - Coercion: lenient vs strict argument conversion
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect per-trampoline timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use bindery::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
use std::collections::HashMap;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

/// Initialize puffin profiler.
#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// Print accumulated top-level scope timings across all recorded frames.
#[cfg(feature = "profile-with-puffin")]
fn print_profiling_stats() {
    use puffin::Reader;

    let Some(frame_view) = FRAME_VIEW.get() else {
        println!("Profiler not initialized");
        return;
    };

    let view = frame_view.lock();
    let scope_collection = view.scope_collection();

    let mut scope_timings: HashMap<String, i64> = HashMap::new();
    let mut frame_count = 0i64;

    for frame in view.recent_frames() {
        frame_count += 1;
        let Ok(unpacked) = frame.unpacked() else {
            continue;
        };
        for (_thread_info, stream_info) in unpacked.thread_streams.iter() {
            let reader = Reader::from_start(&stream_info.stream);
            let Ok(scopes) = reader.read_top_scopes() else {
                continue;
            };
            for scope in scopes {
                if let Some(details) = scope_collection.fetch_by_id(&scope.id) {
                    *scope_timings.entry(details.name().to_string()).or_insert(0) +=
                        scope.record.duration_ns;
                }
            }
        }
    }

    println!("\n=== Profiling Summary ({} frames) ===", frame_count);
    let mut entries: Vec<_> = scope_timings.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    for (name, ns) in entries {
        let avg_ns = if frame_count > 0 { ns / frame_count } else { ns };
        println!(
            "  {:30} {:>10.2?} avg",
            name,
            std::time::Duration::from_nanos(avg_ns as u64)
        );
    }
    println!("=====================================\n");
}

#[cfg(not(feature = "profile-with-puffin"))]
fn print_profiling_stats() {}

#[derive(NativeType)]
struct Accumulator {
    total: f64,
}

fn runtime(options: BinderOptions) -> Vm {
    let mut vm = Vm::new();
    let mut binder = Binder::with_options(&mut vm, options);
    binder
        .bind_class("Accumulator", |start: f64| Accumulator { total: start })
        .unwrap()
        .bind("total", |acc: &Accumulator| acc.total)
        .unwrap()
        .bind("add", |acc: &mut Accumulator, v: f64| acc.total += v)
        .unwrap()
        .bind("chain", |acc: &mut Accumulator, v: f64| {
            acc.total += v;
            Receiver
        })
        .unwrap();
    binder
        .bind_module("Math")
        .unwrap()
        .bind("zero", || 0i64)
        .unwrap()
        .bind("one", |a: i64| a)
        .unwrap()
        .bind("three", |a: i64, b: i64, c: i64| a + b + c)
        .unwrap()
        .bind("six", |a: i32, b: i32, c: i32, d: f64, e: f64, f: f64| {
            f64::from(a + b + c) + d + e + f
        })
        .unwrap()
        .bind(
            "twelve",
            |a: i64, b: i64, c: i64, d: i64, e: i64, f: i64, g: i64, h: i64, i: i64, j: i64, k: i64, l: i64| {
                a + b + c + d + e + f + g + h + i + j + k + l
            },
        )
        .unwrap()
        .bind("concat", |a: String, b: String| a + &b)
        .unwrap();
    vm
}

/// Benchmark class method calls across arities.
fn arity_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let vm = runtime(BinderOptions::default());
    let math = vm.class_value("Math").unwrap();

    let mut group = c.benchmark_group("dispatch/arity");
    for (name, arity) in [("zero", 0usize), ("one", 1), ("three", 3), ("twelve", 12)] {
        let args: Vec<Value> = (0..arity as i64).map(Value::Int).collect();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(arity), &args, |b, args| {
            b.iter(|| {
                let result = vm.call(&math, name, black_box(args)).unwrap();
                end_profiling_frame();
                black_box(result)
            });
        });
    }
    group.finish();

    print_profiling_stats();
}

/// Benchmark instance method calls through shared and exclusive receivers.
fn receiver_benchmarks(c: &mut Criterion) {
    let vm = runtime(BinderOptions::default());
    let class = vm.class_value("Accumulator").unwrap();
    let acc = vm.call(&class, "new", &[Value::Float(0.0)]).unwrap();
    let step = [Value::Float(1.0)];

    let mut group = c.benchmark_group("dispatch/receiver");
    group.bench_function("shared", |b| {
        b.iter(|| black_box(vm.call(&acc, "total", &[]).unwrap()));
    });
    group.bench_function("exclusive", |b| {
        b.iter(|| black_box(vm.call(&acc, "add", black_box(&step)).unwrap()));
    });
    group.bench_function("chained_receiver", |b| {
        b.iter(|| black_box(vm.call(&acc, "chain", black_box(&step)).unwrap()));
    });
    group.finish();
}

/// Benchmark object construction and finalization.
fn construction_benchmarks(c: &mut Criterion) {
    let vm = runtime(BinderOptions::default());
    let class = vm.class_value("Accumulator").unwrap();
    let args = [Value::Float(1.5)];

    let mut group = c.benchmark_group("dispatch/construction");
    group.bench_function("new_and_drop", |b| {
        b.iter(|| {
            let obj = vm.call(&class, "new", black_box(&args)).unwrap();
            end_profiling_frame();
            black_box(obj)
        });
    });
    group.bench_function("arity_error", |b| {
        b.iter(|| black_box(vm.call(&class, "new", &[]).unwrap_err()));
    });
    group.finish();
}

/// Benchmark lenient vs strict conversion of the same arguments.
fn coercion_benchmarks(c: &mut Criterion) {
    let args = [
        Value::Int(1),
        Value::Int(2),
        Value::Int(3),
        Value::Float(0.5),
        Value::Float(1.5),
        Value::Float(2.5),
    ];
    let text = [Value::str("native "), Value::str("binding")];

    let mut group = c.benchmark_group("dispatch/coercion");
    for (label, options) in [
        ("lenient", BinderOptions::default()),
        ("strict", BinderOptions::strict()),
    ] {
        let vm = runtime(options);
        let math = vm.class_value("Math").unwrap();
        group.bench_function(BenchmarkId::new("six_numeric", label), |b| {
            b.iter(|| black_box(vm.call(&math, "six", black_box(&args)).unwrap()));
        });
        group.bench_function(BenchmarkId::new("concat", label), |b| {
            b.iter(|| black_box(vm.call(&math, "concat", black_box(&text)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    arity_benchmarks,
    receiver_benchmarks,
    construction_benchmarks,
    coercion_benchmarks
);

criterion_main!(benches);
