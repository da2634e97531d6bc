use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use pace_limit::PermitsPerSecond;
use pace_limit::SmoothRate;
use pace_limit::Strategy;

// Reservations never sleep, so a huge rate keeps the slot close to `now`
// and we measure the CAS path rather than ever-growing waits.
const RATE: f64 = 1e9;

fn bench_single_strategy<S: Strategy>(group_name: &str, c: &mut Criterion, strategy: Arc<S>) {
    let mut group = c.benchmark_group(group_name);

    group.bench_function("unbounded", |b| {
        b.iter(|| {
            let _ = black_box(strategy.as_ref()).reserve(None);
        })
    });

    group.bench_function("bounded", |b| {
        b.iter(|| {
            let _ = black_box(strategy.as_ref()).reserve(Some(Duration::from_millis(1)));
        })
    });

    group.finish();
}

fn bench_parallel_strategy<S: Strategy + Send + Sync + 'static>(
    group_name: &str,
    c: &mut Criterion,
    strategy: Arc<S>,
) {
    let mut group = c.benchmark_group(group_name);

    for threads in [2, 4, 8].iter() {
        let num_threads = *threads;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-threads", num_threads)),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let barrier = Arc::new(Barrier::new(n + 1));
                    let mut handles = Vec::with_capacity(n);

                    for _ in 0..n {
                        let s = Arc::clone(&strategy);
                        let bar = Arc::clone(&barrier);
                        let iters_per_thread = iters / n as u64;

                        handles.push(thread::spawn(move || {
                            bar.wait(); // Wait for the start signal
                            for _ in 0..iters_per_thread {
                                let _ = black_box(s.reserve(None));
                            }
                        }));
                    }

                    // Synchronize the start across all threads
                    barrier.wait();
                    let start = Instant::now();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let rate = PermitsPerSecond::try_from(RATE).expect("valid bench rate");

    let smooth = Arc::new(SmoothRate::new(rate));
    bench_single_strategy("SmoothRate-Static", c, Arc::clone(&smooth));

    let smooth = Arc::new(SmoothRate::new(rate));
    bench_parallel_strategy("SmoothRate-Contended", c, smooth);

    // Overhead of going through Arc<dyn Strategy>
    let dynamic: Arc<dyn Strategy> = Arc::new(SmoothRate::new(rate));
    let mut group = c.benchmark_group("SmoothRate-Dynamic");
    group.bench_function("unbounded", |b| {
        b.iter(|| {
            let _ = black_box(dynamic.as_ref()).reserve(None);
        })
    });
    group.finish();
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
