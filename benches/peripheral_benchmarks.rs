use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pi_peripherals::matrix::rotate_bitmap;
use pi_peripherals::{
    DigitalState, HardwareContext, MatrixDirection, MatrixSymbol, MockContext, PeripheralConfig,
    PeripheralService,
};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const TOUCH_PIN: u8 = 11;

/// Benchmark bitmap rotation for every direction
fn bench_bitmap_rotation(c: &mut Criterion) {
    let bitmap = MatrixSymbol::ArrowUp.bitmap();
    let mut group = c.benchmark_group("bitmap_rotation");

    for direction in MatrixDirection::ALL {
        group.bench_with_input(
            BenchmarkId::from_parameter(direction),
            &direction,
            |b, &direction| b.iter(|| rotate_bitmap(black_box(&bitmap), direction)),
        );
    }

    group.finish();
}

/// Benchmark touch event fan-out with different listener counts
fn bench_touch_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("touch_fan_out");

    for listeners in [1usize, 10, 100] {
        let mock = Arc::new(MockContext::new());
        let context: Arc<dyn HardwareContext> = Arc::clone(&mock) as Arc<dyn HardwareContext>;
        // Every iteration is an accepted edge
        let config = PeripheralConfig::default().with_touch_debounce_us(0);
        let service = PeripheralService::new(context, config);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..listeners {
            let calls = Arc::clone(&calls);
            service.add_button_listener(move |_: DigitalState| {
                calls.fetch_add(1, Ordering::Relaxed);
            });
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(listeners),
            &listeners,
            |b, _| b.iter(|| mock.trigger_input(TOUCH_PIN, black_box(DigitalState::Low))),
        );
    }

    group.finish();
}

/// Benchmark matrix updates through the emulated MAX7219
fn bench_matrix_updates(c: &mut Criterion) {
    let context: Arc<dyn HardwareContext> = Arc::new(MockContext::new());
    let service = PeripheralService::new(context, PeripheralConfig::default());

    c.bench_function("matrix_print", |b| {
        b.iter(|| service.led_matrix_print(black_box(MatrixSymbol::Heart)))
    });

    c.bench_function("matrix_rotate", |b| {
        b.iter(|| service.led_matrix_rotate(black_box(MatrixDirection::Left)))
    });
}

/// Benchmark JSON serialization of the peripheral status
fn bench_status_serialization(c: &mut Criterion) {
    let context: Arc<dyn HardwareContext> = Arc::new(MockContext::new());
    let service = PeripheralService::new(context, PeripheralConfig::default());
    let status = service.status();

    c.bench_function("status_serialization", |b| {
        b.iter(|| serde_json::to_string(black_box(&status)).expect("Should serialize"))
    });
}

criterion_group!(
    benches,
    bench_bitmap_rotation,
    bench_touch_fan_out,
    bench_matrix_updates,
    bench_status_serialization
);
criterion_main!(benches);
