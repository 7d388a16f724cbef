//! Sample clock pacing tests

use ltc_node::clock::{Pacer, SampleClock, Tick};
use ltc_node::hal::StepTimer;

#[test]
fn test_no_drift_at_48k() {
    let timer = StepTimer::new(1);
    let mut clock = SampleClock::for_sample_rate(timer.clone(), 48_000);
    clock.start();
    let origin = clock.deadline_us().unwrap();

    for seconds in 1..=3u64 {
        for i in 0..48_000u64 {
            // Processing jitter well inside one period.
            timer.advance(i % 7);
            assert_eq!(clock.tick(), Tick::OnTime);
        }
        assert_eq!(clock.deadline_us().unwrap() - origin, seconds * 1_000_000);
    }
    // Real elapsed time tracks the grid within one period.
    let elapsed = timer.peek() - origin;
    assert!(elapsed >= 3_000_000 && elapsed < 3_000_000 + 21, "elapsed {}", elapsed);
}

#[test]
fn test_integer_period_exact() {
    let timer = StepTimer::new(3);
    let mut clock = SampleClock::with_period_us(timer.clone(), 20);
    clock.start();
    let origin = clock.deadline_us().unwrap();
    for _ in 0..10_000 {
        clock.tick();
    }
    assert_eq!(clock.deadline_us().unwrap() - origin, 200_000);
}

#[test]
fn test_overrun_skips_without_burst() {
    let timer = StepTimer::new(1);
    let mut clock = SampleClock::with_period_us(timer.clone(), 20);
    clock.start();
    assert_eq!(clock.deadline_us(), Some(0));

    assert_eq!(clock.tick(), Tick::OnTime);
    assert_eq!(clock.deadline_us(), Some(20));

    // Stall for five periods.
    timer.advance(100);
    assert_eq!(clock.tick(), Tick::Overrun { missed: 4 });
    assert_eq!(clock.deadline_us(), Some(120));
    assert_eq!(clock.overruns(), 1);

    // Back on the original phase grid, waiting again.
    assert_eq!(clock.tick(), Tick::OnTime);
    assert_eq!(clock.deadline_us(), Some(140));
}

#[test]
fn test_late_tick_returns_immediately() {
    let timer = StepTimer::new(1);
    let mut clock = SampleClock::with_period_us(timer.clone(), 20);
    clock.start();
    clock.tick();

    timer.advance(25);
    let before = timer.peek();
    assert_eq!(clock.tick(), Tick::Late);
    // One read only: no spinning.
    assert_eq!(timer.peek(), before + 1);
    assert_eq!(clock.deadline_us(), Some(40));
}

#[test]
fn test_reset_reanchors() {
    let timer = StepTimer::new(1);
    let mut clock = SampleClock::with_period_us(timer.clone(), 20);
    clock.start();
    clock.tick();
    clock.reset();
    assert_eq!(clock.deadline_us(), None);

    timer.advance(1000);
    assert_eq!(clock.tick(), Tick::OnTime);
    // Anchored at the first read after the reset (1021).
    assert_eq!(clock.deadline_us(), Some(1041));
}

#[test]
fn test_overruns_at_48k_stay_on_grid() {
    let timer = StepTimer::new(1);
    let mut clock = SampleClock::for_sample_rate(timer.clone(), 48_000);
    clock.start();
    let origin = clock.deadline_us().unwrap();

    let mut slots = 0u64;
    for _ in 0..200 {
        timer.advance(1000);
        match clock.tick() {
            Tick::Overrun { missed } => slots += 1 + u64::from(missed),
            other => panic!("expected an overrun, got {:?}", other),
        }
    }
    assert_eq!(clock.overruns(), 200);

    // Every slot accounted for, and the deadline is exactly slot `slots`
    // of the 48 kHz grid.
    let deadline = clock.deadline_us().unwrap();
    assert_eq!(deadline - origin, slots * 1_000_000 / 48_000);
    assert!(deadline <= timer.peek());
}

#[test]
fn test_fractional_period_overrun_threshold() {
    // Frozen timer: every tick below sees exactly the time set here.
    let timer = StepTimer::new(0);
    let mut clock = SampleClock::for_sample_rate(timer.clone(), 48_000);
    clock.start();

    // Grid: 0, 20, 41, 62, 83, 104, ...
    timer.advance(40);
    assert_eq!(clock.tick(), Tick::Late);
    assert_eq!(clock.deadline_us(), Some(20));

    timer.advance(1);
    assert_eq!(clock.tick(), Tick::Late);
    assert_eq!(clock.deadline_us(), Some(41));

    // 21 µs late is still less than one 20.833 µs period.
    timer.advance(21);
    assert_eq!(clock.tick(), Tick::Late);
    assert_eq!(clock.deadline_us(), Some(62));
    assert_eq!(clock.overruns(), 0);

    timer.advance(42);
    assert_eq!(clock.tick(), Tick::Overrun { missed: 1 });
    assert_eq!(clock.deadline_us(), Some(104));
}
