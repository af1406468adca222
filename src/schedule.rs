// loadtone -- plays system load as an audible tone
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Keeps the refresh loop on a fixed wall-clock cadence.

use std::time::{Duration, Instant};

use log::warn;

/// Source of monotonic time and sleeps, factored out so the scheduler can be
/// driven by a fake clock in tests.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// The real monotonic clock.
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Tracks the instant the next cycle is due and sleeps until then.
///
/// The deadline advances by a fixed interval every cycle, independently of
/// how long the cycle's work took, so the cadence does not drift. When a
/// cycle overruns its interval the scheduler resynchronizes to "now" instead
/// of accumulating a backlog of overdue cycles.
pub struct Scheduler<C = MonotonicClock> {
    clock: C,
    interval: Duration,
    deadline: Instant,
}

impl Scheduler<MonotonicClock> {
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, MonotonicClock)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(interval: Duration, clock: C) -> Self {
        let deadline = clock.now();
        Scheduler {
            clock,
            interval,
            deadline,
        }
    }

    /// Advance the deadline by one interval and sleep until it is reached.
    ///
    /// If the deadline already passed, does not sleep at all; the lag is
    /// reported and returned, and the next cycle is measured from "now".
    pub fn advance_and_wait(&mut self) -> Option<Duration> {
        let target = self.deadline + self.interval;
        let now = self.clock.now();
        if target <= now {
            let lag = now - target;
            self.deadline = now;
            warn!("lagged {:.9} seconds behind the audio cadence", lag.as_secs_f64());
            Some(lag)
        } else {
            self.clock.sleep(target - now);
            self.deadline = target;
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeClockState {
        now: Instant,
        slept: Vec<Duration>,
    }

    #[derive(Clone)]
    struct FakeClock(Rc<RefCell<FakeClockState>>);

    impl FakeClock {
        fn new() -> Self {
            FakeClock(Rc::new(RefCell::new(FakeClockState {
                now: Instant::now(),
                slept: Vec::new(),
            })))
        }

        /// Simulate time passing while the cycle does its work.
        fn work(&self, duration: Duration) {
            self.0.borrow_mut().now += duration;
        }

        fn slept(&self) -> Vec<Duration> {
            self.0.borrow().slept.clone()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.0.borrow().now
        }

        fn sleep(&self, duration: Duration) {
            let mut state = self.0.borrow_mut();
            state.now += duration;
            state.slept.push(duration);
        }
    }

    #[test]
    fn sleeps_out_the_rest_of_the_interval() {
        let clock = FakeClock::new();
        let mut scheduler = Scheduler::with_clock(Duration::from_millis(100), clock.clone());

        clock.work(Duration::from_millis(30));
        assert_eq!(scheduler.advance_and_wait(), None);
        assert_eq!(clock.slept(), vec![Duration::from_millis(70)]);
    }

    #[test]
    fn cadence_does_not_drift_across_cycles() {
        let clock = FakeClock::new();
        let start = clock.now();
        let mut scheduler = Scheduler::with_clock(Duration::from_millis(100), clock.clone());

        for _ in 0..5 {
            clock.work(Duration::from_millis(30));
            assert_eq!(scheduler.advance_and_wait(), None);
        }
        // five full intervals, regardless of the work inside each
        assert_eq!(clock.now() - start, Duration::from_millis(500));
    }

    #[test]
    fn overrun_skips_the_sleep_and_resynchronizes() {
        let clock = FakeClock::new();
        let mut scheduler = Scheduler::with_clock(Duration::from_millis(100), clock.clone());

        clock.work(Duration::from_millis(150));
        assert_eq!(scheduler.advance_and_wait(), Some(Duration::from_millis(50)));
        assert_eq!(clock.slept(), Vec::<Duration>::new());

        // the next cycle is measured from the resynchronized deadline,
        // not burst through to catch up
        clock.work(Duration::from_millis(30));
        assert_eq!(scheduler.advance_and_wait(), None);
        assert_eq!(clock.slept(), vec![Duration::from_millis(70)]);
    }

    #[test]
    fn duration_arithmetic_keeps_subseconds_normalized() {
        // Duration carries seconds + nanoseconds; repeated accumulation of an
        // awkward interval must never leave the nanosecond part >= 1s.
        let step = Duration::from_nanos(999_999_999);
        let mut total = Duration::new(0, 0);
        for _ in 0..1000 {
            total += step;
            assert!(total.subsec_nanos() < 1_000_000_000);
        }
        assert_eq!(total, Duration::from_nanos(999_999_999_000));
    }
}
