// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_advances_and_is_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let start = clock1.now();

    clock2.advance(Duration::from_secs(30));

    assert_eq!(clock1.now() - start, Duration::from_secs(30));
}
