// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashSet;

#[test]
fn snowflake_ids_strictly_increase() {
    let id_gen = SnowflakeIdGen::new(1).unwrap();
    let mut last = 0;
    for _ in 0..10_000 {
        let id = id_gen.next();
        assert!(id > last);
        last = id;
    }
}

#[test]
fn snowflake_ids_are_unique_across_threads() {
    let id_gen = SnowflakeIdGen::new(7).unwrap();
    let ids: Vec<u64> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let id_gen = id_gen.clone();
                s.spawn(move || (0..2_000).map(|_| id_gen.next()).collect::<Vec<_>>())
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn snowflake_embeds_node_and_recent_timestamp() {
    let id_gen = SnowflakeIdGen::new(5).unwrap();
    let id = id_gen.next();

    assert_eq!((id >> 12) & 0x3ff, 5);

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    let ts = timestamp_of(id);
    assert!(ts <= now_ms && now_ms - ts < 5_000);
}

#[test]
fn node_id_out_of_range_is_rejected() {
    assert!(SnowflakeIdGen::new(1023).is_ok());
    assert!(matches!(
        SnowflakeIdGen::new(1024),
        Err(ConfigError::Invalid { field: "node_id", .. })
    ));
}

#[test]
fn compose_round_trips_timestamp() {
    let ts = EPOCH_MS + 86_400_000;
    assert_eq!(timestamp_of(compose(ts, 3, 17)), ts);
}

#[test]
fn sequential_gen_is_shared_between_clones() {
    let a = SequentialIdGen::new();
    let b = a.clone();
    assert_eq!(a.next(), 1);
    assert_eq!(b.next(), 2);
    assert_eq!(a.next(), 3);
}
