//! Property-based tests for full sweeps.

use std::sync::Arc;

use proptest::prelude::*;
use room_ttl::store::{MemoryStore, Ttl};
use room_ttl::{Config, RoomTtlRefresher};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // A sweep over N room records with batch hint B refreshes each room exactly
    // once, using one pipeline per non-empty page.
    #[test]
    fn prop_sweep_refreshes_each_room_once(
        room_count in 0usize..300,
        batch_size in 1usize..120,
        players_per_room in 0usize..3,
    ) {
        let rt = runtime();
        let store = Arc::new(MemoryStore::new());
        let config = Config { scan_batch_size: batch_size, ..Config::default() };
        let refresher = RoomTtlRefresher::new(store.clone(), &config);

        let (report, stats, unrefreshed) = rt.block_on(async {
            for i in 0..room_count {
                store.set(format!("Room:{}", i), "{}", None).await;
                for p in 0..players_per_room {
                    let player = format!("{}-{}", i, p);
                    store.sadd(&format!("Room:{}:Players", i), &[player.as_str()]).await.unwrap();
                }
            }

            let report = refresher.sweep().await;
            let stats = store.stats().await;

            let mut unrefreshed = Vec::new();
            for i in 0..room_count {
                let key = format!("Room:{}", i);
                if store.ttl(&key).await != Some(Ttl::Expires(10_800)) {
                    unrefreshed.push(key);
                }
            }
            (report, stats, unrefreshed)
        });

        prop_assert!(report.is_complete());
        prop_assert_eq!(report.rooms_refreshed, room_count);
        prop_assert!(unrefreshed.is_empty(), "not refreshed: {:?}", unrefreshed);
        prop_assert_eq!(stats.commands as usize, room_count * 4);
        prop_assert!(stats.pipelines as usize <= report.pages);
        prop_assert!(report.pages <= report.scans);
    }
}
