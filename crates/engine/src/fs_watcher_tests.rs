// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sandbox_adapters::fs_watch::{FakeFsWatchAdapter, RawWatchEvent, RawWatchKind};

#[tokio::test]
async fn subscribe_maps_raw_events_to_watch_frames() {
    let adapter = Arc::new(FakeFsWatchAdapter::new(vec![RawWatchEvent {
        kind: RawWatchKind::Write,
        path: PathBuf::from("/tmp/project/src/main.rs"),
        is_dir: false,
    }]));
    let service = WatchService::new(adapter);

    let mut rx = service
        .subscribe(PathBuf::from("/tmp/project"), false, vec![])
        .expect("subscribe");

    let frame = rx.recv().await.expect("frame");
    assert_eq!(frame.name, "main.rs");
    assert_eq!(frame.path, "/tmp/project/src/main.rs");
}
