// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic view-sync usage example.
//!
//! Demonstrates:
//! 1. Building a small component tree (page → counter, list)
//! 2. Full sync into an in-memory host
//! 3. A burst of incremental updates coalesced by the throttle
//! 4. A destroyed component being skipped
//! 5. Displaying metrics
//!
//! # Run
//!
//! ```bash
//! RUST_LOG=view_sync=debug cargo run --example basic_usage
//! ```

use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use view_sync::{ComponentArena, Host, MemoryHost, StateSource, SyncConfig, ViewSync};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║             view-sync: Basic Usage Example                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Build the tree
    // ─────────────────────────────────────────────────────────────────────────
    println!("🌳 Building component tree...");
    let mut tree = ComponentArena::new();
    let page = tree.insert_root(Some("0"))?;
    let counter = tree.insert_child(page, "1")?;
    let list = tree.insert_child(page, "2")?;
    tree.set_field(page, StateSource::State, "title", json!("Home"))?;
    tree.set_field(counter, StateSource::State, "count", json!(0))?;
    tree.set_field(counter, StateSource::Inputs, "step", json!(1))?;
    tree.set_field(list, StateSource::State, "items", json!(["a", "b", "c"]))?;
    println!("   └─ {} components", tree.len());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Full sync
    // ─────────────────────────────────────────────────────────────────────────
    let config = SyncConfig {
        throttle_ms: 50,
        ..Default::default()
    };
    let host = Arc::new(MemoryHost::new());
    let sync = ViewSync::new(config, host.clone())?;

    println!("\n🚀 init_sync(page)...");
    let outcome = sync.init_sync(&tree, page)?;
    println!("   └─ {outcome}");
    println!("   └─ host state: {}", serde_json::to_string_pretty(&host.state())?);

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Burst of updates
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n⚡ Ten counter updates, 5ms apart...");
    for count in 1..=10 {
        tree.set_field(counter, StateSource::State, "count", json!(count))?;
        let outcome = sync.update_sync(&tree, counter)?;
        println!("   └─ count={count:<2} → {outcome}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tree.set_field(list, StateSource::State, "items", json!(["a", "z", "c"]))?;
    println!("   └─ list[1]=z → {}", sync.update_sync(&tree, list)?);

    tokio::time::sleep(Duration::from_millis(60)).await;
    println!("\n📦 Patches applied by the host:");
    for (i, patch) in host.applied().iter().enumerate() {
        println!("   └─ #{i}: {}", serde_json::to_string(patch)?);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Destroyed components
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🗑️  Destroying the list...");
    tree.destroy(list)?;
    tree.set_field(list, StateSource::State, "items", json!([]))?;
    println!("   └─ update_sync(list) → {}", sync.update_sync(&tree, list)?);

    sync.flush()?;

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Raw Metrics:");
    dump_metrics(&snapshotter);

    println!("\n✅ Done.");
    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let mut lines: Vec<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, value)| {
            let (_, key) = composite_key.into_parts();
            let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
            let label_str = if labels.is_empty() {
                String::new()
            } else {
                format!("{{{}}}", labels.join(","))
            };
            let rendered = match value {
                DebugValue::Counter(v) => v.to_string(),
                DebugValue::Gauge(v) => format!("{:.2}", v.into_inner()),
                DebugValue::Histogram(samples) => {
                    let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                    format!("count={} sum={sum:.4}", samples.len())
                }
            };
            format!("{}{label_str} = {rendered}", key.name())
        })
        .collect();
    lines.sort();

    if lines.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
    for line in lines {
        println!("   └─ {line}");
    }
}
