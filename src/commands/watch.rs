use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::error;

use kubedeck_k8s::{ApiError, ResourceCatalog, Session};
use kubedeck_metrics::Aggregation;
use kubedeck_types::NodeSnapshot;

const REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Caller-owned rendering handle for one node, keyed by node name and
/// updated in place across refresh ticks.
struct NodePanel {
    snapshot: NodeSnapshot,
    refreshes: u64,
}

/// Re-fetches nodes, usage and pods on a fixed tick and repaints the
/// per-node panels until interrupted.
///
/// The fetch runs inline in the tick loop and missed ticks are delayed, so
/// two refresh cycles never interleave their requests on the shared client.
pub async fn watch(session: &Session) -> Result<()> {
    let catalog = ResourceCatalog::new(session);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let mut panels: HashMap<String, NodePanel> = HashMap::new();
    let mut ticker = time::interval(REFRESH_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match refresh(&catalog).await {
                    Ok(aggregation) => render(&mut panels, aggregation),
                    Err(err) => error!("refresh failed: {err}"),
                }
            }
        }
    }

    Ok(())
}

/// One fetch-and-aggregate cycle; the three feeds load concurrently but the
/// cycle completes before the next can start.
async fn refresh(catalog: &ResourceCatalog<'_>) -> Result<Aggregation, ApiError> {
    let (nodes, usages, pods) = tokio::try_join!(
        catalog.list_nodes(),
        catalog.list_node_usages(),
        catalog.list_pods(None),
    )?;

    Ok(kubedeck_metrics::aggregate(&nodes, &usages, &pods))
}

/// Updates the per-node panels in place, drops panels for vanished nodes
/// and repaints.
fn render(panels: &mut HashMap<String, NodePanel>, aggregation: Aggregation) {
    let Aggregation {
        snapshots,
        unmatched,
    } = aggregation;

    let current: Vec<String> = snapshots
        .iter()
        .map(|snapshot| snapshot.node_name.clone())
        .collect();

    for snapshot in snapshots {
        panels
            .entry(snapshot.node_name.clone())
            .and_modify(|panel| {
                panel.snapshot = snapshot.clone();
                panel.refreshes += 1;
            })
            .or_insert(NodePanel {
                snapshot,
                refreshes: 1,
            });
    }
    panels.retain(|name, _| current.iter().any(|current_name| current_name == name));

    println!();
    println!("== {} ==", chrono::Local::now().format("%H:%M:%S"));
    let mut names: Vec<&String> = panels.keys().collect();
    names.sort();
    for name in names {
        print_panel(&panels[name]);
    }

    for name in unmatched {
        println!("NODE {name}: usage reported but no capacity entry, panel skipped");
    }
}

fn print_panel(panel: &NodePanel) {
    let snapshot = &panel.snapshot;
    println!(
        "NODE {:<24} {:<9} cpu {:>3}%  mem {:>3}%  running {:<3} succeeded {:<3} ip {:<16} kubelet {:<12} created {} (refresh #{})",
        snapshot.node_name,
        snapshot.status.as_str(),
        snapshot.cpu_pct,
        snapshot.mem_pct,
        snapshot.running_pods,
        snapshot.succeeded_pods,
        snapshot.internal_ip,
        snapshot.kubelet_version,
        snapshot.created_at,
        panel.refreshes,
    );
}
