//! Live network of event creation services
//!
//! Each node runs an [`EventCreationService`] on the tokio runtime with the
//! system clock. A router task collects the events every node publishes,
//! assigns nGen and delivers them back to all nodes.
//!
//! ```text
//!   service 0 ─┐                ┌─► handle 0
//!   service 1 ─┼─► router ──────┼─► handle 1
//!   service n ─┘  (nGen, window)└─► handle n
//! ```

use crate::ordering::OrderingLayer;
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tipset_core::{AncientMode, NodeId, PlatformEvent, Roster, SystemClock};
use tipset_crypto::Ed25519HashSigner;
use tipset_node::{
    EventCreationManager, EventCreationService, NodeConfig, PlatformStatus, ServiceHandle, TransactionPool,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Events delivered between event window advances, per node
const EVENTS_PER_ROUND_PER_NODE: u64 = 4;

/// Outcome of a live run
pub struct LiveOutcome {
    /// Events created per node, as seen by the router
    pub created: HashMap<NodeId, u64>,
    /// Managers handed back by the stopped services, in node order
    pub managers: Vec<EventCreationManager>,
}

/// Run `nodes` services for `duration`
pub async fn run_live(base_config: &NodeConfig, nodes: u64, duration: Duration) -> anyhow::Result<LiveOutcome> {
    let roster = Arc::new(Roster::with_equal_weights(nodes).context("Invalid roster")?);
    let attempt_interval = base_config
        .event_creation
        .creation_attempt_interval()
        .context("creation_attempt_rate must be positive")?;
    let master_seed = [7u8; 32];

    let (router_tx, mut router_rx) = mpsc::channel::<PlatformEvent>(1024);
    let mut handles = Vec::new();
    let mut shutdowns = Vec::new();
    let mut tasks = Vec::new();

    for node_id in roster.node_ids() {
        let mut config = base_config.clone();
        config.node.self_id = node_id;
        config.node.name = format!("node-{}", node_id.id());
        config.event_creation.rng_seed = base_config.event_creation.rng_seed.wrapping_add(node_id.id());

        let manager = EventCreationManager::for_node(
            &config,
            roster.clone(),
            Arc::new(Ed25519HashSigner::for_node(&master_seed, node_id)),
            Arc::new(SystemClock),
            TransactionPool::new(),
        )?;
        let service = EventCreationService::new(manager, attempt_interval);
        let handle = service.handle();
        handle.update_platform_status(PlatformStatus::Active).await?;

        tokio::spawn(forward_events(handle.subscribe(), router_tx.clone()));

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tasks.push(tokio::spawn(service.run(shutdown_rx)));
        shutdowns.push(shutdown_tx);
        handles.push(handle);
    }
    drop(router_tx);

    let mut router = Router::new(base_config.node.ancient_mode, nodes);
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(event) = router_rx.recv() => router.route(event, &handles).await?,
            else => break,
        }
    }

    for shutdown in shutdowns {
        let _ = shutdown.send(()).await;
    }
    let mut managers = Vec::with_capacity(tasks.len());
    for task in tasks {
        managers.push(task.await.context("Event creation service panicked")?);
    }

    info!(
        "Live run finished with {} events, {} still tracked, window {}",
        router.total,
        router.ordering.len(),
        router.ordering.event_window()
    );
    Ok(LiveOutcome {
        created: router.created,
        managers,
    })
}

async fn forward_events(mut events: broadcast::Receiver<PlatformEvent>, router: mpsc::Sender<PlatformEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if router.send(event).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Router lagged, {} events lost", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Plays the part of the ordering layer and consensus
struct Router {
    ordering: OrderingLayer,
    created: HashMap<NodeId, u64>,
    total: u64,
    events_per_round: u64,
}

impl Router {
    fn new(ancient_mode: AncientMode, nodes: u64) -> Self {
        Self {
            ordering: OrderingLayer::new(ancient_mode, nodes),
            created: HashMap::new(),
            total: 0,
            events_per_round: nodes * EVENTS_PER_ROUND_PER_NODE,
        }
    }

    async fn route(&mut self, event: PlatformEvent, handles: &[ServiceHandle]) -> anyhow::Result<()> {
        *self.created.entry(event.creator()).or_default() += 1;
        self.total += 1;

        let event = self.ordering.order(event);
        for handle in handles {
            handle.register_event(event.clone()).await?;
        }

        if self.total % self.events_per_round == 0 {
            let event_window = self.ordering.advance_round()?;
            for handle in handles {
                handle.set_event_window(event_window).await?;
            }
        }
        Ok(())
    }
}
