//! Node Module
//!
//! Wires one compute node together: the per-kind mailboxes, the inbound listener
//! feeding them from the transport, the single-threaded coordination loop draining
//! them, and the background tasks (correlation sweep, health pings, peer discovery
//! and stats).
//!
//! ## Roles
//! - **Head**: accepts execution requests on its control plane, finds a capable
//!   worker through a roll call and correlates the worker's response back to the
//!   waiting caller.
//! - **Worker**: answers roll calls for functions it can run and executes dispatched
//!   requests on its worker pool.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod discovery;
pub mod handle;
pub mod health;
pub mod mailbox;

pub use config::NodeConfig;
pub use context::NodeContext;
pub use handle::NodeHandle;

use coordinator::Coordinator;
use health::HealthMonitor;

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Starts every task of a node and returns the handle used to drive it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn(ctx: NodeContext) -> NodeHandle {
    let config = ctx.config.clone();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (senders, receivers) = mailbox::mailboxes(config.mailbox_capacity);

    tracing::info!(
        "Starting {} node {} on topic {}",
        config.role,
        ctx.transport.local_peer(),
        config.topic
    );

    let frames = ctx.transport.subscribe(&config.topic);
    tokio::spawn(until_shutdown(
        shutdown_rx.clone(),
        mailbox::inbound_listener(frames, senders.clone()),
    ));

    tokio::spawn(until_shutdown(
        shutdown_rx.clone(),
        ctx.correlation.clone().run_sweeper(config.sweep_interval),
    ));

    let monitor = HealthMonitor::new(
        ctx.transport.clone(),
        config.topic.clone(),
        config.health_interval,
    );
    tokio::spawn(until_shutdown(shutdown_rx.clone(), monitor.run()));

    let peers = ctx.transport.discover_peers(&config.topic);
    tokio::spawn(until_shutdown(
        shutdown_rx.clone(),
        discovery::log_discovered_peers(peers, config.topic.clone()),
    ));

    tokio::spawn(until_shutdown(
        shutdown_rx.clone(),
        discovery::report_stats(
            ctx.transport.clone(),
            ctx.correlation.clone(),
            config.stats_interval,
        ),
    ));

    let handle = NodeHandle::new(
        config.role,
        senders,
        ctx.correlation.clone(),
        ctx.transport.clone(),
        config.request_timeout,
        Arc::new(shutdown_tx),
    );

    tokio::spawn(Coordinator::new(ctx, receivers, shutdown_rx).run());

    handle
}

/// Runs `task` until it finishes or the node stops. Dropping every `NodeHandle`
/// stops the node too.
async fn until_shutdown<F>(mut shutdown: watch::Receiver<bool>, task: F)
where
    F: Future<Output = ()>,
{
    let stopped = async move {
        while !*shutdown.borrow_and_update() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = task => {}
        _ = stopped => {}
    }
}
