use clap::{Parser, ValueEnum};
use compute_mesh::api;
use compute_mesh::executor::dispatcher::ExecutionDispatcher;
use compute_mesh::executor::installer::HttpInstaller;
use compute_mesh::executor::manifest::ManifestStore;
use compute_mesh::executor::registry::FunctionRegistry;
use compute_mesh::executor::types::FunctionManifest;
use compute_mesh::messages::Role;
use compute_mesh::node::{self, NodeConfig, NodeContext};
use compute_mesh::rollcall::{FirstResponder, RoundRobin, SelectionPolicy};
use compute_mesh::transport::gossip::GossipTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Policy {
    FirstResponder,
    RoundRobin,
}

impl Policy {
    fn build(self) -> Arc<dyn SelectionPolicy> {
        match self {
            Policy::FirstResponder => Arc::new(FirstResponder),
            Policy::RoundRobin => Arc::new(RoundRobin::default()),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "compute-node", about = "Peer-to-peer compute node")]
struct Args {
    /// Node role: head or worker.
    #[arg(long, default_value = "worker")]
    role: Role,

    /// UDP address of the gossip transport.
    #[arg(long)]
    bind: SocketAddr,

    /// Gossip address of an existing node to join through. Repeatable.
    #[arg(long = "seed")]
    seeds: Vec<SocketAddr>,

    /// Control-plane address (head only). Defaults to the bind port + 1000.
    #[arg(long)]
    http: Option<SocketAddr>,

    #[arg(long, default_value = node::config::DEFAULT_TOPIC)]
    topic: String,

    /// Roll-call collection window.
    #[arg(long, default_value_t = 2000)]
    window_ms: u64,

    /// Close the roll call early once this many capable peers answered.
    #[arg(long)]
    min_responders: Option<usize>,

    /// How long a caller waits for an execution result.
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// How a head picks among the peers that answered a roll call.
    #[arg(long, value_enum, default_value_t = Policy::FirstResponder)]
    policy: Policy,

    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Jobs allowed to queue behind busy workers before executes are refused.
    #[arg(long, default_value_t = 64)]
    backlog: usize,

    /// Manifest URL to install at startup. Repeatable.
    #[arg(long = "manifest")]
    manifests: Vec<String>,

    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

/// The explicit `--http` address, or the gossip address shifted by 1000 ports.
fn control_plane_addr(bind: SocketAddr, http: Option<SocketAddr>) -> anyhow::Result<SocketAddr> {
    if let Some(addr) = http {
        return Ok(addr);
    }
    let port = bind.port().checked_add(1000).ok_or_else(|| {
        anyhow::anyhow!(
            "Bind port {} leaves no room for the default HTTP port, pass --http",
            bind.port()
        )
    })?;
    Ok(SocketAddr::new(bind.ip(), port))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::info!("Starting {} node on {}", args.role, args.bind);
    if !args.seeds.is_empty() {
        tracing::info!("Seed nodes: {:?}", args.seeds);
    } else {
        tracing::info!("Starting as seed node (founder)");
    }

    // 1. Transport (UDP gossip):
    let transport = GossipTransport::bind(args.bind, args.seeds.clone()).await?;
    tracing::info!("Peer ID: {}", transport.local_member.id);
    transport.clone().start().await;

    // 2. Functions:
    let manifests = ManifestStore::new();
    let registry = FunctionRegistry::new(manifests.clone());

    registry.register("echo", |invocation| async move {
        tracing::info!("Executing echo::{}", invocation.method);
        Ok(invocation.method)
    });

    registry.register("sleep", |invocation| async move {
        let millis = invocation.method.parse::<u64>().unwrap_or(1000);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(format!("slept {}ms", millis))
    });

    if args.role == Role::Worker {
        manifests.insert(FunctionManifest {
            function_id: "echo".to_string(),
            name: "echo".to_string(),
            version: "1".to_string(),
            entry: "echo".to_string(),
            methods: Vec::new(),
        });
    }

    tracing::info!("Registered handlers: {:?}", registry.list_handlers());

    let dispatcher = ExecutionDispatcher::new(registry);
    let installer = HttpInstaller::new(manifests);

    // 3. Node:
    let config = NodeConfig {
        role: args.role,
        topic: args.topic,
        rollcall_window: Duration::from_millis(args.window_ms),
        min_responders: args.min_responders,
        request_timeout: Duration::from_millis(args.timeout_ms),
        worker_count: args.workers,
        pool_backlog: args.backlog,
        ..NodeConfig::default()
    };

    let policy = args.policy.build();
    tracing::info!("Selection policy: {}", policy.name());

    let ctx = NodeContext::new(config, transport.clone(), dispatcher, installer, policy);
    let handle = Arc::new(node::spawn(ctx));

    for manifest_url in &args.manifests {
        handle.install(manifest_url).await?;
    }

    // 4. Control plane (head only):
    if args.role == Role::Head {
        let http_addr = control_plane_addr(args.bind, args.http)?;

        let app = api::router(handle.clone());
        let listener = tokio::net::TcpListener::bind(http_addr).await?;

        tracing::info!("HTTP server listening on {}", http_addr);
        tracing::info!("Press Ctrl+C to shutdown");

        let server_handle = handle.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                server_handle.shutdown();
            })
            .await?;
    } else {
        tracing::info!("Press Ctrl+C to shutdown");
        tokio::signal::ctrl_c().await?;
        handle.shutdown();
    }

    Ok(())
}
