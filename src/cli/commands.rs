use crate::{
    context::RequestContext,
    fgprof,
    middleware::AuthMiddleware,
    pprof,
    router::Router,
    runtime_config::RuntimeConfig,
    server::HttpServer,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for the profiling demo server
#[derive(Parser, Debug)]
#[command(name = "brrtrouter-pprof")]
#[command(about = "Serve pprof-style profiling endpoints over may_minihttp", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the server with the profiling routes mounted
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        #[command(flatten)]
        routes: RouteArgs,
    },
    /// Print the routing table and exit
    Routes {
        #[command(flatten)]
        routes: RouteArgs,
    },
}

/// Where and how the profiling routes are mounted
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteArgs {
    /// Mount point of the pprof routes [default: $BRRTR_PPROF_PREFIX, then /debug/pprof]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Also mount `pprof` and `/ping` inside this group (e.g. /admin)
    #[arg(long)]
    pub group: Option<String>,

    /// Bearer token required by every route of the group
    #[arg(long, requires = "group")]
    pub token: Option<String>,

    /// Mount the fgprof route as well
    #[arg(long, default_value_t = false)]
    pub fgprof: bool,
}

fn ping(ctx: &mut RequestContext) {
    ctx.json(200, &serde_json::json!({ "ping": "pong" }));
}

/// Build the demo router described by `args`.
#[must_use]
pub fn build_router(args: &RouteArgs, config: &RuntimeConfig) -> Router {
    let mut router = Router::with_defaults();
    let prefix = args
        .prefix
        .as_deref()
        .or(config.pprof_prefix.as_deref())
        .unwrap_or(pprof::DEFAULT_PREFIX);

    pprof::register(&mut router, &[prefix]);
    router.get("/ping", Arc::new(ping));
    if args.fgprof {
        fgprof::fgprof_register(&mut router, &[]);
    }

    if let Some(group_path) = &args.group {
        let mut group = router.group(group_path);
        if let Some(token) = &args.token {
            group.use_middleware(Arc::new(AuthMiddleware::bearer(token)));
        }
        group.get("/ping", Arc::new(ping));
        pprof::route_register(&mut group, &["pprof"]);
        if args.fgprof {
            fgprof::fgprof_route_register(&mut group, &["fgprof"]);
        }
    }
    router
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if the server cannot bind or exits abnormally.
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = RuntimeConfig::global();
    match cli.command {
        Commands::Routes { routes } => {
            for (method, path) in build_router(&routes, config).routes() {
                println!("{method:<6} {path}");
            }
            Ok(())
        }
        Commands::Serve { addr, routes } => {
            may::config().set_stack_size(config.stack_size);
            let router = build_router(&routes, config);
            router.dump_routes();

            let handle = HttpServer::from_router(router)
                .start(addr.as_str())
                .with_context(|| format!("Failed to start server on {addr}"))?;
            handle.wait_ready().context("Server did not become ready")?;
            info!(addr = %handle.addr(), stack_size = config.stack_size, "Serving profiling endpoints");
            wait_for_shutdown(handle)
        }
    }
}

#[cfg(unix)]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("Server coroutine panicked: {e:?}"))
}
