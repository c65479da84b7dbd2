//! Handler for the `run` command.

use tokio::sync::watch;
use tracing::info;

use crate::cli::RunArgs;
use crate::domain::Symbol;
use crate::error::Result;
use crate::infrastructure::bootstrap::build_paper_runtime;
use crate::infrastructure::config::logging::LogFormat;
use crate::infrastructure::config::Config;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }
    config.init_logging();

    let only: Vec<Symbol> = args.symbols.iter().map(Symbol::new).collect();
    let runtime = build_paper_runtime(&config, &only)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let venues = runtime.spawn_venues(&shutdown_rx);

    info!("crossarb starting");
    let engine = runtime.engine.run(shutdown_rx);
    tokio::pin!(engine);

    let result = tokio::select! {
        result = &mut engine => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            // ignore send errors: every receiver may already be gone
            let _ = shutdown_tx.send(true);
            engine.await
        }
    };

    let _ = shutdown_tx.send(true);
    for venue in venues {
        let _ = venue.await;
    }
    info!("crossarb stopped");
    result
}
