use std::sync::Arc;

use tracing::debug;

use runmcp_api::{ApiClient, ApiError, Identity, RatingsClient};
use runmcp_core::{generate_summary, McpScanner, RatingsCollector, ScanEvent};
use runmcp_store::Storage;

use crate::cli::args::{Cli, Command};
use crate::cli::commands::EXIT_SUCCESS;
use crate::report;

pub async fn run(cli: &Cli) -> anyhow::Result<i32> {
    let Command::Scan(args) = &cli.cmd else {
        unreachable!("dispatch routes only scan commands here");
    };

    let targets: Vec<String> = if args.paths.is_empty() {
        runmcp_core::paths::well_known_mcp_paths()
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    } else {
        args.paths.clone()
    };

    // Resolve host identity from storage, creating it on first run.
    let storage = Arc::new(Storage::open_or_create(&cli.storage_file)?);

    let identity = if cli.anonymous {
        Identity::anonymous()
    } else {
        let org = cli
            .org_uuid
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                (!storage.data.org_uuid.is_empty()).then(|| storage.data.org_uuid.clone())
            });
        Identity {
            org_uuid: org,
            host_uuid: Some(storage.data.host_uuid.clone()),
            anonymous: false,
        }
    };

    // The collector starts with no client so scanning begins immediately;
    // the health-gated client attaches in the background when it comes up.
    let collector = Arc::new(RatingsCollector::new(None, Some(Arc::clone(&storage))));
    if !cli.offline {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move {
            match ApiClient::builder().identity(identity).connect().await {
                Ok(client) => {
                    collector.set_client(Arc::new(client) as Arc<dyn RatingsClient>);
                }
                Err(ApiError::Offline) => {
                    debug!("remote health unavailable; continuing in offline mode");
                }
                Err(e) => debug!(error = %e, "api client init failed"),
            }
        });
    }

    let mut scanner = McpScanner::new(targets).with_ratings_collector(Arc::clone(&collector));
    if cli.tui {
        scanner = scanner.with_streaming_callback(Box::new(stream_progress));
    }

    let result = scanner.scan();
    let mut summary = generate_summary(&result);

    // Drain pending batches and pollers, then apply gathered policies and
    // ratings before rendering.
    collector.flush_and_stop().await;
    collector.apply_to_summary(&mut summary);

    report::print_summary(&summary, cli.json)?;
    Ok(EXIT_SUCCESS)
}

/// Streaming progress for interactive runs, one line per file event.
fn stream_progress(event: &ScanEvent<'_>) {
    if event.complete {
        eprintln!("scan complete");
        return;
    }
    match (event.result, event.error) {
        (None, None) => eprintln!("scanning {}", event.path),
        (Some(result), None) => {
            eprintln!("  {} server(s) in {}", result.servers.len(), event.path);
        }
        (_, Some(error)) => eprintln!("  skipped {}: {}", event.path, error.message),
    }
}
