//! Civicwatch - headless incident sync.
//!
//! Loads incidents from the backend the same way the mobile list screen
//! does, applies the configured filters, and prints the resulting view as
//! JSON on stdout. Logs go to stderr.
//!
//! # Environment
//!
//! - `CIVICWATCH_API_URL` - Backend base URL
//! - `CIVICWATCH_TOKEN` - Bearer token (JWT)
//! - `CIVICWATCH_PAGE_SIZE` - Items per page (default: 10)
//! - `CIVICWATCH_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `CIVICWATCH_LOAD_ALL` - Fetch every page instead of just the first
//! - `CIVICWATCH_SEARCH`, `CIVICWATCH_PRIORITY`, `CIVICWATCH_STATUS`,
//!   `CIVICWATCH_CATEGORY` - Filters (sets are comma-separated)

use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use civicwatch::client::ApiClient;
use civicwatch::config::{ClientConfig, SyncOptions};
use civicwatch::incident_list::IncidentListScreen;
use civicwatch::pagination::LoadOutcome;
use civicwatch::role_gate::{Destination, RoleGate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default log level is INFO; the session token is never logged
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("civicwatch=info".parse()?))
        .init();

    // Load configuration from environment
    let config = ClientConfig::from_env()?;
    let options = SyncOptions::from_env();

    info!(
        api_url = %config.api_url,
        page_size = config.page_size,
        load_all = options.load_all,
        "Starting Civicwatch sync"
    );

    let client = ApiClient::new(&config)?;

    let role = client.session().and_then(|s| s.effective_role(Utc::now()));
    let gate = RoleGate::standard();
    if !gate.can_access(role, Destination::IncidentList) {
        warn!(role = ?role, "Session role does not include the incident list; the backend may refuse");
    }

    let screen = IncidentListScreen::new(Arc::new(client), config.page_size);
    screen.update_filters(|filters| *filters = options.filters.clone());

    let outcome = if options.load_all {
        screen.load_all().await
    } else {
        screen.load_initial().await
    };

    match outcome {
        LoadOutcome::Failed(err) if err.is_unauthorized() => {
            bail!("backend rejected the session token; log in again")
        }
        LoadOutcome::Failed(err) => bail!("failed to load incidents: {err}"),
        _ => {}
    }

    let view = screen.view();
    info!(
        total_known = view.total_known,
        visible = view.visible_count(),
        has_more = view.has_more,
        "Incidents synced"
    );

    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
