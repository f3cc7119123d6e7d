//! Health command: checks a running trackerlink server's `/health` route.

use std::time::Duration;

use serde::Deserialize;
use trackerlink::constants::ROUTE_HEALTH;

use crate::cli::HealthArgs;

/// Body of a `/health` response.
#[derive(Debug, Deserialize, PartialEq, Eq)]
struct HealthReport {
    status: String,
    backend: String,
}

/// The health route under `base`, accepting a base that already names it.
fn health_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with(ROUTE_HEALTH) {
        base.to_string()
    } else {
        format!("{base}{ROUTE_HEALTH}")
    }
}

async fn check(url: &str, timeout: Duration) -> Result<HealthReport, String> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("failed to connect to {url}: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("server returned HTTP status {}", response.status()));
    }

    let report: HealthReport = response
        .json()
        .await
        .map_err(|e| format!("unexpected health response: {e}"))?;
    if report.status != "healthy" {
        return Err(format!(
            "server reported {} (backend {})",
            report.status, report.backend
        ));
    }
    Ok(report)
}

/// Run the health check command
pub async fn run(args: &HealthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let url = health_url(&args.url);
    match check(&url, Duration::from_secs(args.timeout)).await {
        Ok(report) => {
            println!("healthy: backend {}", report.backend);
            Ok(())
        }
        Err(reason) => {
            eprintln!("unhealthy: {reason}");
            std::process::exit(1);
        }
    }
}
