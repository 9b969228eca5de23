//! Best-effort public IP detection for the final report.

use std::time::Duration;
use tracing::warn;

const LOOKUP_URL: &str = "https://checkip.amazonaws.com";

/// Detect the host's public IP via an external lookup service.
///
/// Never fatal: any network or parse failure degrades to `None`, which the
/// report renders as the `unknown` sentinel.
pub async fn detect_public_ip() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .ok()?;

    match client.get(LOOKUP_URL).send().await {
        Ok(response) => match response.text().await {
            Ok(body) => {
                let ip = body.trim().to_string();
                if ip.is_empty() || !looks_like_ip(&ip) {
                    warn!("public IP lookup returned unexpected body");
                    None
                } else {
                    Some(ip)
                }
            }
            Err(e) => {
                warn!("public IP lookup body read failed: {}", e);
                None
            }
        },
        Err(e) => {
            warn!("public IP lookup failed: {}", e);
            None
        }
    }
}

fn looks_like_ip(candidate: &str) -> bool {
    candidate.parse::<std::net::IpAddr>().is_ok()
}
