//! Who published: the [`Author`] record attached to each index update.

use std::net::Ipv4Addr;
use std::time::Duration;

use mored_schema::{Author, current_platform};
use tracing::debug;

/// Plain-text "what is my IP" services, tried in order over HTTP.
pub const IP_ECHO_HOSTS: [&str; 8] = [
    "myexternalip.com/raw",
    "checkip.amazonaws.com",
    "api.ipify.org",
    "ifconfig.me/ip",
    "icanhazip.com",
    "ipinfo.io/ip",
    "ipecho.net/plain",
    "checkipv4.dedyn.io",
];

/// Per-host timeout for the IP lookup.
pub const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Login name of the current user, `unknown` when unset.
pub fn current_user() -> String {
    ["USER", "USERNAME"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parse an echo service response. Only a bare IPv4 address is accepted.
pub fn parse_ipv4(body: &str) -> Option<Ipv4Addr> {
    body.trim().parse().ok()
}

/// Public IPv4 address of this machine, or an empty string.
///
/// Tries each of [`IP_ECHO_HOSTS`] with a short timeout and returns the
/// first answer that parses. Every failure is swallowed.
#[cfg(feature = "network")]
pub async fn public_ip() -> String {
    let Ok(client) = reqwest::Client::builder()
        .timeout(IP_LOOKUP_TIMEOUT)
        .user_agent(crate::USER_AGENT)
        .build()
    else {
        return String::new();
    };

    for host in IP_ECHO_HOSTS {
        let body = match client.get(format!("http://{host}")).send().await {
            Ok(resp) => resp.text().await.unwrap_or_default(),
            Err(e) => {
                debug!(host, error = %e, "ip lookup failed");
                continue;
            }
        };
        if let Some(ip) = parse_ipv4(&body) {
            return ip.to_string();
        }
    }
    String::new()
}

/// Without the `network` feature no lookup is attempted.
#[cfg(not(feature = "network"))]
#[allow(clippy::unused_async)]
pub async fn public_ip() -> String {
    debug!("ip lookup disabled at build time");
    String::new()
}

/// Author record for a publish happening now.
pub async fn current_author(lookup_ip: bool) -> Author {
    let ip = if lookup_ip { public_ip().await } else { String::new() };
    Author::new(current_user(), current_platform(), ip)
}
