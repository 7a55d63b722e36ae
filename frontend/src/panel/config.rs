// frontend/src/panel/config.rs

use std::time::Duration;

use katapult_shared::WS_PATH;
use url::Url;

use super::angle_input::DEFAULT_ANGLE;
use super::telemetry_window::{DEFAULT_CAPACITY, DEFAULT_CEILING};

pub const DEFAULT_BASE_URL: &str = "http://katapult.local";

// ---------- Base URL handling ----------

/// Reduces a device address to scheme + host[:port]: path, query and fragment
/// are dropped (`HTTP://host:3000/ui/?tab=1#x` -> `http://host:3000/`). A bare
/// `host[:port]` is taken as plain http.
pub fn normalize_base_url(base: &str) -> Result<Url, url::ParseError> {
    let base = base.trim();
    let mut url = if base.contains("://") {
        Url::parse(base)?
    } else {
        match Url::parse(base) {
            // `host:3000` parses as scheme `host`, so only accept real authorities.
            Ok(url) if url.has_host() => url,
            _ => Url::parse(&format!("http://{base}"))?,
        }
    };
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Swaps the scheme, keeping TLS: https/wss map to `secure`, anything else to `plain`.
fn with_scheme(mut url: Url, secure: &str, plain: &str) -> Result<Url, url::ParseError> {
    let scheme = match url.scheme() {
        "https" | "wss" => secure,
        _ => plain,
    };
    if url.host_str().is_none_or(str::is_empty) || url.set_scheme(scheme).is_err() {
        return Err(url::ParseError::EmptyHost);
    }
    Ok(url)
}

/// http(s) form of the base, used for the command endpoints.
pub fn base_http(base: &str) -> Result<Url, url::ParseError> {
    with_scheme(normalize_base_url(base)?, "https", "http")
}

/// ws(s) form of the base, no path.
pub fn base_ws(base: &str) -> Result<Url, url::ParseError> {
    with_scheme(normalize_base_url(base)?, "wss", "ws")
}

/// Full duplex-channel URL for `base`.
pub fn channel_url(base: &str) -> Result<Url, url::ParseError> {
    let mut url = base_ws(base)?;
    url.set_path(WS_PATH);
    Ok(url)
}

// ---------- Reconnect policy ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(800),
            max_delay: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

/// Doubling delay between reconnect attempts, reset after a successful open.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Delay before the next attempt, or `None` once the attempt cap is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_attempts
            && self.failures >= max
        {
            return None;
        }
        let shift = self.failures.min(16);
        self.failures = self.failures.saturating_add(1);
        let delay = self.policy.initial_delay.saturating_mul(1u32 << shift);
        Some(delay.min(self.policy.max_delay))
    }
}

// ---------- Panel config ----------

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub base_url: String,
    pub auto_reconnect: bool,
    pub reconnect: ReconnectPolicy,
    pub window_capacity: usize,
    pub ceiling_floor: f64,
    pub initial_angle: i64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auto_reconnect: true,
            reconnect: ReconnectPolicy::default(),
            window_capacity: DEFAULT_CAPACITY,
            ceiling_floor: DEFAULT_CEILING,
            initial_angle: DEFAULT_ANGLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(r: Result<Url, url::ParseError>) -> String {
        r.expect("valid base").to_string()
    }

    #[test]
    fn normalizes_base_urls() {
        assert_eq!(
            url(normalize_base_url("http://host:3000/ui/index.html#tab")),
            "http://host:3000/"
        );
        assert_eq!(url(normalize_base_url("https://host/")), "https://host/");
        assert_eq!(url(normalize_base_url("  host:3000/x ")), "http://host:3000/");
        assert_eq!(url(normalize_base_url("127.0.0.1:3000")), "http://127.0.0.1:3000/");
    }

    #[test]
    fn derives_channel_scheme() {
        assert_eq!(url(base_ws("http://h:1")), "ws://h:1/");
        assert_eq!(url(base_ws("https://h")), "wss://h/");
        assert_eq!(url(base_ws("wss://h")), "wss://h/");
        assert_eq!(url(base_ws("h:3000")), "ws://h:3000/");
        assert_eq!(
            url(channel_url("http://127.0.0.1:3000/")),
            "ws://127.0.0.1:3000/api/ws"
        );
    }

    #[test]
    fn query_never_ends_up_in_the_channel_url() {
        let ch = channel_url("http://dev:3000?tab=rpm").expect("valid base");
        assert_eq!(ch.as_str(), "ws://dev:3000/api/ws");
        assert_eq!(ch.path(), "/api/ws");
        assert_eq!(url(base_http("http://dev:3000?tab=rpm")), "http://dev:3000/");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let ch = channel_url("HTTP://dev:3000").expect("valid base");
        assert_eq!(ch.host_str(), Some("dev"));
        assert_eq!(ch.as_str(), "ws://dev:3000/api/ws");
        assert_eq!(url(channel_url("HTTPS://dev")), "wss://dev/api/ws");
    }

    #[test]
    fn derives_http_scheme() {
        assert_eq!(url(base_http("ws://h:1")), "http://h:1/");
        assert_eq!(url(base_http("wss://h")), "https://h/");
        assert_eq!(url(base_http("h")), "http://h/");
    }

    #[test]
    fn rejects_bases_without_a_host() {
        assert!(channel_url("http://[::1").is_err());
        assert!(base_http("file:///tmp/panel").is_err());
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut b = Backoff::new(ReconnectPolicy::default());
        let delays: Vec<u64> = (0..6)
            .map(|_| b.next_delay().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![800, 1600, 3200, 6400, 10_000, 10_000]);

        b.reset();
        assert_eq!(b.next_delay(), Some(Duration::from_millis(800)));
    }

    #[test]
    fn backoff_respects_attempt_cap() {
        let mut b = Backoff::new(ReconnectPolicy {
            max_attempts: Some(2),
            ..ReconnectPolicy::default()
        });
        assert!(b.next_delay().is_some());
        assert!(b.next_delay().is_some());
        assert!(b.next_delay().is_none());
    }

    #[test]
    fn backoff_never_overflows() {
        let mut b = Backoff::new(ReconnectPolicy::default());
        for _ in 0..100 {
            assert!(b.next_delay().unwrap() <= Duration::from_secs(10));
        }
    }
}
