//! Request rate limiting keyed by client IP

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use axum::{Router, http::HeaderMap};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tracing::{debug, info};

/// How often idle client entries are dropped from a limiter
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests allowed per window
    pub max_requests: u32,
    /// Window over which `max_requests` replenish
    pub window: Duration,
}

impl RateLimiterConfig {
    /// General API traffic: 500 requests per minute
    pub fn api() -> Self {
        Self {
            max_requests: 500,
            window: Duration::from_secs(60),
        }
    }

    /// Login and registration: 50 attempts per 15 minutes
    pub fn auth() -> Self {
        Self {
            max_requests: 50,
            window: Duration::from_secs(15 * 60),
        }
    }

    /// Time after which one more request is allowed
    fn replenish_millis(&self) -> u64 {
        let millis = self.window.as_millis() / u128::from(self.max_requests.max(1));
        u64::try_from(millis).unwrap_or(u64::MAX).max(1)
    }
}

/// Limit every route of `router` to `config`, per client IP
///
/// Clients may burst up to `max_requests` and regain one request every
/// `window / max_requests`. Over the limit the request is answered with 429.
pub fn rate_limited<S>(router: Router<S>, config: RateLimiterConfig) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let governor = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_millisecond(config.replenish_millis())
        .burst_size(config.max_requests)
        .finish()
        .ok_or_else(|| anyhow!("Invalid rate limit {:?}", config))?;
    let governor = Arc::new(governor);

    let limiter = governor.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            interval.tick().await;
            limiter.retain_recent();
            debug!("Rate limiter tracks {} clients", limiter.len());
        }
    });

    info!(
        "Rate limiting to {} requests per {:?}",
        config.max_requests, config.window
    );
    Ok(router.route_layer(GovernorLayer { config: governor }))
}

/// Best-effort client address: proxy headers first, then the socket peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
