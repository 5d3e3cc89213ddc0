//! Per-client sliding window rate limiting.
//!
//! Clients are identified by IP. `X-Forwarded-For` is only honoured when the
//! peer itself is a trusted proxy, so direct clients cannot pick their key.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Tracked clients above which idle ones are evicted.
const EVICTION_THRESHOLD: usize = 1024;

/// Sliding window limiter keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    trusted_proxies: Vec<IpAddr>,
    clients: DashMap<IpAddr, VecDeque<Instant>>,
}

impl RateLimiter {
    /// Allow `max_requests` per `window` for each client.
    ///
    /// # Example
    /// ```rust
    /// use std::net::{IpAddr, Ipv4Addr};
    /// use std::time::Duration;
    ///
    /// use userbase::limits::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(1, Duration::from_secs(60));
    /// let client = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
    /// assert!(limiter.check(client));
    /// assert!(!limiter.check(client));
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        RateLimiter {
            max_requests,
            window,
            trusted_proxies: Vec::new(),
            clients: DashMap::new(),
        }
    }

    /// Honour `X-Forwarded-For` from these peers.
    pub fn trust(mut self, proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        self.trusted_proxies = proxies.into_iter().collect();
        self
    }

    /// Resolve the client IP of a request.
    ///
    /// The first forwarded hop wins only behind a trusted proxy. Without a
    /// peer address every request shares the loopback key.
    pub fn client_ip(&self, peer: Option<IpAddr>, forwarded: Option<&str>) -> IpAddr {
        let forwarded = peer
            .filter(|ip| self.trusted_proxies.contains(ip))
            .and(forwarded)
            .and_then(|value| value.split(',').next())
            .and_then(|hop| hop.trim().parse().ok());

        forwarded
            .or(peer)
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    /// Record a request from `client`. Returns `false` once its window is full.
    pub fn check(&self, client: IpAddr) -> bool {
        let now = Instant::now();

        // never hold an entry guard here, `retain` locks every shard.
        if self.clients.len() > EVICTION_THRESHOLD {
            self.evict(now);
        }

        let mut hits = self.clients.entry(client).or_default();
        while hits
            .front()
            .is_some_and(|hit| now.duration_since(*hit) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            false
        } else {
            hits.push_back(now);
            true
        }
    }

    /// Drop clients with no request inside the current window.
    fn evict(&self, now: Instant) {
        self.clients.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
    }

    /// Maximum requests allowed in one window.
    pub fn limit(&self) -> usize {
        self.max_requests
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.clients.len()
    }
}
