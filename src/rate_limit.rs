use std::{
    net::{IpAddr, Ipv4Addr},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use rocket::request::{self, FromRequest, Request};
use tracing::{debug, instrument, warn};

use crate::error::ApiError;

#[derive(Debug)]
struct TokenBucket {
    last_refill: Instant,
    tokens: u32,
}

impl TokenBucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self {
            last_refill: now,
            tokens: capacity,
        }
    }

    /// Tops the bucket back up to `capacity` once a full `window` has passed.
    fn refill(&mut self, capacity: u32, window: Duration, now: Instant) {
        if now.saturating_duration_since(self.last_refill) >= window {
            self.tokens = capacity;
            self.last_refill = now;
        }
    }
}

/// Per-client limit on game creation.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    capacity: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        debug!(
            "Creating rate limiter: {} games per {}s",
            capacity,
            window.as_secs()
        );
        Self {
            buckets: DashMap::new(),
            capacity,
            window,
        }
    }

    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    #[instrument(level = "trace", skip(self))]
    pub fn check(&self, ip: IpAddr) -> Result<(), ApiError> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), ApiError> {
        let mut bucket = self
            .buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(self.capacity, now));
        bucket.refill(self.capacity, self.window, now);

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            debug!("Rate limit ok for {}: {} tokens left", ip, bucket.tokens);
            Ok(())
        } else {
            warn!("Rate limit exceeded for {}", ip);
            Err(ApiError::RateLimited)
        }
    }
}

#[derive(Debug)]
pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|header| header.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
            .or_else(|| {
                req.headers()
                    .get_one("X-Real-IP")
                    .and_then(|ip| ip.trim().parse().ok())
            })
            .or_else(|| req.client_ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        request::Outcome::Success(ClientIp(ip))
    }
}
