use std::time::{Duration, Instant};

use rocket::{
    Build, Rocket,
    fairing::{self, Fairing, Info, Kind},
};
use tokio::time;
use tracing::{info, warn};

use crate::logic::{RetentionPolicy, SessionRegistry};

pub async fn start_cleanup_task(
    registry: SessionRegistry,
    every: Duration,
    policy: RetentionPolicy,
) {
    // `interval` panics on a zero period.
    let mut interval = time::interval(every.max(Duration::from_secs(1)));

    info!(
        "Started game cleanup task: checking every {}s, idle timeout: {}s, finished timeout: {}s",
        every.as_secs(),
        policy.idle_timeout.as_secs(),
        policy.finished_timeout.as_secs()
    );

    loop {
        interval.tick().await;
        registry.evict_expired(&policy, Instant::now());
    }
}

/// Spawns the cleanup task once the managed registry is available.
pub struct CleanupFairing {
    pub every: Duration,
    pub policy: RetentionPolicy,
}

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Session Cleanup",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        if let Some(registry) = rocket.state::<SessionRegistry>() {
            let registry = registry.clone();
            let (every, policy) = (self.every, self.policy);
            tokio::spawn(async move {
                start_cleanup_task(registry, every, policy).await;
            });
        } else {
            warn!("No session registry managed, cleanup task not started");
        }
        Ok(rocket)
    }
}
