//! In-memory fixed-window admission limiter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use forum_core::ports::{Admission, AdmissionLimiter, RateLimitError};

/// Admission limiter configuration shared by every backend.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    /// Windows that started longer ago than this are evicted by the sweep.
    pub retention: Duration,
    /// Upper bound on tracked clients.
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            retention: Duration::from_secs(600),
            max_clients: 100_000,
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_requests),
            window: Duration::from_secs(
                std::env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            retention: Duration::from_secs(
                std::env::var("RATE_LIMIT_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            max_clients: std::env::var("RATE_LIMIT_MAX_CLIENTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_clients),
        }
    }
}

struct ClientWindow {
    counter: u32,
    started: Instant,
}

/// Per-client fixed-window request counter.
///
/// Every check runs lookup, rollover, increment and compare under one lock
/// shared by all clients, so no update is ever lost. A client that sends N
/// requests at the very end of one window and N more at the start of the
/// next gets all 2N through; that is the known cost of fixed windows.
///
/// The table is bounded: [`evict_idle`](AdmissionLimiter::evict_idle) drops
/// windows older than `retention`, and a full table makes room by sweeping
/// and then dropping the oldest window.
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<String, ClientWindow>>,
}

impl FixedWindowLimiter {
    pub fn new(mut config: RateLimitConfig) -> Self {
        config.retention = config.retention.max(config.window);
        config.max_clients = config.max_clients.max(1);

        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }

    /// Count one request from `client` observed at `now`.
    pub fn admit_at(&self, client: &str, now: Instant) -> Result<Admission, RateLimitError> {
        let mut clients = self.lock()?;

        if !clients.contains_key(client) && clients.len() >= self.config.max_clients {
            self.make_room(&mut clients, now);
        }

        let window = clients
            .entry(client.to_owned())
            .or_insert(ClientWindow {
                counter: 0,
                started: now,
            });

        if now.saturating_duration_since(window.started) > self.config.window {
            window.counter = 0;
            window.started = now;
        }

        window.counter = window.counter.saturating_add(1);

        let reset_after = self
            .config
            .window
            .saturating_sub(now.saturating_duration_since(window.started));

        if window.counter > self.config.max_requests {
            Ok(Admission::reject(reset_after))
        } else {
            Ok(Admission::allow(
                self.config.max_requests - window.counter,
                reset_after,
            ))
        }
    }

    /// Drop every window that started more than `retention` before `now`.
    pub fn evict_idle_at(&self, now: Instant) -> Result<usize, RateLimitError> {
        let mut clients = self.lock()?;
        Ok(self.sweep(&mut clients, now))
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ClientWindow>>, RateLimitError> {
        self.clients
            .lock()
            .map_err(|_| RateLimitError::Backend("client table lock poisoned".to_string()))
    }

    fn sweep(&self, clients: &mut HashMap<String, ClientWindow>, now: Instant) -> usize {
        let before = clients.len();
        let retention = self.config.retention;
        clients.retain(|_, w| now.saturating_duration_since(w.started) <= retention);
        before - clients.len()
    }

    fn make_room(&self, clients: &mut HashMap<String, ClientWindow>, now: Instant) {
        if self.sweep(clients, now) > 0 {
            return;
        }

        let oldest = clients
            .iter()
            .min_by_key(|(_, w)| w.started)
            .map(|(k, _)| k.clone());

        if let Some(key) = oldest {
            clients.remove(&key);
            tracing::debug!(client = %key, "Client table full, evicted oldest window");
        }
    }
}

#[async_trait]
impl AdmissionLimiter for FixedWindowLimiter {
    async fn admit(&self, client: &str) -> Result<Admission, RateLimitError> {
        self.admit_at(client, Instant::now())
    }

    async fn evict_idle(&self) -> Result<usize, RateLimitError> {
        self.evict_idle_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn limiter(max_requests: u32, window: Duration) -> FixedWindowLimiter {
        FixedWindowLimiter::new(RateLimitConfig::new(max_requests, window))
    }

    #[test]
    fn test_burst_of_five_then_reject() {
        let limiter = limiter(5, Duration::from_secs(1));
        let start = Instant::now();

        for i in 0..5 {
            let at = start + Duration::from_millis(i * 40);
            let res = limiter.admit_at("A", at).unwrap();
            assert!(res.allowed, "request {} should be admitted", i + 1);
            assert_eq!(res.remaining, 4 - i as u32);
        }

        let res = limiter.admit_at("A", start + Duration::from_millis(200)).unwrap();
        assert!(!res.allowed);
        assert_eq!(res.remaining, 0);
        assert_eq!(res.reset_after, Duration::from_millis(800));
    }

    #[test]
    fn test_window_rollover_admits_again() {
        let limiter = limiter(2, Duration::from_secs(1));
        let start = Instant::now();

        assert!(limiter.admit_at("A", start).unwrap().allowed);
        assert!(limiter.admit_at("A", start).unwrap().allowed);
        assert!(!limiter.admit_at("A", start).unwrap().allowed);

        // Exactly one window later is still the same window.
        let edge = start + Duration::from_secs(1);
        assert!(!limiter.admit_at("A", edge).unwrap().allowed);

        let later = start + Duration::from_millis(1001);
        let res = limiter.admit_at("A", later).unwrap();
        assert!(res.allowed);
        assert_eq!(res.remaining, 1);
    }

    #[test]
    fn test_boundary_burst_is_admitted() {
        let limiter = limiter(3, Duration::from_secs(1));
        let start = Instant::now();

        let late = start + Duration::from_millis(999);
        let early_next = start + Duration::from_millis(1001);

        // Fill the first window right at its end...
        assert!(limiter.admit_at("A", start).unwrap().allowed);
        assert!(limiter.admit_at("A", late).unwrap().allowed);
        assert!(limiter.admit_at("A", late).unwrap().allowed);
        // ...and a fresh full window opens two milliseconds later.
        for _ in 0..3 {
            assert!(limiter.admit_at("A", early_next).unwrap().allowed);
        }
        assert!(!limiter.admit_at("A", early_next).unwrap().allowed);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit_at("A", now).unwrap().allowed);
        assert!(!limiter.admit_at("A", now).unwrap().allowed);
        assert!(limiter.admit_at("B", now).unwrap().allowed);
    }

    #[test]
    fn test_sweep_evicts_idle_windows() {
        let limiter = FixedWindowLimiter::new(RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(1),
            retention: Duration::from_secs(5),
            max_clients: 100,
        });
        let start = Instant::now();

        limiter.admit_at("idle", start).unwrap();
        limiter.admit_at("busy", start + Duration::from_secs(4)).unwrap();
        assert_eq!(limiter.tracked_clients(), 2);

        let evicted = limiter.evict_idle_at(start + Duration::from_secs(6)).unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_full_table_evicts_oldest() {
        let limiter = FixedWindowLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
            retention: Duration::from_secs(600),
            max_clients: 2,
        });
        let start = Instant::now();

        limiter.admit_at("first", start).unwrap();
        limiter.admit_at("second", start + Duration::from_secs(1)).unwrap();
        limiter.admit_at("third", start + Duration::from_secs(2)).unwrap();
        assert_eq!(limiter.tracked_clients(), 2);

        // "first" lost its window, so it starts over.
        assert!(limiter.admit_at("first", start + Duration::from_secs(3)).unwrap().allowed);
        // "third" kept its window.
        assert!(!limiter.admit_at("third", start + Duration::from_secs(3)).unwrap().allowed);
    }

    #[test]
    fn test_concurrent_checks_never_over_admit() {
        let limiter = Arc::new(limiter(50, Duration::from_secs(60)));
        let admitted = Arc::new(AtomicU32::new(0));
        let now = Instant::now();

        std::thread::scope(|s| {
            for _ in 0..8 {
                let limiter = limiter.clone();
                let admitted = admitted.clone();
                s.spawn(move || {
                    for _ in 0..25 {
                        if limiter.admit_at("shared", now).unwrap().allowed {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_trait_admit_uses_wall_clock() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.admit("client").await.unwrap().allowed);
        assert!(!limiter.admit("client").await.unwrap().allowed);
        assert_eq!(limiter.evict_idle().await.unwrap(), 0);
    }
}
