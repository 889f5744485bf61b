//! Outbound rate limiting per target.
//!
//! # Semantics
//! Fixed window: the first acquisition after a window has expired starts a
//! new window of `window_ms`; at most `permits_per_window` acquisitions
//! succeed inside it. Exhaustion is reported immediately, nothing waits.
//!
//! # Design Decisions
//! - One limiter per target, owned by the registry
//! - Non-blocking: a rejected call goes straight to its fallback
//! - Disabled limiters admit everything and report `u32::MAX` permits

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Permits left in the current window.
#[derive(Debug)]
struct FixedWindow {
    started_at: Option<Instant>,
    used: u32,
}

impl FixedWindow {
    fn roll(&mut self, config: &RateLimitConfig, now: Instant) {
        let expired = self
            .started_at
            .map(|start| now.duration_since(start) >= config.window())
            .unwrap_or(true);
        if expired {
            self.started_at = Some(now);
            self.used = 0;
        }
    }
}

/// Per-target outbound rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<FixedWindow>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            window: Mutex::new(FixedWindow {
                started_at: None,
                used: 0,
            }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, FixedWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take one permit if available.
    pub fn try_acquire(&self) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut window = self.lock();
        window.roll(&self.config, Instant::now());

        if window.used < self.config.permits_per_window {
            window.used += 1;
            true
        } else {
            false
        }
    }

    /// Permits an acquisition made now would find.
    pub fn available_permits(&self) -> u32 {
        if !self.config.enabled {
            return u32::MAX;
        }

        let window = self.lock();
        let expired = window
            .started_at
            .map(|start| start.elapsed() >= self.config.window())
            .unwrap_or(true);
        if expired {
            self.config.permits_per_window
        } else {
            self.config.permits_per_window.saturating_sub(window.used)
        }
    }
}
