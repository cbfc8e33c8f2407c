//! Outbound send limiting
//!
//! Every outbound frame except the close frame passes a local fixed-window
//! limiter. Handshake and presence frames additionally wait for the REST
//! layer's global gate.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chat_common::GatewayConfig;
use chat_rest::GlobalGate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Which gates a frame must pass before it is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendGate {
    /// Local limiter only; heartbeats must not starve behind a REST outage
    Local,
    /// Local limiter and the global REST gate
    Global,
}

/// Limiter shared by every frame written on a connection
pub struct SendLimiter {
    local: DefaultDirectRateLimiter,
    global: Arc<GlobalGate>,
}

impl SendLimiter {
    /// Allow `limit` sends per `period`
    pub fn new(limit: u32, period: Duration, global: Arc<GlobalGate>) -> Self {
        let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period / burst.get())
            .map_or_else(|| Quota::per_second(burst), |quota| quota.allow_burst(burst));

        Self {
            local: RateLimiter::direct(quota),
            global,
        }
    }

    pub fn from_config(config: &GatewayConfig, global: Arc<GlobalGate>) -> Self {
        Self::new(config.send_limit, config.send_limit_period(), global)
    }

    /// Wait until a frame behind `gate` may be sent
    pub async fn ready(&self, gate: SendGate) {
        if gate == SendGate::Global {
            self.global.wait().await;
        }
        self.local.until_ready().await;
    }

    /// Take a send slot without waiting, if one is free
    pub fn try_acquire(&self) -> bool {
        self.local.check().is_ok()
    }
}

impl std::fmt::Debug for SendLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendLimiter")
            .field("global_open", &self.global.is_open())
            .finish()
    }
}
