//! Handler scheduling
//!
//! Every handler invocation runs as its own task, so a slow or failing
//! handler never holds up the read loop or other handlers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

use super::router::normalize;
use crate::events::Event;

/// Handler callback; errors are logged, never propagated
pub type Handler = Arc<dyn Fn(Arc<Event>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Handle for removing a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    handler: Handler,
    once: bool,
}

/// Registry of listeners plus the tasks running them
pub struct EventScheduler {
    listeners: DashMap<String, Vec<Listener>>,
    waiters: DashMap<String, Vec<oneshot::Sender<Arc<Event>>>>,
    aliases: HashMap<String, String>,
    tracker: TaskTracker,
    next_id: AtomicU64,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl EventScheduler {
    /// `aliases` maps alternative names to canonical event names
    pub fn new(aliases: HashMap<String, String>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(alias, target)| (normalize(&alias), normalize(&target)))
            .collect();

        Self {
            listeners: DashMap::new(),
            waiters: DashMap::new(),
            aliases,
            tracker: TaskTracker::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Canonical name for `event`, following aliases
    pub fn resolve(&self, event: &str) -> String {
        let name = normalize(event);
        self.aliases.get(&name).cloned().unwrap_or(name)
    }

    /// Run `handler` for every `event` dispatch
    pub fn on<F, Fut>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add(event, boxed(handler), false)
    }

    /// Run `handler` for the next `event` dispatch only
    pub fn once<F, Fut>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add(event, boxed(handler), true)
    }

    /// Register an already boxed handler
    pub fn add(&self, event: &str, handler: Handler, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = self.resolve(event);
        tracing::debug!(event = %name, listener = id.0, once, "Listener registered");
        self.listeners
            .entry(name)
            .or_default()
            .push(Listener { id, handler, once });
        id
    }

    /// Remove one listener; returns whether it was registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.listeners.retain(|_, listeners| {
            let before = listeners.len();
            listeners.retain(|l| l.id != id);
            removed |= listeners.len() != before;
            !listeners.is_empty()
        });
        removed
    }

    /// Remove every listener for `event`; returns how many were removed
    pub fn remove_all(&self, event: &str) -> usize {
        self.listeners
            .remove(&self.resolve(event))
            .map_or(0, |(_, listeners)| listeners.len())
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .get(&self.resolve(event))
            .map_or(0, |listeners| listeners.len())
    }

    /// Pending `wait_for` calls for `event`
    pub fn waiter_count(&self, event: &str) -> usize {
        self.waiters
            .get(&self.resolve(event))
            .map_or(0, |waiters| waiters.iter().filter(|w| !w.is_closed()).count())
    }

    /// Wait for the next `event` dispatch, or `None` after `timeout`
    pub async fn wait_for(&self, event: &str, timeout: Duration) -> Option<Arc<Event>> {
        let name = self.resolve(event);
        let (tx, rx) = oneshot::channel();
        {
            let mut waiters = self.waiters.entry(name.clone()).or_default();
            // Waiters whose caller went away
            waiters.retain(|waiter| !waiter.is_closed());
            waiters.push(tx);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(event)) => Some(event),
            _ => {
                self.prune_waiters(&name);
                None
            }
        }
    }

    fn prune_waiters(&self, name: &str) {
        if let Some(mut waiters) = self.waiters.get_mut(name) {
            waiters.retain(|waiter| !waiter.is_closed());
        }
        self.waiters.remove_if(name, |_, waiters| waiters.is_empty());
    }

    /// Hand `event` to every listener and waiter registered under `name`.
    ///
    /// Returns the number of handler tasks spawned.
    pub fn emit(&self, name: &str, event: Arc<Event>) -> usize {
        let name = normalize(name);

        if let Some((_, waiters)) = self.waiters.remove(&name) {
            for waiter in waiters {
                let _ = waiter.send(Arc::clone(&event));
            }
        }

        let handlers: Vec<Handler> = match self.listeners.get_mut(&name) {
            Some(mut listeners) => {
                let handlers = listeners.iter().map(|l| Arc::clone(&l.handler)).collect();
                listeners.retain(|l| !l.once);
                handlers
            }
            None => return 0,
        };
        self.listeners.remove_if(&name, |_, listeners| listeners.is_empty());

        for handler in &handlers {
            let handler = Arc::clone(handler);
            let event = Arc::clone(&event);
            let name = name.clone();
            self.tracker.spawn(async move {
                if let Err(e) = handler(event).await {
                    tracing::warn!(event = %name, error = %e, "Event handler failed");
                }
            });
        }

        tracing::trace!(event = %name, handlers = handlers.len(), "Event scheduled");
        handlers.len()
    }

    /// Handler tasks still running
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work and wait for running handlers
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl std::fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventScheduler")
            .field("events", &self.listeners.len())
            .field("aliases", &self.aliases.len())
            .field("running", &self.tracker.len())
            .finish()
    }
}

fn boxed<F, Fut>(handler: F) -> Handler
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| handler(event).boxed())
}
