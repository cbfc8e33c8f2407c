//! Dispatch fan-out
//!
//! Decoded dispatches go to the cache sink first, then to every handler
//! registered for their name.

mod cache;
mod router;
mod scheduler;

pub use cache::{CacheSink, EntityCache};
pub use router::{normalize, DispatchRouter};
pub use scheduler::{EventScheduler, Handler, ListenerId};

use std::sync::Arc;

use serde_json::Value;

use crate::error::DispatchError;
use crate::events::Event;

/// Router, scheduler and cache sink used by a connection
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<DispatchRouter>,
    scheduler: Arc<EventScheduler>,
    sink: Option<Arc<dyn CacheSink>>,
}

impl Dispatcher {
    pub fn new(router: Arc<DispatchRouter>, scheduler: Arc<EventScheduler>) -> Self {
        Self {
            router,
            scheduler,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn CacheSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn router(&self) -> &DispatchRouter {
        &self.router
    }

    pub fn scheduler(&self) -> &Arc<EventScheduler> {
        &self.scheduler
    }

    /// Decode a dispatch payload under the router's policy
    pub fn decode(&self, name: &str, data: Value) -> Result<Option<Event>, DispatchError> {
        self.router.route(name, data)
    }

    /// Store `event` in the sink and schedule its handlers.
    ///
    /// Returns the number of handler tasks spawned.
    pub fn deliver(&self, event: Event) -> usize {
        let event = Arc::new(event);
        let name = event.name().to_string();
        if let Some(sink) = &self.sink {
            sink.store(&name, &event);
        }
        self.scheduler.emit(&name, event)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("scheduler", &self.scheduler)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
