//! Event Module
//!
//! Typed publish/subscribe helper for side-channel notifications.
//!
//! Handlers are registered per named [`Event`] and invoked asynchronously on
//! [`EventBus::emit`], one tokio task per handler, so a slow or panicking
//! handler never affects the emitter or the other handlers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;

// == Event ==
/// A named event carrying data of type `T`.
pub struct Event<T> {
    name: &'static str,
    _marker: PhantomData<fn(T)>,
}

impl<T> Event<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Event<T> {}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Event").field(&self.name).finish()
    }
}

// == Event Bus ==
/// Registry of event handlers.
#[derive(Default)]
pub struct EventBus {
    /// Handlers by trimmed event name, each a boxed `Handler<T>`
    handlers: RwLock<HashMap<String, Vec<Box<dyn Any + Send + Sync>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide bus.
    pub fn global() -> &'static EventBus {
        static BUS: OnceLock<EventBus> = OnceLock::new();
        BUS.get_or_init(EventBus::new)
    }

    // == On ==
    /// Registers `handler` for `event`. Several handlers may share an event.
    pub fn on<T, H>(&self, event: &Event<T>, handler: H) -> Result<()>
    where
        T: 'static,
        H: Fn(T) + Send + Sync + 'static,
    {
        let name = event.name.trim();
        if name.is_empty() {
            return Err(CacheError::InvalidEvent(
                "event name cannot be empty".to_string(),
            ));
        }

        let handler: Handler<T> = Arc::new(handler);
        self.handlers
            .write()
            .entry(name.to_string())
            .or_default()
            .push(Box::new(handler));
        debug!(event = name, "Registered event handler");
        Ok(())
    }

    // == Emit ==
    /// Dispatches `data` to every handler of `event` and returns how many
    /// were dispatched.
    ///
    /// Inside a tokio runtime each handler runs on its own task. Outside one
    /// the handlers run inline, with panics caught.
    pub fn emit<T>(&self, event: &Event<T>, data: T) -> usize
    where
        T: Clone + Send + 'static,
    {
        let handlers: Vec<Handler<T>> = match self.handlers.read().get(event.name.trim()) {
            Some(registered) => registered
                .iter()
                .filter_map(|h| h.downcast_ref::<Handler<T>>())
                .cloned()
                .collect(),
            None => return 0,
        };

        let runtime = Handle::try_current().ok();
        for handler in &handlers {
            let handler = handler.clone();
            let data = data.clone();
            match &runtime {
                Some(runtime) => {
                    runtime.spawn(async move { handler(data) });
                }
                None => {
                    if panic::catch_unwind(AssertUnwindSafe(|| handler(data))).is_err() {
                        warn!(event = event.name, "Event handler panicked");
                    }
                }
            }
        }

        handlers.len()
    }

    /// Number of handlers registered under `name`.
    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers
            .read()
            .get(name.trim())
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.handlers.read().len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_emit_reaches_every_handler() {
        let bus = EventBus::new();
        let event = Event::<String>::new("foo");
        let (tx, mut rx) = mpsc::unbounded_channel();

        for tag in ["bar", "abc"] {
            let tx = tx.clone();
            bus.on(&event, move |data: String| {
                let _ = tx.send(format!("{tag}:{data}"));
            })
            .unwrap();
        }

        assert_eq!(bus.emit(&event, "testData".to_string()), 2);

        let mut received = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        received.sort();
        assert_eq!(received, vec!["abc:testData", "bar:testData"]);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let event = Event::<u32>::new("boom");
        let (tx, mut rx) = mpsc::unbounded_channel();

        bus.on(&event, |_| panic!("handler failure")).unwrap();
        bus.on(&event, move |n| {
            let _ = tx.send(n);
        })
        .unwrap();

        assert_eq!(bus.emit(&event, 7), 2);
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(7));
    }

    #[test]
    fn test_emit_without_runtime_runs_inline() {
        let bus = EventBus::new();
        let event = Event::<usize>::new("inline");
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        bus.on(&event, move |n| {
            counter.fetch_add(n, Ordering::SeqCst);
        })
        .unwrap();
        bus.on(&event, |_| panic!("handler failure")).unwrap();

        assert_eq!(bus.emit(&event, 3), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_empty_name_rejected() {
        let bus = EventBus::new();
        let result = bus.on(&Event::<()>::new("   "), |_| {});
        assert!(matches!(result, Err(CacheError::InvalidEvent(_))));
    }

    #[test]
    fn test_emit_unknown_event() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(&Event::<u8>::new("nobody"), 1), 0);
    }

    #[test]
    fn test_names_are_trimmed() {
        let bus = EventBus::new();
        bus.on(&Event::<u8>::new(" padded "), |_| {}).unwrap();
        assert_eq!(bus.handler_count("padded"), 1);
    }

    #[test]
    fn test_mismatched_payload_type_is_skipped() {
        let bus = EventBus::new();
        bus.on(&Event::<u8>::new("typed"), |_| {}).unwrap();
        assert_eq!(bus.emit(&Event::<String>::new("typed"), "x".to_string()), 0);
    }

    #[test]
    fn test_global_bus_is_shared() {
        let event = Event::<u8>::new("global.test");
        EventBus::global().on(&event, |_| {}).unwrap();
        assert!(EventBus::global().handler_count("global.test") >= 1);
    }
}
