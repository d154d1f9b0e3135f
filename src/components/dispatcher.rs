//! Named-event dispatcher shared by the application and the router.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An event fired through a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

pub trait Dispatcher: Send + Sync {
    /// Registers a listener for the named event.
    fn listen(&self, event: &str, listener: Listener);

    /// Fires an event and returns how many listeners received it.
    fn fire(&self, event: &Event) -> usize;

    fn has_listeners(&self, event: &str) -> bool;
}

/// Default in-process dispatcher.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl EventDispatcher {
    pub const CLASS: &'static str = "app_kernel::components::EventDispatcher";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Dispatcher for EventDispatcher {
    fn listen(&self, event: &str, listener: Listener) {
        self.listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    fn fire(&self, event: &Event) -> usize {
        // Listeners run outside the lock so they may register further listeners.
        let listeners = match self.listeners.read().get(&event.name) {
            Some(list) => list.clone(),
            None => return 0,
        };

        tracing::trace!(event = %event.name, listeners = listeners.len(), "firing event");
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    fn has_listeners(&self, event: &str) -> bool {
        self.listeners
            .read()
            .get(event)
            .map(|list| !list.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_fire_without_listeners() {
        let dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.fire(&Event::new("nothing", Value::Null)), 0);
        assert!(!dispatcher.has_listeners("nothing"));
    }

    #[test]
    fn test_listeners_receive_payload_in_order() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            dispatcher.listen(
                "app.test",
                Arc::new(move |event: &Event| {
                    seen.lock().push(format!("{}:{}", tag, event.payload["n"]));
                }),
            );
        }

        let notified = dispatcher.fire(&Event::new("app.test", json!({ "n": 7 })));
        assert_eq!(notified, 2);
        assert_eq!(*seen.lock(), vec!["first:7", "second:7"]);
    }

    #[test]
    fn test_listener_may_register_listener() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let inner = dispatcher.clone();
        dispatcher.listen(
            "outer",
            Arc::new(move |_: &Event| {
                inner.listen("late", Arc::new(|_: &Event| {}));
            }),
        );

        dispatcher.fire(&Event::new("outer", Value::Null));
        assert!(dispatcher.has_listeners("late"));
    }
}
