//! Renderer-side mirror of a host object

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::CallEngine;
use crate::protocol::{MethodDescriptor, ObjectSchema};
use crate::{Error, Result};

type PropertyCallback = Arc<dyn Fn(&JsonValue) + Send + Sync>;
type SignalCallback = Arc<dyn Fn(&[JsonValue]) + Send + Sync>;

/// Handle returned when attaching a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

enum Listener {
    Property { name: String, callback: PropertyCallback },
    Signal { name: String, callback: SignalCallback },
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    fn add(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }
}

struct ProxyInner {
    name: String,
    methods: Vec<MethodDescriptor>,
    signals: Vec<String>,
    notify: BTreeMap<String, String>,
    properties: RwLock<BTreeMap<String, JsonValue>>,
    listeners: Mutex<Listeners>,
    calls: Arc<CallEngine>,
}

/// Mirror of one host object
///
/// Property reads are served from a local cache that the host keeps current.
/// Method calls travel to the host and resolve when its response arrives.
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

impl Proxy {
    pub(crate) fn new(name: &str, schema: ObjectSchema, calls: Arc<CallEngine>) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                name: name.to_string(),
                methods: schema.methods,
                signals: schema.signals,
                notify: schema.notify,
                properties: RwLock::new(schema.properties),
                listeners: Mutex::new(Listeners::default()),
                calls,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Cached value of a property
    pub fn property(&self, name: &str) -> Option<JsonValue> {
        self.inner.properties.read().get(name).cloned()
    }

    /// Cached value of a property decoded as `T`
    pub fn property_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.property(name).ok_or_else(|| {
            Error::Argument(format!("{} has no property {}", self.inner.name, name))
        })?;
        Ok(serde_json::from_value(value)?)
    }

    /// Snapshot of every cached property
    pub fn properties(&self) -> BTreeMap<String, JsonValue> {
        self.inner.properties.read().clone()
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.inner.methods
    }

    pub fn signals(&self) -> &[String] {
        &self.inner.signals
    }

    /// Call a host method with the default timeout
    pub async fn call(&self, method: &str, args: Vec<JsonValue>) -> Result<JsonValue> {
        let timeout = self.inner.calls.default_timeout;
        self.inner
            .calls
            .invoke(&self.inner.name, method, args, timeout)
            .await
    }

    /// Call a host method, failing locally with `Timeout` after `timeout`
    pub async fn call_with_timeout(
        &self,
        method: &str,
        args: Vec<JsonValue>,
        timeout: Duration,
    ) -> Result<JsonValue> {
        self.inner
            .calls
            .invoke(&self.inner.name, method, args, Some(timeout))
            .await
    }

    /// Run `callback` with the new value whenever `property` changes
    pub fn on_property_changed<F>(&self, property: &str, callback: F) -> ListenerId
    where
        F: Fn(&JsonValue) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().add(Listener::Property {
            name: property.to_string(),
            callback: Arc::new(callback),
        })
    }

    /// Run `callback` with the signal arguments whenever `signal` fires
    ///
    /// A property's notify signal fires with the new value as its only
    /// argument.
    pub fn on_signal<F>(&self, signal: &str, callback: F) -> ListenerId
    where
        F: Fn(&[JsonValue]) + Send + Sync + 'static,
    {
        if !self.inner.signals.iter().any(|s| s == signal) {
            tracing::warn!("{} declares no signal {}", self.inner.name, signal);
        }

        self.inner.listeners.lock().add(Listener::Signal {
            name: signal.to_string(),
            callback: Arc::new(callback),
        })
    }

    /// Detach a listener; false if it was already gone
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _)| *entry != id);
        listeners.entries.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().entries.len()
    }

    pub(crate) fn clear_listeners(&self) {
        self.inner.listeners.lock().entries.clear();
    }

    /// Apply a property-changed message
    pub(crate) fn apply_property_change(&self, property: &str, value: JsonValue) {
        {
            let mut properties = self.inner.properties.write();
            if !properties.contains_key(property) {
                tracing::warn!("{} reported unknown property {}", self.inner.name, property);
            }
            properties.insert(property.to_string(), value.clone());
        }

        let notify = self.inner.notify.get(property);
        let (property_callbacks, signal_callbacks) = {
            let listeners = self.inner.listeners.lock();
            let mut property_callbacks = Vec::new();
            let mut signal_callbacks = Vec::new();
            for (_, listener) in &listeners.entries {
                match listener {
                    Listener::Property { name, callback } if name == property => {
                        property_callbacks.push(callback.clone())
                    }
                    Listener::Signal { name, callback } if Some(name) == notify => {
                        signal_callbacks.push(callback.clone())
                    }
                    _ => {}
                }
            }
            (property_callbacks, signal_callbacks)
        };

        // Callbacks run unlocked so they may attach or detach listeners
        for callback in property_callbacks {
            callback(&value);
        }
        for callback in signal_callbacks {
            callback(std::slice::from_ref(&value));
        }
    }

    /// Apply a signal-emitted message
    pub(crate) fn dispatch_signal(&self, signal: &str, args: &[JsonValue]) {
        let callbacks: Vec<SignalCallback> = self
            .inner
            .listeners
            .lock()
            .entries
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::Signal { name, callback } if name == signal => Some(callback.clone()),
                _ => None,
            })
            .collect();

        for callback in callbacks {
            callback(args);
        }
    }
}
