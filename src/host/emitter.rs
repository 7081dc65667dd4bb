//! Host-side change propagation
//!
//! Objects report property changes and signals through an [`Emitter`]. All
//! notifications of a host share one ordered outbound queue, which is also the
//! queue invoke-responses go through.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;

use crate::protocol::Message;
use crate::Result;

/// Property change held back while updates are blocked
#[derive(Debug)]
struct HeldUpdate {
    object: String,
    property: String,
    value: JsonValue,
}

/// Ordered outbound queue of a host channel
pub(crate) struct Outbox {
    queue: mpsc::UnboundedSender<Message>,

    /// Set while a renderer holds a schema snapshot
    initialized: AtomicBool,

    /// `Some` while property updates are blocked
    held: Mutex<Option<Vec<HeldUpdate>>>,
}

impl Outbox {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbox = Arc::new(Self {
            queue: tx,
            initialized: AtomicBool::new(false),
            held: Mutex::new(None),
        });
        (outbox, rx)
    }

    /// Queue a message unconditionally
    pub(crate) fn push(&self, message: Message) {
        if self.queue.send(message).is_err() {
            tracing::debug!("Host channel dropped, discarding outbound message");
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub(crate) fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::SeqCst);
        if !initialized {
            if let Some(held) = self.held.lock().as_mut() {
                held.clear();
            }
        }
    }

    pub(crate) fn updates_blocked(&self) -> bool {
        self.held.lock().is_some()
    }

    /// Start holding property updates, or release the held ones in order
    pub(crate) fn block_updates(&self, blocked: bool) {
        let mut held = self.held.lock();
        let previous = held.take();
        match (blocked, previous) {
            (true, pending) => *held = Some(pending.unwrap_or_default()),
            (false, Some(pending)) => {
                tracing::debug!("Flushing {} held property updates", pending.len());
                for update in pending {
                    self.push(Message::PropertyChanged {
                        object: update.object,
                        property: update.property,
                        value: update.value,
                    });
                }
            }
            (false, None) => {}
        }
    }

    fn property_changed(&self, object: &str, property: &str, value: JsonValue) {
        if !self.is_initialized() {
            tracing::trace!("No renderer attached, dropping {}.{} change", object, property);
            return;
        }

        // The lock is kept while queueing so a concurrent unblock cannot
        // overtake this update.
        let mut held = self.held.lock();
        match held.as_mut() {
            Some(pending) => {
                match pending
                    .iter_mut()
                    .find(|u| u.object == object && u.property == property)
                {
                    Some(existing) => existing.value = value,
                    None => pending.push(HeldUpdate {
                        object: object.to_string(),
                        property: property.to_string(),
                        value,
                    }),
                }
            }
            None => self.push(Message::PropertyChanged {
                object: object.to_string(),
                property: property.to_string(),
                value,
            }),
        }
    }

    fn signal_emitted(&self, object: &str, signal: &str, args: Vec<JsonValue>) {
        if !self.is_initialized() {
            tracing::trace!("No renderer attached, dropping {}.{} signal", object, signal);
            return;
        }

        self.push(Message::SignalEmitted {
            object: object.to_string(),
            signal: signal.to_string(),
            args,
        });
    }
}

/// Handle an object uses to publish its changes
#[derive(Clone)]
pub struct Emitter {
    object: Arc<str>,
    outbox: Arc<Outbox>,
}

impl Emitter {
    pub(crate) fn new(object: &str, outbox: Arc<Outbox>) -> Self {
        Self {
            object: Arc::from(object),
            outbox,
        }
    }

    /// Name the object was registered under
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Report that `property` now holds `value`
    pub fn property_changed(&self, property: &str, value: JsonValue) {
        self.outbox.property_changed(&self.object, property, value);
    }

    /// Emit `signal`; every emission is delivered
    pub fn emit(&self, signal: &str, args: Vec<JsonValue>) {
        self.outbox.signal_emitted(&self.object, signal, args);
    }
}

/// Encapsulated property value
///
/// Writes go through [`Property::set`] or [`Property::update`], which store
/// and report a value only when it differs from the current one.
pub struct Property<T> {
    name: &'static str,
    value: Mutex<T>,
}

impl<T> Property<T>
where
    T: Clone + PartialEq + Serialize,
{
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            name,
            value: Mutex::new(initial),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    /// Current value as JSON
    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(&*self.value.lock())?)
    }

    /// Store `value`; returns whether it changed
    pub fn set(&self, emitter: &Emitter, value: T) -> Result<bool> {
        self.update(emitter, |_| value)
    }

    /// Atomically replace the value with `f(current)`; returns whether it changed
    pub fn update<F>(&self, emitter: &Emitter, f: F) -> Result<bool>
    where
        F: FnOnce(&T) -> T,
    {
        self.try_update(emitter, |current| Ok(f(current)))
    }

    /// Like [`Property::update`], but `f` may reject the change
    pub fn try_update<F>(&self, emitter: &Emitter, f: F) -> Result<bool>
    where
        F: FnOnce(&T) -> Result<T>,
    {
        let mut current = self.value.lock();
        let next = f(&*current)?;
        if *current == next {
            return Ok(false);
        }

        // Serialize first so a failure leaves the old value in place
        let json = serde_json::to_value(&next)?;
        *current = next;
        emitter.property_changed(self.name, json);

        Ok(true)
    }
}
