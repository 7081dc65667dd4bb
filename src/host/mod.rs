//! Host side of the bridge
//!
//! A [`Host`] owns the registry of native objects and serves one renderer at a
//! time over a transport: it answers init-requests with schema snapshots,
//! dispatches invoke-requests and pushes property and signal notifications.

pub mod dispatch;
mod emitter;
mod object;
mod registry;
pub mod schema;

pub use emitter::{Emitter, Property};
pub use object::{argument, Interface, NativeObject, PropertyDescriptor};
pub use registry::{ObjectRegistry, RegisteredObject};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, Notify};

use crate::protocol::Message;
use crate::transport::{MessageReceiver, MessageSender};
use crate::{Error, Result};

use emitter::Outbox;

/// Host end of a bridge channel
pub struct Host {
    registry: RwLock<ObjectRegistry>,

    /// Shared with every emitter handed out by `register`
    outbox: Arc<Outbox>,

    /// Receiving end of the outbox, owned by the running loop
    outbound: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,

    shutdown: Notify,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    pub fn new() -> Self {
        let (outbox, outbound) = Outbox::new();
        Self {
            registry: RwLock::new(ObjectRegistry::new()),
            outbox,
            outbound: Mutex::new(Some(outbound)),
            shutdown: Notify::new(),
        }
    }

    /// Build an object with an [`Emitter`] bound to `name` and register it
    ///
    /// Returns the object so host code can keep driving its setters.
    pub fn register<T, F>(&self, name: &str, build: F) -> Result<Arc<T>>
    where
        T: NativeObject + 'static,
        F: FnOnce(Emitter) -> T,
    {
        self.check_registration(name)?;

        let object = Arc::new(build(Emitter::new(name, self.outbox.clone())));
        self.register_object(name, object.clone())?;

        Ok(object)
    }

    /// Register an already constructed object
    pub fn register_object(&self, name: &str, object: Arc<dyn NativeObject>) -> Result<()> {
        self.check_registration(name)?;
        self.registry.write().register(name, object)?;

        tracing::info!("Registered bridge object: {}", name);
        Ok(())
    }

    fn check_registration(&self, name: &str) -> Result<()> {
        if self.outbox.is_initialized() {
            return Err(Error::Channel(format!(
                "Cannot register {} after the renderer has initialized",
                name
            )));
        }
        if self.registry.read().contains(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Names of all registered objects
    pub fn object_names(&self) -> Vec<String> {
        self.registry
            .read()
            .iter()
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Whether a renderer currently holds a schema snapshot
    pub fn is_initialized(&self) -> bool {
        self.outbox.is_initialized()
    }

    /// Hold property-changed messages (coalescing per property) until unblocked
    ///
    /// Signals and invoke-responses are not held, so while blocked they can
    /// reach the renderer ahead of property changes made earlier on the same
    /// object. Held changes are released in order of their first change.
    pub fn block_updates(&self, blocked: bool) {
        self.outbox.block_updates(blocked);
    }

    pub fn updates_blocked(&self) -> bool {
        self.outbox.updates_blocked()
    }

    /// Ask a running [`Host::run`] loop to flush and return
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Serve one renderer until it disconnects or [`Host::shutdown`] is called
    pub async fn run<S, R>(&self, sender: S, mut receiver: R) -> Result<()>
    where
        S: MessageSender,
        R: MessageReceiver,
    {
        let mut outbound = self
            .outbound
            .lock()
            .take()
            .ok_or_else(|| Error::Channel("Host is already serving a renderer".to_string()))?;

        tracing::info!("Host channel serving renderer");

        let mut result = Ok(());
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    tracing::debug!("Host received shutdown signal");
                    while let Ok(message) = outbound.try_recv() {
                        if let Err(e) = sender.send(&message).await {
                            tracing::warn!("Failed to flush {} on shutdown: {}", message.kind(), e);
                            break;
                        }
                    }
                    if let Err(e) = sender.close().await {
                        tracing::debug!("Failed to close host transport: {}", e);
                    }
                    break;
                }
                incoming = receiver.recv() => {
                    match incoming {
                        Ok(Some(message)) => self.handle_message(message),
                        Ok(None) => {
                            tracing::info!("Renderer disconnected");
                            break;
                        }
                        Err(e) => {
                            tracing::error!("Error reading from renderer: {}", e);
                            result = Err(e);
                            break;
                        }
                    }
                }
                Some(message) = outbound.recv() => {
                    tracing::trace!("Sending {}", message.kind());
                    if let Err(e) = sender.send(&message).await {
                        tracing::error!("Error writing to renderer: {}", e);
                        result = Err(e);
                        break;
                    }
                }
            }
        }

        // Undelivered traffic belongs to the renderer that just went away
        self.outbox.set_initialized(false);
        while outbound.try_recv().is_ok() {}
        *self.outbound.lock() = Some(outbound);

        result
    }

    /// Handle one message from the renderer
    fn handle_message(&self, message: Message) {
        match message {
            Message::InitRequest => {
                // Mark initialized before the snapshot so no change is lost. A
                // change racing the snapshot may be queued ahead of the
                // response; the renderer replays those onto its proxies.
                self.outbox.set_initialized(true);
                let schemas = schema::build_schemas(&self.registry.read());

                tracing::info!("Renderer initialized with {} objects", schemas.len());
                self.outbox.push(Message::InitResponse { schemas });
            }
            Message::InvokeRequest {
                object,
                method,
                args,
                id,
            } => {
                tracing::debug!("Invoking {}.{} (request {})", object, method, id);

                let outcome = self.invoke(&object, &method, &args);
                if let Err(e) = &outcome {
                    tracing::warn!("Call {}.{} failed: {}", object, method, e);
                }

                // Queued behind any notification the call produced
                self.outbox.push(Message::response(id, outcome));
            }
            other => {
                tracing::warn!("Ignoring unexpected {} from renderer", other.kind());
            }
        }
    }

    fn invoke(&self, object: &str, method: &str, args: &[JsonValue]) -> Result<JsonValue> {
        // Release the registry before running host code
        let entry = self.registry.read().lookup(object)?.clone();
        dispatch::dispatch(object, &entry, method, args)
    }
}
