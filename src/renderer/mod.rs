//! Renderer side of the bridge
//!
//! [`Renderer::connect`] performs the init handshake, builds one [`Proxy`] per
//! host object and then applies incoming notifications and call results on a
//! background task until the transport closes.

mod pending;
mod proxy;

pub use proxy::{ListenerId, Proxy};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::protocol::{Message, ObjectSchema};
use crate::transport::{MessageReceiver, MessageSender};
use crate::{Error, Result};

use pending::{PendingCalls, PendingGuard};

/// Issues invoke-requests and waits for their responses
pub(crate) struct CallEngine {
    sender: Arc<dyn MessageSender>,
    pending: PendingCalls,
    default_timeout: Option<Duration>,
    session: Uuid,
}

impl CallEngine {
    pub(crate) fn new(
        sender: Arc<dyn MessageSender>,
        default_timeout: Option<Duration>,
        session: Uuid,
    ) -> Self {
        Self {
            sender,
            pending: PendingCalls::new(),
            default_timeout,
            session,
        }
    }

    pub(crate) async fn invoke(
        &self,
        object: &str,
        method: &str,
        args: Vec<JsonValue>,
        timeout: Option<Duration>,
    ) -> Result<JsonValue> {
        let (id, rx) = self.pending.register()?;
        // Drops the entry on every exit path, including a dropped caller
        let _guard = PendingGuard::new(&self.pending, id.clone());

        tracing::debug!(session = %self.session, "Calling {}.{} (request {})", object, method, id);

        let request = Message::InvokeRequest {
            object: object.to_string(),
            method: method.to_string(),
            args,
            id,
        };
        match self.sender.send(&request).await {
            Ok(()) => {}
            Err(Error::Io(e)) => {
                tracing::warn!(session = %self.session, "Failed to send {}.{}: {}", object, method, e);
                return Err(Error::TransportClosed);
            }
            Err(e) => return Err(e),
        }

        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => rx.await,
        };

        // A dropped resolver means the table was torn down
        outcome.unwrap_or(Err(Error::TransportClosed))
    }
}

/// State shared between the renderer handle and its reader task
struct Session {
    id: Uuid,
    calls: Arc<CallEngine>,
    proxies: BTreeMap<String, Proxy>,
    closed: watch::Sender<bool>,
}

impl Session {
    fn handle_message(&self, message: Message) {
        match message {
            Message::InvokeResponse { id, result, error } => {
                let outcome = match error {
                    Some(info) => Err(Error::from(info)),
                    None => Ok(result.unwrap_or(JsonValue::Null)),
                };
                if !self.calls.pending.resolve(&id, outcome) {
                    tracing::debug!(session = %self.id, "No caller waiting for response {}", id);
                }
            }
            Message::PropertyChanged {
                object,
                property,
                value,
            } => match self.proxies.get(&object) {
                Some(proxy) => proxy.apply_property_change(&property, value),
                None => tracing::warn!(session = %self.id, "Property change for unknown object {}", object),
            },
            Message::SignalEmitted {
                object,
                signal,
                args,
            } => match self.proxies.get(&object) {
                Some(proxy) => proxy.dispatch_signal(&signal, &args),
                None => tracing::warn!(session = %self.id, "Signal for unknown object {}", object),
            },
            Message::InitResponse { .. } => {
                tracing::debug!(session = %self.id, "Ignoring repeated init-response");
            }
            other => {
                tracing::warn!(session = %self.id, "Ignoring unexpected {} from host", other.kind());
            }
        }
    }

    /// Fail pending calls, detach listeners and publish the closed state
    fn teardown(&self, reason: &str) {
        if self.calls.pending.is_closed() {
            return;
        }

        let failed = self.calls.pending.close();
        for proxy in self.proxies.values() {
            proxy.clear_listeners();
        }
        self.closed.send_replace(true);

        tracing::info!(
            session = %self.id,
            "Renderer channel closed ({}), {} pending calls failed",
            reason,
            failed
        );
    }
}

/// Renderer end of a bridge channel
pub struct Renderer {
    session: Arc<Session>,
    closed: watch::Receiver<bool>,
    reader: JoinHandle<()>,
}

impl Renderer {
    /// Request the schemas, build the proxies and start applying updates
    pub async fn connect<S, R>(sender: S, mut receiver: R, config: &BridgeConfig) -> Result<Self>
    where
        S: MessageSender,
        R: MessageReceiver,
    {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "Connecting renderer");

        sender.send(&Message::InitRequest).await?;

        let limit = config.init_timeout();
        let (schemas, early) = tokio::time::timeout(limit, Self::wait_for_schemas(&mut receiver))
            .await
            .map_err(|_| Error::Timeout(limit))??;

        let calls = Arc::new(CallEngine::new(Arc::new(sender), config.call_timeout(), id));
        let proxies: BTreeMap<String, Proxy> = schemas
            .into_iter()
            .map(|(name, schema)| {
                let proxy = Proxy::new(&name, schema, calls.clone());
                (name, proxy)
            })
            .collect();

        tracing::info!(session = %id, "Renderer initialized with {} objects", proxies.len());

        let (closed_tx, closed_rx) = watch::channel(false);
        let session = Arc::new(Session {
            id,
            calls,
            proxies,
            closed: closed_tx,
        });

        // Changes queued while the host was snapshotting, replayed in order
        // so each property ends at its latest value
        for message in early {
            session.handle_message(message);
        }

        let reader_session = session.clone();
        let reader = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(Some(message)) => reader_session.handle_message(message),
                    Ok(None) => {
                        tracing::info!(session = %reader_session.id, "Host stream closed (EOF)");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(session = %reader_session.id, "Error reading from host: {}", e);
                        break;
                    }
                }
            }
            reader_session.teardown("transport closed");
        });

        Ok(Self {
            session,
            closed: closed_rx,
            reader,
        })
    }

    /// Read up to the init-response, keeping property changes that precede it
    async fn wait_for_schemas<R: MessageReceiver>(
        receiver: &mut R,
    ) -> Result<(BTreeMap<String, ObjectSchema>, Vec<Message>)> {
        let mut early = Vec::new();
        loop {
            match receiver.recv().await? {
                Some(Message::InitResponse { schemas }) => return Ok((schemas, early)),
                Some(change @ Message::PropertyChanged { .. }) => early.push(change),
                Some(other) => {
                    tracing::debug!("Skipping {} received before init-response", other.kind());
                }
                None => return Err(Error::TransportClosed),
            }
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    /// Proxy for a host object
    pub fn object(&self, name: &str) -> Result<Proxy> {
        self.session
            .proxies
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownObject(name.to_string()))
    }

    /// Names of all mirrored objects
    pub fn objects(&self) -> Vec<String> {
        self.session.proxies.keys().cloned().collect()
    }

    /// Call a method by object name, without going through a proxy
    pub async fn invoke(
        &self,
        object: &str,
        method: &str,
        args: Vec<JsonValue>,
    ) -> Result<JsonValue> {
        let calls = &self.session.calls;
        calls.invoke(object, method, args, calls.default_timeout).await
    }

    /// Number of calls still waiting for a response
    pub fn pending_calls(&self) -> usize {
        self.session.calls.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Wait until the transport has closed
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        // The sender lives in the session we hold, so this cannot fail
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Close the transport and tear the channel down
    pub async fn close(self) {
        if let Err(e) = self.session.calls.sender.close().await {
            tracing::debug!(session = %self.session.id, "Failed to close renderer transport: {}", e);
        }
        self.reader.abort();
        self.session.teardown("closed by renderer");
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.reader.abort();
        self.session.teardown("renderer dropped");
    }
}
