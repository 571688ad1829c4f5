//! Connection lifecycle and the connection task.
//!
//! A [`Connection`] handle fronts a single task that exclusively owns
//! the TCP stream, the decode buffer, the `active` flag, the
//! server-assigned connection id, and the tracked-channel registry.
//! The task's `select!` loop is simultaneously the background read
//! loop (decode a frame, route it) and the servicer for commands sent
//! by handles. Because every outbound payload is framed and written
//! inside this one task, concurrent callers can never interleave
//! partial frames on the wire.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot, watch};
use voltr_protocol::{ProtocolError, command, decode_frame, encode_frame};

use crate::channel::{Channel, ChannelEntry, ChannelId, ChannelState, SubscribeAction};
use crate::config::ConnectConfig;
use crate::error::VoltrError;
use crate::events::{DirectHandler, MessageHandler, PeerHandler};

/// A snapshot of the connection's observable state, published on the
/// status watch by the connection task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// `true` between a successful handshake and close/session loss.
    pub active: bool,
    /// The server-assigned connection id (cid).
    pub client_id: Option<String>,
}

/// Commands sent from handles to the connection task.
pub(crate) enum Command {
    Channel {
        name: Option<String>,
        reply: oneshot::Sender<Result<Channel, VoltrError>>,
    },
    Subscribe {
        id: ChannelId,
        reply: oneshot::Sender<Result<(), VoltrError>>,
    },
    Unsubscribe {
        id: ChannelId,
        reply: oneshot::Sender<Result<(), VoltrError>>,
    },
    Publish {
        id: ChannelId,
        payload: Bytes,
        reply: oneshot::Sender<Result<(), VoltrError>>,
    },
    Broadcast {
        id: ChannelId,
        payload: Bytes,
        reply: oneshot::Sender<Result<(), VoltrError>>,
    },
    AwaitMessages {
        id: ChannelId,
        count: u64,
        reply: oneshot::Sender<()>,
    },
    SendDirect {
        cid: String,
        payload: Bytes,
        reply: oneshot::Sender<Result<(), VoltrError>>,
    },
    OnMessage {
        id: ChannelId,
        handler: MessageHandler,
    },
    OnPeerSubscribed {
        id: ChannelId,
        handler: PeerHandler,
    },
    OnPeerUnsubscribed {
        id: ChannelId,
        handler: PeerHandler,
    },
    OnDirectMessage {
        handler: DirectHandler,
    },
    Close {
        reply: oneshot::Sender<Result<(), VoltrError>>,
    },
}

/// Handle to an open Voltr session.
///
/// Cheap to clone; all clones drive the same connection task.
#[derive(Clone)]
pub struct Connection {
    cmd: mpsc::Sender<Command>,
    status: watch::Receiver<ConnectionStatus>,
}

impl Connection {
    /// Opens a session: connects, decodes exactly one frame, and
    /// routes it. If that frame does not activate the session
    /// (`!_connected <cid>`), the transport is closed and the call
    /// fails with [`VoltrError::Handshake`]. On success the
    /// connection task starts and reads for as long as the session
    /// stays active. There is no handshake timeout: a silent server
    /// suspends this call indefinitely.
    pub async fn open(config: ConnectConfig) -> Result<Self, VoltrError> {
        let stream = TcpStream::connect(&config.addr).await?;
        let (reader, writer) = stream.into_split();

        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());

        let mut actor = ConnectionActor {
            reader,
            writer,
            buf: BytesMut::with_capacity(4096),
            active: false,
            closing: false,
            client_id: None,
            channels: HashMap::new(),
            registry: Vec::new(),
            direct_handlers: Vec::new(),
            next_channel_id: 1,
            rx: cmd_rx,
            cmd: cmd_tx.clone(),
            status_tx,
            status_rx: status_rx.clone(),
        };

        let first = actor.read_one_frame().await.map_err(|e| match e {
            VoltrError::ConnectionClosed => {
                VoltrError::Handshake("connection closed before the handshake frame".into())
            }
            other => other,
        })?;
        actor.route(first);

        if !actor.active {
            let _ = actor.writer.shutdown().await;
            return Err(VoltrError::Handshake(
                "the remote server returned an invalid response".into(),
            ));
        }

        tracing::info!(addr = %config.addr, cid = ?actor.client_id, "voltr session established");
        tokio::spawn(actor.run());

        Ok(Self {
            cmd: cmd_tx,
            status: status_rx,
        })
    }

    /// `true` while the session is active (handshake done, not closed
    /// or lost).
    pub fn is_active(&self) -> bool {
        self.status.borrow().active
    }

    /// The server-assigned connection id, while the session is active.
    pub fn client_id(&self) -> Option<String> {
        self.status.borrow().client_id.clone()
    }

    /// Returns a fresh anonymous channel in the `Initial` state.
    /// Subscribing it asks the server to create and name a channel.
    pub async fn anonymous_channel(&self) -> Result<Channel, VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Channel { name: None, reply }).await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    /// Returns the channel with the given name: the existing tracked
    /// instance when one is registered, otherwise a fresh unattached
    /// channel carrying that name.
    pub async fn channel(&self, name: &str) -> Result<Channel, VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Channel {
            name: Some(name.to_string()),
            reply,
        })
        .await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    /// Sends a direct message to the connection identified by `cid`
    /// (`send @<cid> <payload>`).
    pub async fn send_direct(
        &self,
        cid: &str,
        payload: impl AsRef<[u8]>,
    ) -> Result<(), VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SendDirect {
            cid: cid.to_string(),
            payload: Bytes::copy_from_slice(payload.as_ref()),
            reply,
        })
        .await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    /// Registers a callback for direct messages. Every registered
    /// callback is invoked per message, order unspecified, on the
    /// connection task.
    pub async fn on_direct_message(
        &self,
        handler: impl Fn(&crate::events::DirectMessage) + Send + Sync + 'static,
    ) -> Result<(), VoltrError> {
        self.send(Command::OnDirectMessage {
            handler: Box::new(handler),
        })
        .await
    }

    /// Closes the session: best-effort unsubscribes every tracked
    /// channel in registry order, marks the connection inactive,
    /// shuts the transport down, and clears the registry and the cid.
    /// Handles held after this fail with
    /// [`VoltrError::ConnectionClosed`].
    pub async fn close(&self) -> Result<(), VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Close { reply }).await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    async fn send(&self, command: Command) -> Result<(), VoltrError> {
        self.cmd
            .send(command)
            .await
            .map_err(|_| VoltrError::ConnectionClosed)
    }
}

/// The connection task's state. Sole owner of the socket and the
/// channel registry; reachable only through [`Command`]s.
pub(crate) struct ConnectionActor {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    buf: BytesMut,

    pub(crate) active: bool,
    closing: bool,
    pub(crate) client_id: Option<String>,

    /// Every channel ever handed out on this connection.
    pub(crate) channels: HashMap<ChannelId, ChannelEntry>,
    /// Tracked channels in insertion order. A channel appears here
    /// iff its state is Holding or Subscribed; the newest Holding
    /// entry is the one a create acknowledgment correlates to.
    pub(crate) registry: Vec<ChannelId>,

    pub(crate) direct_handlers: Vec<DirectHandler>,

    next_channel_id: u64,
    rx: mpsc::Receiver<Command>,
    cmd: mpsc::Sender<Command>,
    pub(crate) status_tx: watch::Sender<ConnectionStatus>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl ConnectionActor {
    /// Runs the task: service commands and, while the session is
    /// active, read and route inbound frames.
    pub(crate) async fn run(mut self) {
        // Frames that arrived in the same read as the handshake
        // greeting are already buffered; route them first.
        if let Err(e) = self.drain_frames() {
            tracing::error!(error = %e, "framing error, terminating session");
            self.deactivate();
        }
        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        // All handles dropped; nothing can reach us.
                        None => break,
                    }
                    if self.closing {
                        break;
                    }
                }
                read = self.reader.read_buf(&mut self.buf), if self.active => {
                    match read {
                        Ok(0) => {
                            tracing::info!("server closed the connection");
                            self.deactivate();
                        }
                        Ok(_) => {
                            if let Err(e) = self.drain_frames() {
                                tracing::error!(error = %e, "framing error, terminating session");
                                self.deactivate();
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "read failed, terminating session");
                            self.deactivate();
                        }
                    }
                }
            }
        }
        tracing::debug!("connection task stopped");
    }

    /// Decodes and routes every complete frame currently buffered.
    /// A framing error here is fatal: the frame boundary is lost.
    fn drain_frames(&mut self) -> Result<(), ProtocolError> {
        while let Some(frame) = decode_frame(&mut self.buf)? {
            self.route(frame);
        }
        Ok(())
    }

    /// Reads until one whole frame is decoded (handshake path).
    async fn read_one_frame(&mut self) -> Result<Bytes, VoltrError> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(frame);
            }
            let n = self.reader.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(VoltrError::ConnectionClosed);
            }
        }
    }

    /// Marks the session lost: stop reading, fail future operations,
    /// and release every caller parked on an acknowledgment or a
    /// message counter (they observe `ConnectionClosed`). The cid
    /// stays for inspection; only `close()` clears it.
    fn deactivate(&mut self) {
        self.active = false;
        self.status_tx.send_modify(|s| s.active = false);
        for entry in self.channels.values_mut() {
            entry.abort_pending();
        }
    }

    /// Frames `payload` and writes it. Only ever called on this task,
    /// which is what serializes concurrent writers.
    async fn write_frame(&mut self, payload: &[u8]) -> Result<(), VoltrError> {
        let mut buf = BytesMut::with_capacity(payload.len() + 12);
        encode_frame(payload, &mut buf);
        self.writer.write_all(&buf).await?;
        Ok(())
    }

    /// Adds a channel to the tracked registry.
    fn track(&mut self, id: ChannelId) -> Result<(), VoltrError> {
        if !self.active {
            return Err(VoltrError::NotActive);
        }
        if self.registry.contains(&id) {
            return Err(VoltrError::AlreadyTracked);
        }
        self.registry.push(id);
        Ok(())
    }

    /// Removes a channel from the tracked registry.
    pub(crate) fn untrack(&mut self, id: ChannelId) -> Result<(), VoltrError> {
        if !self.active {
            return Err(VoltrError::NotActive);
        }
        let pos = self
            .registry
            .iter()
            .position(|candidate| *candidate == id)
            .ok_or(VoltrError::NotTracked)?;
        self.registry.remove(pos);
        Ok(())
    }

    /// Builds a public handle for an existing entry.
    fn handle_for(&self, id: ChannelId) -> Option<Channel> {
        let entry = self.channels.get(&id)?;
        Some(Channel {
            id,
            cmd: self.cmd.clone(),
            status: entry.watch(),
            conn_status: self.status_rx.clone(),
        })
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Channel { name, reply } => {
                let _ = reply.send(self.get_channel(name));
            }
            Command::Subscribe { id, reply } => {
                self.subscribe(id, reply).await;
            }
            Command::Unsubscribe { id, reply } => {
                let result = self.unsubscribe(id).await;
                let _ = reply.send(result);
            }
            Command::Publish { id, payload, reply } => {
                let result = self.publish_on(id, &payload, false).await;
                let _ = reply.send(result);
            }
            Command::Broadcast { id, payload, reply } => {
                let result = self.publish_on(id, &payload, true).await;
                let _ = reply.send(result);
            }
            Command::AwaitMessages { id, count, reply } => {
                if let Some(entry) = self.channels.get_mut(&id) {
                    if count > 0 && !self.active {
                        // No message can arrive; dropping the reply
                        // surfaces the loss as ConnectionClosed.
                        drop(reply);
                    } else {
                        entry.await_messages(count, reply);
                    }
                }
            }
            Command::SendDirect { cid, payload, reply } => {
                let result = self.send_direct(&cid, &payload).await;
                let _ = reply.send(result);
            }
            Command::OnMessage { id, handler } => {
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.add_message_handler(handler);
                }
            }
            Command::OnPeerSubscribed { id, handler } => {
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.add_peer_subscribed_handler(handler);
                }
            }
            Command::OnPeerUnsubscribed { id, handler } => {
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.add_peer_unsubscribed_handler(handler);
                }
            }
            Command::OnDirectMessage { handler } => {
                self.direct_handlers.push(handler);
            }
            Command::Close { reply } => {
                let result = self.close().await;
                let _ = reply.send(result);
            }
        }
    }

    /// Channel factory. Named lookups are idempotent against the
    /// tracked registry; anything else is a fresh entry.
    fn get_channel(&mut self, name: Option<String>) -> Result<Channel, VoltrError> {
        if !self.active {
            return Err(VoltrError::NotActive);
        }

        if let Some(name) = &name {
            let existing = self
                .registry
                .iter()
                .copied()
                .find(|id| {
                    self.channels
                        .get(id)
                        .is_some_and(|e| e.name.as_deref() == Some(name))
                })
                .and_then(|id| self.handle_for(id));
            if let Some(channel) = existing {
                return Ok(channel);
            }
        }

        let id = ChannelId(self.next_channel_id);
        self.next_channel_id += 1;
        let entry = ChannelEntry::new(id, name);
        let channel = Channel {
            id,
            cmd: self.cmd.clone(),
            status: entry.watch(),
            conn_status: self.status_rx.clone(),
        };
        self.channels.insert(id, entry);
        Ok(channel)
    }

    /// The subscribe side effects: track, emit the subscribe frame,
    /// and either reply immediately (named) or park the reply until
    /// the create acknowledgment routes (anonymous).
    async fn subscribe(&mut self, id: ChannelId, reply: oneshot::Sender<Result<(), VoltrError>>) {
        if !self.active {
            let _ = reply.send(Err(VoltrError::NotActive));
            return;
        }

        // Anonymous subscribes are serialized: the create
        // acknowledgment carries no request id, so at most one
        // channel may be Holding at a time for the positional
        // correlation to be exact.
        let holding_in_flight = self
            .registry
            .iter()
            .any(|id| self.channels.get(id).is_some_and(|e| e.state == ChannelState::Holding));

        let Some(entry) = self.channels.get_mut(&id) else {
            let _ = reply.send(Err(VoltrError::ConnectionClosed));
            return;
        };
        let previous = entry.state;
        if previous == ChannelState::Initial && holding_in_flight {
            let _ = reply.send(Err(VoltrError::SubscribePending));
            return;
        }

        let action = match entry.begin_subscribe() {
            Ok(action) => action,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };
        if let Err(e) = self.track(id) {
            if let Some(entry) = self.channels.get_mut(&id) {
                entry.revert(previous);
            }
            let _ = reply.send(Err(e));
            return;
        }

        let payload = match &action {
            SubscribeAction::Anonymous => command::subscribe(None),
            SubscribeAction::Named(name) => command::subscribe(Some(name.as_str())),
        };
        if let Err(e) = self.write_frame(&payload).await {
            let _ = self.untrack(id);
            if let Some(entry) = self.channels.get_mut(&id) {
                entry.revert(previous);
            }
            let _ = reply.send(Err(e));
            return;
        }

        match action {
            SubscribeAction::Anonymous => {
                // Suspend the caller until `_created`/`_createfailed`.
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.park_subscriber(reply);
                }
            }
            SubscribeAction::Named(_) => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    async fn unsubscribe(&mut self, id: ChannelId) -> Result<(), VoltrError> {
        if !self.active {
            return Err(VoltrError::NotActive);
        }
        let entry = self
            .channels
            .get_mut(&id)
            .ok_or(VoltrError::ConnectionClosed)?;
        let name = entry.begin_unsubscribe()?;
        self.untrack(id)?;
        self.write_frame(&command::unsubscribe(&name)).await
    }

    /// `publish` / `broadcast`: fire-and-forget, but the channel must
    /// have a name and the session must be active.
    async fn publish_on(
        &mut self,
        id: ChannelId,
        payload: &[u8],
        broadcast: bool,
    ) -> Result<(), VoltrError> {
        if !self.active {
            return Err(VoltrError::NotActive);
        }
        let entry = self.channels.get(&id).ok_or(VoltrError::ConnectionClosed)?;
        let name = entry.name.clone().ok_or(VoltrError::Unnamed)?;
        let payload = if broadcast {
            command::broadcast(&name, payload)
        } else {
            command::publish(&name, payload)
        };
        self.write_frame(&payload).await
    }

    async fn send_direct(&mut self, cid: &str, payload: &[u8]) -> Result<(), VoltrError> {
        if !self.active {
            return Err(VoltrError::NotActive);
        }
        self.write_frame(&command::send_direct(cid, payload)).await
    }

    /// Close: unsubscribe tracked channels in registry order
    /// (best-effort), deactivate, shut the transport down, clear the
    /// registry and the cid, and stop the task.
    async fn close(&mut self) -> Result<(), VoltrError> {
        for id in self.registry.clone() {
            let Some(entry) = self.channels.get_mut(&id) else {
                continue;
            };
            match entry.begin_unsubscribe() {
                Ok(name) => {
                    if let Err(e) = self.write_frame(&command::unsubscribe(&name)).await {
                        tracing::debug!(channel = %id, error = %e, "unsubscribe on close failed");
                    }
                }
                Err(e) => {
                    // E.g. a Holding channel; its parked subscriber is
                    // released with ConnectionClosed when we drop.
                    tracing::debug!(channel = %id, error = %e, "skipping channel on close");
                }
            }
        }

        self.registry.clear();
        self.active = false;
        self.client_id = None;
        self.status_tx.send_replace(ConnectionStatus::default());
        let _ = self.writer.shutdown().await;
        self.closing = true;
        tracing::info!("voltr session closed");
        Ok(())
    }
}
