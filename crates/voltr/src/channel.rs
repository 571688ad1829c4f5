//! Per-channel subscription state machine and the public [`Channel`]
//! handle.
//!
//! The authoritative state of every channel lives in a
//! [`ChannelEntry`] owned by the connection task. The [`Channel`]
//! handle is a cheap clone (an id, a command sender, and a status
//! watch): operations are commands sent to the connection task, and
//! observation (`state()`, `name()`) reads the watch without
//! suspending.

use std::fmt;

use bytes::Bytes;
use tokio::sync::{oneshot, watch};
use voltr_protocol::{ChannelControl, parse_channel_control, split_identifier};

use crate::connection::{Command, ConnectionStatus};
use crate::error::VoltrError;
use crate::events::{ChannelMessage, MessageHandler, PeerEvent, PeerHandler};

/// Opaque identifier for a channel within one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub(crate) u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan-{}", self.0)
    }
}

/// The subscription lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Anonymous channel, never subscribed; no name yet.
    Initial,
    /// `subscribe _` sent, awaiting the server-assigned name.
    Holding,
    /// Subscribed; messages flow.
    Subscribed,
    /// Named but not currently subscribed.
    Unsubscribed,
    /// The server rejected the anonymous creation. Terminal.
    Errored,
}

impl ChannelState {
    /// Returns `true` when the channel belongs in the tracked
    /// registry: exactly the Holding and Subscribed states.
    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::Holding | Self::Subscribed)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initial => "Initial",
            Self::Holding => "Holding",
            Self::Subscribed => "Subscribed",
            Self::Unsubscribed => "Unsubscribed",
            Self::Errored => "Errored",
        };
        write!(f, "{s}")
    }
}

/// A snapshot of a channel's observable state, published on the
/// status watch after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    /// Current lifecycle state.
    pub state: ChannelState,
    /// The channel name, if assigned.
    pub name: Option<String>,
}

/// What frame a `subscribe` transition must put on the wire.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SubscribeAction {
    /// `subscribe _` — caller suspends until the acknowledgment.
    Anonymous,
    /// `subscribe <name>` — completes immediately.
    Named(String),
}

/// Connection-task-side state for one channel.
pub(crate) struct ChannelEntry {
    pub(crate) id: ChannelId,
    pub(crate) state: ChannelState,
    pub(crate) name: Option<String>,

    /// Countdown for `await_messages`; decremented per inbound
    /// message while positive.
    pending: u64,
    /// Wakeups released when `pending` reaches zero.
    waiters: Vec<oneshot::Sender<()>>,
    /// Reply slot for a suspended anonymous `subscribe()`.
    subscribe_reply: Option<oneshot::Sender<Result<(), VoltrError>>>,

    message_handlers: Vec<MessageHandler>,
    peer_subscribed_handlers: Vec<PeerHandler>,
    peer_unsubscribed_handlers: Vec<PeerHandler>,

    status_tx: watch::Sender<ChannelStatus>,
}

impl ChannelEntry {
    /// Creates an entry: Initial when unnamed, Unsubscribed when the
    /// caller supplied a name.
    pub(crate) fn new(id: ChannelId, name: Option<String>) -> Self {
        let state = if name.is_some() {
            ChannelState::Unsubscribed
        } else {
            ChannelState::Initial
        };
        let (status_tx, _) = watch::channel(ChannelStatus {
            state,
            name: name.clone(),
        });
        Self {
            id,
            state,
            name,
            pending: 0,
            waiters: Vec::new(),
            subscribe_reply: None,
            message_handlers: Vec::new(),
            peer_subscribed_handlers: Vec::new(),
            peer_unsubscribed_handlers: Vec::new(),
            status_tx,
        }
    }

    /// A fresh receiver for this channel's status watch.
    pub(crate) fn watch(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    fn transition(&mut self, state: ChannelState) {
        tracing::debug!(channel = %self.id, from = %self.state, to = %state, "channel transition");
        self.state = state;
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(ChannelStatus {
            state: self.state,
            name: self.name.clone(),
        });
    }

    /// Starts a subscribe: Initial→Holding (anonymous) or
    /// Unsubscribed→Subscribed (named). Registry membership and the
    /// wire write are the connection task's side of the transition.
    pub(crate) fn begin_subscribe(&mut self) -> Result<SubscribeAction, VoltrError> {
        match self.state {
            ChannelState::Initial => {
                self.transition(ChannelState::Holding);
                Ok(SubscribeAction::Anonymous)
            }
            ChannelState::Unsubscribed => {
                let name = self.name.clone().ok_or(VoltrError::Unnamed)?;
                self.transition(ChannelState::Subscribed);
                Ok(SubscribeAction::Named(name))
            }
            ChannelState::Subscribed => Err(VoltrError::AlreadySubscribed),
            ChannelState::Holding => Err(VoltrError::SubscribePending),
            ChannelState::Errored => Err(VoltrError::ChannelErrored),
        }
    }

    /// Starts an unsubscribe: Subscribed→Unsubscribed. Returns the
    /// name for the outgoing `unsubscribe` frame.
    pub(crate) fn begin_unsubscribe(&mut self) -> Result<String, VoltrError> {
        match self.state {
            ChannelState::Subscribed => {
                let name = self.name.clone().ok_or(VoltrError::Unnamed)?;
                self.transition(ChannelState::Unsubscribed);
                Ok(name)
            }
            ChannelState::Holding => Err(VoltrError::SubscribePending),
            ChannelState::Initial | ChannelState::Errored | ChannelState::Unsubscribed => {
                Err(VoltrError::NotSubscribed)
            }
        }
    }

    /// Rolls a failed transition back (wire write failed).
    pub(crate) fn revert(&mut self, state: ChannelState) {
        self.transition(state);
    }

    /// Parks the reply for a suspended anonymous `subscribe()`.
    pub(crate) fn park_subscriber(&mut self, reply: oneshot::Sender<Result<(), VoltrError>>) {
        self.subscribe_reply = Some(reply);
    }

    /// Holding→Subscribed with the server-assigned name; releases the
    /// suspended subscriber. The name is immutable from here on.
    pub(crate) fn create_succeeded(&mut self, name: String) {
        self.name = Some(name);
        self.transition(ChannelState::Subscribed);
        if let Some(reply) = self.subscribe_reply.take() {
            let _ = reply.send(Ok(()));
        }
    }

    /// Holding→Errored. The subscriber is released with `Ok` — the
    /// rejection is surfaced through the terminal state, which the
    /// caller must inspect.
    pub(crate) fn create_failed(&mut self) {
        self.transition(ChannelState::Errored);
        if let Some(reply) = self.subscribe_reply.take() {
            let _ = reply.send(Ok(()));
        }
    }

    /// Sets the pending counter and parks the waiter; a zero count
    /// releases it immediately.
    pub(crate) fn await_messages(&mut self, count: u64, reply: oneshot::Sender<()>) {
        self.pending = count;
        if count == 0 {
            let _ = reply.send(());
        } else {
            self.waiters.push(reply);
        }
    }

    /// Delivers an inbound channel message: split `<sender>:<payload>`,
    /// tick the pending counter, fan out to the message callbacks.
    pub(crate) fn receive_message(&mut self, raw: Bytes) {
        let (sender, payload) = match split_identifier(&raw) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::debug!(channel = %self.id, error = %e, "dropping malformed channel message");
                return;
            }
        };

        if self.pending > 0 {
            self.pending -= 1;
            if self.pending == 0 {
                for waiter in self.waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
        }

        let event = ChannelMessage {
            channel: self.name.clone().unwrap_or_default(),
            sender,
            payload,
        };
        for handler in &self.message_handlers {
            handler(&event);
        }
    }

    /// Handles channel-scoped control text (`subscribed <cid>` /
    /// `unsubscribed <cid>`). Unknown operations are ignored.
    pub(crate) fn process_service_message(&mut self, text: &str) {
        let control = match parse_channel_control(text) {
            Ok(Some(control)) => control,
            Ok(None) => {
                tracing::debug!(channel = %self.id, text, "ignoring unknown channel control");
                return;
            }
            Err(e) => {
                tracing::debug!(channel = %self.id, error = %e, "dropping malformed channel control");
                return;
            }
        };

        let (peer, handlers) = match &control {
            ChannelControl::PeerSubscribed(cid) => (cid, &self.peer_subscribed_handlers),
            ChannelControl::PeerUnsubscribed(cid) => (cid, &self.peer_unsubscribed_handlers),
        };
        let event = PeerEvent {
            channel: self.name.clone().unwrap_or_default(),
            peer: peer.clone(),
        };
        for handler in handlers {
            handler(&event);
        }
    }

    /// Drops any parked subscriber reply and message waiters. Their
    /// callers observe the drop as `ConnectionClosed`. Called when the
    /// session dies: no acknowledgment or message can arrive anymore.
    pub(crate) fn abort_pending(&mut self) {
        self.subscribe_reply = None;
        self.waiters.clear();
        self.pending = 0;
    }

    pub(crate) fn add_message_handler(&mut self, handler: MessageHandler) {
        self.message_handlers.push(handler);
    }

    pub(crate) fn add_peer_subscribed_handler(&mut self, handler: PeerHandler) {
        self.peer_subscribed_handlers.push(handler);
    }

    pub(crate) fn add_peer_unsubscribed_handler(&mut self, handler: PeerHandler) {
        self.peer_unsubscribed_handlers.push(handler);
    }
}

/// Handle to a channel on a [`Connection`](crate::Connection).
///
/// Cheap to clone; all clones refer to the same channel. Obtained from
/// [`Connection::channel`](crate::Connection::channel) or
/// [`Connection::anonymous_channel`](crate::Connection::anonymous_channel).
#[derive(Clone)]
pub struct Channel {
    pub(crate) id: ChannelId,
    pub(crate) cmd: tokio::sync::mpsc::Sender<Command>,
    pub(crate) status: watch::Receiver<ChannelStatus>,
    pub(crate) conn_status: watch::Receiver<ConnectionStatus>,
}

impl Channel {
    /// This channel's id within its connection.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.status.borrow().state
    }

    /// The channel name, once known (immediately for named channels,
    /// after a successful anonymous subscribe otherwise).
    pub fn name(&self) -> Option<String> {
        self.status.borrow().name.clone()
    }

    /// The cid of the connection this channel belongs to.
    pub fn connection_id(&self) -> Option<String> {
        self.conn_status.borrow().client_id.clone()
    }

    /// Subscribes to the channel.
    ///
    /// On a named channel this sends `subscribe <name>` and returns
    /// immediately. On an anonymous channel it sends `subscribe _`
    /// and suspends until the server acknowledges; there is no
    /// timeout, so a silent server suspends indefinitely, but losing
    /// the session releases the call with
    /// [`VoltrError::ConnectionClosed`]. A rejected
    /// creation still returns `Ok(())` — inspect [`state()`](Self::state)
    /// for [`ChannelState::Errored`].
    ///
    /// # Errors
    ///
    /// [`VoltrError::AlreadySubscribed`], [`VoltrError::SubscribePending`]
    /// (this channel or another anonymous subscribe is in flight),
    /// [`VoltrError::ChannelErrored`], [`VoltrError::NotActive`], or a
    /// transport failure.
    pub async fn subscribe(&self) -> Result<(), VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe { id: self.id, reply }).await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    /// Unsubscribes from the channel, emitting `unsubscribe <name>`.
    ///
    /// # Errors
    ///
    /// [`VoltrError::NotSubscribed`], [`VoltrError::SubscribePending`],
    /// [`VoltrError::NotActive`], or a transport failure.
    pub async fn unsubscribe(&self) -> Result<(), VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Unsubscribe { id: self.id, reply }).await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    /// Publishes a payload on the channel (`publish <name> <payload>`).
    /// Fire-and-forget: the server does not acknowledge.
    pub async fn publish(&self, payload: impl AsRef<[u8]>) -> Result<(), VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Publish {
            id: self.id,
            payload: Bytes::copy_from_slice(payload.as_ref()),
            reply,
        })
        .await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    /// Broadcasts a payload on the channel (`broadcast <name>
    /// <payload>`). Fire-and-forget.
    pub async fn broadcast(&self, payload: impl AsRef<[u8]>) -> Result<(), VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Broadcast {
            id: self.id,
            payload: Bytes::copy_from_slice(payload.as_ref()),
            reply,
        })
        .await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)?
    }

    /// Suspends until `count` further messages arrive on the channel.
    /// `count == 0` returns immediately. Replaces any previous count;
    /// earlier waiters are released together with this one. No
    /// timeout, but losing the session releases the call with
    /// [`VoltrError::ConnectionClosed`].
    pub async fn await_messages(&self, count: u64) -> Result<(), VoltrError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::AwaitMessages {
            id: self.id,
            count,
            reply,
        })
        .await?;
        rx.await.map_err(|_| VoltrError::ConnectionClosed)
    }

    /// Registers a callback for messages received on this channel.
    /// Every registered callback is invoked per message, order
    /// unspecified, on the connection task.
    pub async fn on_message(
        &self,
        handler: impl Fn(&ChannelMessage) + Send + Sync + 'static,
    ) -> Result<(), VoltrError> {
        self.send(Command::OnMessage {
            id: self.id,
            handler: Box::new(handler),
        })
        .await
    }

    /// Registers a callback for peers subscribing to this channel.
    pub async fn on_peer_subscribed(
        &self,
        handler: impl Fn(&PeerEvent) + Send + Sync + 'static,
    ) -> Result<(), VoltrError> {
        self.send(Command::OnPeerSubscribed {
            id: self.id,
            handler: Box::new(handler),
        })
        .await
    }

    /// Registers a callback for peers unsubscribing from this channel.
    pub async fn on_peer_unsubscribed(
        &self,
        handler: impl Fn(&PeerEvent) + Send + Sync + 'static,
    ) -> Result<(), VoltrError> {
        self.send(Command::OnPeerUnsubscribed {
            id: self.id,
            handler: Box::new(handler),
        })
        .await
    }

    async fn send(&self, command: Command) -> Result<(), VoltrError> {
        self.cmd
            .send(command)
            .await
            .map_err(|_| VoltrError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anonymous_entry() -> ChannelEntry {
        ChannelEntry::new(ChannelId(1), None)
    }

    fn named_entry(name: &str) -> ChannelEntry {
        ChannelEntry::new(ChannelId(2), Some(name.to_string()))
    }

    // =====================================================================
    // Construction
    // =====================================================================

    #[test]
    fn test_unnamed_entry_starts_initial() {
        let entry = anonymous_entry();
        assert_eq!(entry.state, ChannelState::Initial);
        assert!(entry.name.is_none());
    }

    #[test]
    fn test_named_entry_starts_unsubscribed() {
        let entry = named_entry("drive");
        assert_eq!(entry.state, ChannelState::Unsubscribed);
        assert_eq!(entry.name.as_deref(), Some("drive"));
    }

    // =====================================================================
    // Subscribe transitions
    // =====================================================================

    #[test]
    fn test_subscribe_from_initial_holds() {
        let mut entry = anonymous_entry();
        let action = entry.begin_subscribe().unwrap();
        assert_eq!(action, SubscribeAction::Anonymous);
        assert_eq!(entry.state, ChannelState::Holding);
    }

    #[test]
    fn test_subscribe_from_unsubscribed_is_immediate() {
        let mut entry = named_entry("drive");
        let action = entry.begin_subscribe().unwrap();
        assert_eq!(action, SubscribeAction::Named("drive".into()));
        assert_eq!(entry.state, ChannelState::Subscribed);
    }

    #[test]
    fn test_subscribe_while_holding_fails() {
        let mut entry = anonymous_entry();
        entry.begin_subscribe().unwrap();
        assert!(matches!(
            entry.begin_subscribe(),
            Err(VoltrError::SubscribePending)
        ));
    }

    #[test]
    fn test_subscribe_while_subscribed_fails() {
        let mut entry = named_entry("drive");
        entry.begin_subscribe().unwrap();
        assert!(matches!(
            entry.begin_subscribe(),
            Err(VoltrError::AlreadySubscribed)
        ));
    }

    #[test]
    fn test_subscribe_after_rejection_fails() {
        let mut entry = anonymous_entry();
        entry.begin_subscribe().unwrap();
        entry.create_failed();
        assert!(matches!(
            entry.begin_subscribe(),
            Err(VoltrError::ChannelErrored)
        ));
    }

    // =====================================================================
    // Creation acknowledgments
    // =====================================================================

    #[test]
    fn test_create_succeeded_assigns_name_and_subscribes() {
        let mut entry = anonymous_entry();
        entry.begin_subscribe().unwrap();
        let (tx, mut rx) = oneshot::channel();
        entry.park_subscriber(tx);

        entry.create_succeeded("foo".into());
        assert_eq!(entry.state, ChannelState::Subscribed);
        assert_eq!(entry.name.as_deref(), Some("foo"));
        assert!(matches!(rx.try_recv(), Ok(Ok(()))));
    }

    #[test]
    fn test_create_failed_errors_and_still_releases_subscriber() {
        let mut entry = anonymous_entry();
        entry.begin_subscribe().unwrap();
        let (tx, mut rx) = oneshot::channel();
        entry.park_subscriber(tx);

        entry.create_failed();
        assert_eq!(entry.state, ChannelState::Errored);
        assert!(entry.name.is_none());
        // Rejection surfaces through the state, not the reply.
        assert!(matches!(rx.try_recv(), Ok(Ok(()))));
    }

    // =====================================================================
    // Unsubscribe transitions
    // =====================================================================

    #[test]
    fn test_unsubscribe_from_subscribed() {
        let mut entry = named_entry("drive");
        entry.begin_subscribe().unwrap();
        let name = entry.begin_unsubscribe().unwrap();
        assert_eq!(name, "drive");
        assert_eq!(entry.state, ChannelState::Unsubscribed);
    }

    #[test]
    fn test_unsubscribe_when_not_subscribed_fails() {
        assert!(matches!(
            anonymous_entry().begin_unsubscribe(),
            Err(VoltrError::NotSubscribed)
        ));
        assert!(matches!(
            named_entry("drive").begin_unsubscribe(),
            Err(VoltrError::NotSubscribed)
        ));

        let mut errored = anonymous_entry();
        errored.begin_subscribe().unwrap();
        errored.create_failed();
        assert!(matches!(
            errored.begin_unsubscribe(),
            Err(VoltrError::NotSubscribed)
        ));
    }

    #[test]
    fn test_unsubscribe_while_holding_fails() {
        let mut entry = anonymous_entry();
        entry.begin_subscribe().unwrap();
        assert!(matches!(
            entry.begin_unsubscribe(),
            Err(VoltrError::SubscribePending)
        ));
    }

    #[test]
    fn test_resubscribe_after_unsubscribe() {
        let mut entry = named_entry("drive");
        entry.begin_subscribe().unwrap();
        entry.begin_unsubscribe().unwrap();
        let action = entry.begin_subscribe().unwrap();
        assert_eq!(action, SubscribeAction::Named("drive".into()));
        assert_eq!(entry.state, ChannelState::Subscribed);
    }

    // =====================================================================
    // Pending-message countdown
    // =====================================================================

    fn channel_msg(raw: &'static [u8]) -> Bytes {
        Bytes::from_static(raw)
    }

    #[test]
    fn test_await_zero_releases_immediately() {
        let mut entry = named_entry("drive");
        let (tx, mut rx) = oneshot::channel();
        entry.await_messages(0, tx);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_waiter_released_after_count_messages() {
        let mut entry = named_entry("drive");
        let (tx, mut rx) = oneshot::channel();
        entry.await_messages(3, tx);

        entry.receive_message(channel_msg(b"alice:one"));
        entry.receive_message(channel_msg(b"alice:two"));
        assert!(rx.try_recv().is_err()); // still pending

        entry.receive_message(channel_msg(b"alice:three"));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_counter_does_not_underflow_past_zero() {
        let mut entry = named_entry("drive");
        entry.receive_message(channel_msg(b"alice:unrequested"));

        // A later await still needs its full count.
        let (tx, mut rx) = oneshot::channel();
        entry.await_messages(1, tx);
        assert!(rx.try_recv().is_err());
        entry.receive_message(channel_msg(b"alice:counted"));
        assert!(rx.try_recv().is_ok());
    }

    // =====================================================================
    // Delivery and channel-scoped control
    // =====================================================================

    #[test]
    fn test_receive_message_splits_sender_and_fans_out() {
        use std::sync::{Arc, Mutex};

        let mut entry = named_entry("drive");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            entry.add_message_handler(Box::new(move |msg: &ChannelMessage| {
                seen.lock().unwrap().push(msg.clone());
            }));
        }

        entry.receive_message(channel_msg(b"alice:hi:there"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2); // both listeners fired
        assert_eq!(seen[0].channel, "drive");
        assert_eq!(seen[0].sender, "alice");
        assert_eq!(seen[0].payload.as_ref(), b"hi:there");
    }

    #[test]
    fn test_receive_message_without_separator_is_dropped() {
        use std::sync::{Arc, Mutex};

        let mut entry = named_entry("drive");
        let seen = Arc::new(Mutex::new(0));
        let count = Arc::clone(&seen);
        entry.add_message_handler(Box::new(move |_| *count.lock().unwrap() += 1));

        entry.receive_message(channel_msg(b"no separator"));
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_service_message_fires_peer_callbacks() {
        use std::sync::{Arc, Mutex};

        let mut entry = named_entry("drive");
        let joined = Arc::new(Mutex::new(Vec::new()));
        let left = Arc::new(Mutex::new(Vec::new()));
        {
            let joined = Arc::clone(&joined);
            entry.add_peer_subscribed_handler(Box::new(move |e: &PeerEvent| {
                joined.lock().unwrap().push(e.peer.clone());
            }));
            let left = Arc::clone(&left);
            entry.add_peer_unsubscribed_handler(Box::new(move |e: &PeerEvent| {
                left.lock().unwrap().push(e.peer.clone());
            }));
        }

        entry.process_service_message("subscribed bob");
        entry.process_service_message("unsubscribed carol");
        entry.process_service_message("renamed dave"); // unknown op, ignored

        assert_eq!(*joined.lock().unwrap(), vec!["bob".to_string()]);
        assert_eq!(*left.lock().unwrap(), vec!["carol".to_string()]);
    }

    // =====================================================================
    // Misc
    // =====================================================================

    #[test]
    fn test_is_tracked_matches_registry_states() {
        assert!(!ChannelState::Initial.is_tracked());
        assert!(ChannelState::Holding.is_tracked());
        assert!(ChannelState::Subscribed.is_tracked());
        assert!(!ChannelState::Unsubscribed.is_tracked());
        assert!(!ChannelState::Errored.is_tracked());
    }

    #[test]
    fn test_status_watch_tracks_transitions() {
        let mut entry = anonymous_entry();
        let watch = entry.watch();
        entry.begin_subscribe().unwrap();
        assert_eq!(watch.borrow().state, ChannelState::Holding);
        entry.create_succeeded("foo".into());
        assert_eq!(watch.borrow().state, ChannelState::Subscribed);
        assert_eq!(watch.borrow().name.as_deref(), Some("foo"));
    }

    #[test]
    fn test_channel_id_display() {
        assert_eq!(ChannelId(7).to_string(), "chan-7");
    }
}
