//! Inbound frame routing.
//!
//! Every decoded frame lands here, on the connection task. The first
//! byte of the payload picks the lane: `@` is a direct message, `!` is
//! a service message, anything else is channel traffic addressed by
//! name. Payload-level problems (unknown channel, malformed message)
//! are logged and dropped; only framing errors upstream of this module
//! terminate the session.

use bytes::Bytes;

use voltr_protocol::{ControlMessage, Message, ServiceMessage, classify};

use crate::channel::{ChannelId, ChannelState};
use crate::connection::ConnectionActor;
use crate::events::DirectMessage;

impl ConnectionActor {
    /// Routes one complete frame payload.
    pub(crate) fn route(&mut self, frame: Bytes) {
        if frame.is_empty() {
            tracing::trace!("ignoring empty frame");
            return;
        }

        let message = match classify(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed message");
                return;
            }
        };

        match message {
            Message::Direct { sender, payload } => {
                tracing::trace!(%sender, len = payload.len(), "direct message");
                let event = DirectMessage { sender, payload };
                for handler in &self.direct_handlers {
                    handler(&event);
                }
            }
            Message::Service(ServiceMessage::Global(control)) => {
                self.route_global(control);
            }
            Message::Service(ServiceMessage::Scoped { channel, text }) => {
                let Some(id) = self.find_tracked(&channel) else {
                    tracing::debug!(%channel, "service message for untracked channel");
                    return;
                };
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.process_service_message(&text);
                }
            }
            Message::Channel { channel, payload } => {
                let Some(id) = self.find_tracked(&channel) else {
                    tracing::debug!(%channel, "message for untracked channel");
                    return;
                };
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.receive_message(payload);
                }
            }
        }
    }

    fn route_global(&mut self, control: ControlMessage) {
        match control {
            ControlMessage::Connected(cid) => {
                tracing::debug!(%cid, "connection acknowledged");
                self.client_id = Some(cid.clone());
                self.active = true;
                self.status_tx.send_replace(crate::connection::ConnectionStatus {
                    active: true,
                    client_id: Some(cid),
                });
            }
            ControlMessage::Created(name) => {
                let Some(id) = self.resolve_holding() else {
                    tracing::warn!(%name, "channel created with no creation in flight");
                    return;
                };
                tracing::debug!(channel = %id, %name, "channel created");
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.create_succeeded(name);
                }
            }
            ControlMessage::CreateFailed => {
                let Some(id) = self.resolve_holding() else {
                    tracing::warn!("channel creation rejected with no creation in flight");
                    return;
                };
                tracing::debug!(channel = %id, "channel creation rejected");
                // Rejection evicts the channel from the registry; its
                // entry becomes a dead end in the Errored state.
                if let Err(e) = self.untrack(id) {
                    tracing::debug!(channel = %id, error = %e, "untrack after rejection failed");
                }
                if let Some(entry) = self.channels.get_mut(&id) {
                    entry.create_failed();
                }
            }
        }
    }

    /// The channel a create acknowledgment belongs to: the most
    /// recently tracked entry still in the Holding state. Anonymous
    /// subscribes are serialized, so there is at most one.
    fn resolve_holding(&self) -> Option<ChannelId> {
        self.registry
            .iter()
            .rev()
            .copied()
            .find(|id| {
                self.channels
                    .get(id)
                    .is_some_and(|e| e.state == ChannelState::Holding)
            })
    }

    /// First tracked channel carrying `name`, in registry order.
    fn find_tracked(&self, name: &str) -> Option<ChannelId> {
        self.registry.iter().copied().find(|id| {
            self.channels
                .get(id)
                .is_some_and(|e| e.name.as_deref() == Some(name))
        })
    }
}
