//! Bridge channel management.
//!
//! Groups the channels connecting the transports with the relay loop.

use tokio::sync::{mpsc, watch};

use crate::common::messages::{RelayEvent, XmppCommand};

/// Channels owned by the XMPP session task.
pub struct XmppChannels {
    /// Sender for inbound messages and session events (XMPP -> relay).
    pub event_tx: mpsc::UnboundedSender<RelayEvent>,
    /// Receiver for queued sends and joins (relay -> XMPP).
    pub command_rx: mpsc::UnboundedReceiver<XmppCommand>,
    /// Receiver for the shutdown signal.
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Channels used by the relay side.
pub struct RelaySideChannels {
    /// Receiver for events from all transports.
    pub event_rx: mpsc::UnboundedReceiver<RelayEvent>,
    /// Sender for inbound events; cloned into the Telegram task.
    pub event_tx: mpsc::UnboundedSender<RelayEvent>,
    /// Sender for XMPP commands; wrapped by the XMPP transport handle.
    pub xmpp_command_tx: mpsc::UnboundedSender<XmppCommand>,
}

/// Control channels for shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Bundle of all channels created by the bridge.
pub struct ChannelBundle {
    pub xmpp: XmppChannels,
    pub relay: RelaySideChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    /// Create a new set of bridge channels.
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (xmpp_command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            xmpp: XmppChannels {
                event_tx: event_tx.clone(),
                command_rx,
                shutdown_rx,
            },
            relay: RelaySideChannels {
                event_rx,
                event_tx,
                xmpp_command_tx,
            },
            control: ControlChannels { shutdown_tx },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
