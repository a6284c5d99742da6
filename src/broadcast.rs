//! Same-origin publish/subscribe for overlay documents.
//!
//! A [`BroadcastHub`] plays the role of the origin: channels are looked up by
//! name on the hub, and only code holding the same hub can reach them. Each
//! channel is a `tokio::sync::broadcast` ring, so a listener that goes away
//! simply stops receiving and the publisher never learns about it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::payload::OverlayPayload;
use crate::wire::{ChannelMessage, ScoreEvent, WireFormat, encode_message};

pub const DEFAULT_CHANNEL: &str = "cricket-scores";
/// Per-listener backlog; the oldest message is dropped past this point.
pub const INBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    channels: Arc<Mutex<HashMap<String, BroadcastChannel>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the channel with this name, creating it on first use.
    pub fn channel(&self, name: &str) -> BroadcastChannel {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(name.to_string())
            .or_insert_with(|| BroadcastChannel::new(name))
            .clone()
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastChannel {
    name: Arc<str>,
    tx: broadcast::Sender<String>,
}

impl BroadcastChannel {
    pub fn new(name: &str) -> Self {
        let (tx, _) = broadcast::channel(INBOX_CAPACITY);
        Self {
            name: Arc::from(name),
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            channel: self.name.clone(),
            rx: self.tx.subscribe(),
            dropped: 0,
        }
    }

    /// Delivers `raw` to every live listener and returns how many received it.
    /// Never blocks on a listener and never fails.
    pub fn publish(&self, raw: &str) -> usize {
        self.tx.send(raw.to_string()).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A listener's end of the channel. Dropping it unregisters the listener.
#[derive(Debug)]
pub struct Subscription {
    channel: Arc<str>,
    rx: broadcast::Receiver<String>,
    dropped: u64,
}

impl Subscription {
    pub fn channel_name(&self) -> &str {
        &self.channel
    }

    /// Next queued message, skipping past anything the ring already overwrote.
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.rx.try_recv() {
                Ok(raw) => return Some(raw),
                Err(TryRecvError::Lagged(skipped)) => self.dropped += skipped,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn drain(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn pending(&self) -> usize {
        self.rx.len().min(INBOX_CAPACITY)
    }

    /// Messages this listener lost to a full backlog.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Serializes payloads and events onto a channel in the configured encoding.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    channel: BroadcastChannel,
    format: WireFormat,
}

impl BroadcastPublisher {
    pub fn new(channel: BroadcastChannel, format: WireFormat) -> Self {
        Self { channel, format }
    }

    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn publish_payload(&self, payload: &OverlayPayload) -> usize {
        self.send(&ChannelMessage::State {
            payload: payload.clone(),
        })
    }

    pub fn publish_event(&self, event: &ScoreEvent) -> usize {
        self.send(&ChannelMessage::Event {
            event: event.clone(),
        })
    }

    fn send(&self, msg: &ChannelMessage) -> usize {
        // An encoding failure is a lost broadcast like any other.
        match encode_message(msg, self.format) {
            Ok(raw) => self.channel.publish(&raw),
            Err(_) => 0,
        }
    }
}
