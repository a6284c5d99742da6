//! Message shapes carried on the overlay broadcast channel.
//!
//! Two encodings exist. The tagged form wraps every message as
//! `{"kind":"state","payload":…}` or `{"kind":"event","event":…}`. The legacy
//! form sends the bare payload or the bare event and leaves the receiver to
//! tell them apart by their keys. [`decode_message`] accepts both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::OverlayPayload;
use crate::state::TeamKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Wicket,
    Run,
    Extra,
    Four,
    Six,
    PushEvent,
}

impl EventKind {
    /// Kinds that drive a transient on-screen notification.
    pub fn is_notification(self) -> bool {
        matches!(
            self,
            EventKind::Wicket | EventKind::Four | EventKind::Six | EventKind::PushEvent
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtraType {
    Wide,
    NoBall,
    Bye,
    LegBye,
}

impl ExtraType {
    pub fn penalty(self) -> u32 {
        match self {
            ExtraType::Wide | ExtraType::NoBall => 1,
            ExtraType::Bye | ExtraType::LegBye => 0,
        }
    }

    pub fn consumes_ball(self) -> bool {
        matches!(self, ExtraType::Bye | ExtraType::LegBye)
    }

    pub fn label(self) -> &'static str {
        match self {
            ExtraType::Wide => "WIDE",
            ExtraType::NoBall => "NO BALL",
            ExtraType::Bye => "BYE",
            ExtraType::LegBye => "LEG BYE",
        }
    }
}

/// Discrete, fire-once notification. Never part of the score state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_type: Option<ExtraType>,
}

impl ScoreEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            message: None,
            event_type: None,
            runs: None,
            team: None,
            extra_type: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_runs(mut self, runs: u32) -> Self {
        self.runs = Some(runs);
        self
    }

    pub fn with_team(mut self, team: TeamKey) -> Self {
        self.team = Some(team);
        self
    }

    pub fn with_extra(mut self, extra: ExtraType) -> Self {
        self.extra_type = Some(extra);
        self
    }

    /// Banner text an overlay shows for this event, if it shows one at all.
    pub fn banner(&self) -> Option<String> {
        match self.kind {
            EventKind::Wicket => Some(match self.message.as_deref() {
                Some(how) if !how.is_empty() => format!("WICKET! {how}"),
                _ => "WICKET!".to_string(),
            }),
            EventKind::Four => Some("FOUR!".to_string()),
            EventKind::Six => Some("SIX!".to_string()),
            EventKind::PushEvent => self
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .or_else(|| self.event_type.clone()),
            EventKind::Run | EventKind::Extra => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChannelMessage {
    State { payload: OverlayPayload },
    Event { event: ScoreEvent },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Tagged,
    Legacy,
}

impl WireFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tagged" => Some(WireFormat::Tagged),
            "legacy" | "untagged" => Some(WireFormat::Legacy),
            _ => None,
        }
    }
}

pub fn encode_message(msg: &ChannelMessage, format: WireFormat) -> serde_json::Result<String> {
    match (format, msg) {
        (WireFormat::Tagged, _) => serde_json::to_string(msg),
        (WireFormat::Legacy, ChannelMessage::State { payload }) => serde_json::to_string(payload),
        (WireFormat::Legacy, ChannelMessage::Event { event }) => serde_json::to_string(event),
    }
}

/// Decodes either encoding. Returns `None` for anything that is neither a
/// recognizable payload nor a recognizable event.
pub fn decode_message(raw: &str) -> Option<ChannelMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let obj = value.as_object()?;

    if obj.contains_key("kind") {
        return serde_json::from_value(value).ok();
    }
    if obj.contains_key("type") {
        let event = serde_json::from_value::<ScoreEvent>(value).ok()?;
        return Some(ChannelMessage::Event { event });
    }
    if obj.contains_key("team1") || obj.contains_key("team2") {
        let payload = serde_json::from_value::<OverlayPayload>(value).ok()?;
        return Some(ChannelMessage::State { payload });
    }
    None
}
