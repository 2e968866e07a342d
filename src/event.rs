//! Inbound event normalization
//!
//! Engagement payloads arrive in whatever shape the upstream relay chose.
//! `normalize` is the only place that knows about those shapes; everything
//! downstream works with a [`CanonicalEvent`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display name used when no name field resolves
pub const DEFAULT_USERNAME: &str = "User";
/// Tier code assumed when a subscription carries none
pub const DEFAULT_TIER_CODE: &str = "1000";

/// Name fields probed in order after an explicit string `user`
const NAME_FIELDS: [&str; 5] = ["user_name", "display_name", "displayName", "userName", "name"];

/// Canonical event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Follow,
    Subscribe,
    Cheer,
    ChatCommand,
}

impl EventKind {
    /// Map an inbound event name to its canonical kind
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "Twitch.Follow" => Some(EventKind::Follow),
            "Twitch.Cheer" => Some(EventKind::Cheer),
            "Twitch.ChatMessage" => Some(EventKind::ChatCommand),
            "Twitch.GiftSubscription" => Some(EventKind::Subscribe),
            n if n.starts_with("Twitch.Sub") || n == "Twitch.ReSubscribe" => {
                Some(EventKind::Subscribe)
            }
            _ => None,
        }
    }
}

/// Source-agnostic engagement event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub kind: EventKind,
    pub username: String,
    /// Bit count for cheers (always >= 1 when present)
    pub metric: Option<f64>,
    /// Lower-cased, whitespace-free tier code for subscriptions
    pub tier_code: Option<String>,
    pub is_prime: Option<bool>,
    /// Trimmed, lower-cased chat text
    pub raw_command: Option<String>,
}

impl CanonicalEvent {
    /// Bit count, defaulting to 1
    pub fn bits(&self) -> f64 {
        self.metric.unwrap_or(1.0)
    }
}

/// Normalize an inbound payload. Total: never fails for any payload shape.
pub fn normalize(kind: EventKind, payload: &Value) -> CanonicalEvent {
    let data = unwrap_data(payload);
    let username = resolve_username(data);

    let mut event = CanonicalEvent {
        kind,
        username,
        metric: None,
        tier_code: None,
        is_prime: None,
        raw_command: None,
    };

    match kind {
        EventKind::Follow => {}
        EventKind::Cheer => event.metric = Some(resolve_bits(data)),
        EventKind::Subscribe => {
            event.tier_code = Some(resolve_tier_code(data));
            event.is_prime = Some(resolve_prime(data));
        }
        EventKind::ChatCommand => event.raw_command = Some(resolve_message(data)),
    }

    event
}

/// Normalize by inbound event name; unknown names yield `None`
pub fn normalize_named(name: &str, payload: &Value) -> Option<CanonicalEvent> {
    match EventKind::from_event_name(name) {
        Some(kind) => Some(normalize(kind, payload)),
        None => {
            log::debug!("Ignoring unknown event '{}'", name);
            None
        }
    }
}

/// Payloads are sometimes wrapped as `{ "data": { ... } }`
fn unwrap_data(payload: &Value) -> &Value {
    match payload.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => payload,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn resolve_username(data: &Value) -> String {
    // `user` only counts when it is a plain string; some sources send an object
    non_empty_str(data.get("user"))
        .or_else(|| {
            NAME_FIELDS
                .iter()
                .find_map(|field| non_empty_str(data.get(*field)))
        })
        .unwrap_or(DEFAULT_USERNAME)
        .to_string()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn resolve_bits(data: &Value) -> f64 {
    data.get("bits")
        .and_then(as_number)
        .filter(|b| b.is_finite())
        .map(|b| b.max(1.0))
        .unwrap_or(1.0)
}

fn resolve_tier_code(data: &Value) -> String {
    let raw = ["tier", "sub_tier"].iter().find_map(|field| {
        match data.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    });

    let code: String = raw
        .unwrap_or_else(|| DEFAULT_TIER_CODE.to_string())
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if code.is_empty() {
        DEFAULT_TIER_CODE.to_string()
    } else {
        code
    }
}

fn resolve_prime(data: &Value) -> bool {
    ["is_prime", "isPrime"]
        .iter()
        .any(|field| data.get(*field).and_then(Value::as_bool) == Some(true))
}

fn resolve_message(data: &Value) -> String {
    let text = match data.get("message") {
        Some(Value::String(s)) => s.as_str(),
        Some(nested) => nested
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default(),
        None => "",
    };
    text.trim().to_lowercase()
}
