// src/types.rs

use std::str::FromStr;
use serde::Deserialize;

/// Behaviour when a trigger arrives while a workflow run is already active.
///
/// - `Reject`: drop the trigger and log it (default behaviour).
/// - `Queue`: remember up to `queue_length` triggers and start them one at a
///   time once the active run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlapBehaviour {
    #[default]
    Reject,
    Queue,
}

impl FromStr for OverlapBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(OverlapBehaviour::Reject),
            "queue" => Ok(OverlapBehaviour::Queue),
            other => Err(format!(
                "invalid overlap behaviour: {other} (expected \"reject\" or \"queue\")"
            )),
        }
    }
}

/// Where run outcome notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    /// Emit the notification as a structured log event.
    #[default]
    Log,
    /// POST the notification as JSON to `webhook_url`.
    Webhook,
}

impl FromStr for NotifyChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(NotifyChannel::Log),
            "webhook" => Ok(NotifyChannel::Webhook),
            other => Err(format!(
                "invalid notify channel: {other} (expected \"log\" or \"webhook\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_parses_case_insensitively() {
        assert_eq!("Queue".parse::<OverlapBehaviour>(), Ok(OverlapBehaviour::Queue));
        assert_eq!(" reject ".parse::<OverlapBehaviour>(), Ok(OverlapBehaviour::Reject));
        assert!("cancel".parse::<OverlapBehaviour>().is_err());
    }

    #[test]
    fn notify_channel_defaults_to_log() {
        assert_eq!(NotifyChannel::default(), NotifyChannel::Log);
        assert_eq!("WEBHOOK".parse::<NotifyChannel>(), Ok(NotifyChannel::Webhook));
    }
}
