//! Trigger action vocabulary.
//!
//! The closed set of actions a trigger can fire. Configuration persists the
//! stable kebab-case names, never ordinals, so reordering this enum can never
//! silently remap saved triggers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerAction {
    DisablePreview,
    DisableSchedule,
    EnablePreview,
    EnableSchedule,
    ExitApplication,
    HideInterface,
    PlaySlideshow,
    RunEditor,
    ShowInterface,
    StartCapture,
    StopCapture,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trigger action {0:?}")]
pub struct UnknownAction(pub String);

impl TriggerAction {
    /// Every action, in name order.
    pub const ALL: [TriggerAction; 11] = [
        TriggerAction::DisablePreview,
        TriggerAction::DisableSchedule,
        TriggerAction::EnablePreview,
        TriggerAction::EnableSchedule,
        TriggerAction::ExitApplication,
        TriggerAction::HideInterface,
        TriggerAction::PlaySlideshow,
        TriggerAction::RunEditor,
        TriggerAction::ShowInterface,
        TriggerAction::StartCapture,
        TriggerAction::StopCapture,
    ];

    /// The stable persisted name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerAction::DisablePreview => "disable-preview",
            TriggerAction::DisableSchedule => "disable-schedule",
            TriggerAction::EnablePreview => "enable-preview",
            TriggerAction::EnableSchedule => "enable-schedule",
            TriggerAction::ExitApplication => "exit-application",
            TriggerAction::HideInterface => "hide-interface",
            TriggerAction::PlaySlideshow => "play-slideshow",
            TriggerAction::RunEditor => "run-editor",
            TriggerAction::ShowInterface => "show-interface",
            TriggerAction::StartCapture => "start-capture",
            TriggerAction::StopCapture => "stop-capture",
        }
    }
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(TriggerAction::StartCapture.as_str(), "start-capture");
        assert_eq!(TriggerAction::ExitApplication.as_str(), "exit-application");
        assert_eq!(TriggerAction::ALL.len(), 11);
    }

    #[test]
    fn names_round_trip() {
        for action in TriggerAction::ALL {
            assert_eq!(action.as_str().parse::<TriggerAction>(), Ok(action));
        }
        assert!("start_capture".parse::<TriggerAction>().is_err());
        assert!("".parse::<TriggerAction>().is_err());
    }

    #[test]
    fn serde_uses_the_stable_names() {
        let json = serde_json::to_string(&TriggerAction::StopCapture).unwrap();
        assert_eq!(json, "\"stop-capture\"");
        let parsed: TriggerAction = serde_json::from_str("\"run-editor\"").unwrap();
        assert_eq!(parsed, TriggerAction::RunEditor);
    }
}
