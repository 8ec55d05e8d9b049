//! Intent detection through the conversational agent.

pub mod dialogflow;

pub use dialogflow::DialogflowClient;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::IntentError;

/// Message sent in place of the user's text to start the registration flow.
pub const REGISTRATION_TRIGGER: &str = "INTENT_REGISTRO";

/// Label reported when the agent matched no intent.
pub const UNKNOWN_INTENT: &str = "Desconocido";

/// Intents that trigger a side-effecting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Register,
    FetchWearableData,
    GenerateRecommendation,
    FetchRiskAssessment,
    DeleteAccount,
}

impl Intent {
    /// Map an agent intent display name to an action, if it has one.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ConfirmarDatos" => Some(Self::Register),
            "ConfirmarMonitoreo" => Some(Self::FetchWearableData),
            "GenerarRutina" => Some(Self::GenerateRecommendation),
            "Evaluar riesgo" => Some(Self::FetchRiskAssessment),
            "ConfirmacionDesvinculacion" => Some(Self::DeleteAccount),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Register => "ConfirmarDatos",
            Self::FetchWearableData => "ConfirmarMonitoreo",
            Self::GenerateRecommendation => "GenerarRutina",
            Self::FetchRiskAssessment => "Evaluar riesgo",
            Self::DeleteAccount => "ConfirmacionDesvinculacion",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What the agent returned for one message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntentResult {
    /// Agent reply text, in order.
    pub reply_fragments: Vec<String>,
    pub intent_label: String,
    /// Parameters the agent extracted from the conversation.
    pub parameters: Map<String, Value>,
}

impl IntentResult {
    pub fn intent(&self) -> Option<Intent> {
        Intent::from_label(&self.intent_label)
    }
}

/// A conversational agent that detects intents.
#[async_trait]
pub trait IntentGateway: Send + Sync {
    /// Send `text` in the conversation identified by `session_id`.
    ///
    /// `registration_pending` is forwarded to the agent as a session parameter.
    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
        registration_pending: bool,
    ) -> Result<IntentResult, IntentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for intent in [
            Intent::Register,
            Intent::FetchWearableData,
            Intent::GenerateRecommendation,
            Intent::FetchRiskAssessment,
            Intent::DeleteAccount,
        ] {
            assert_eq!(Intent::from_label(intent.label()), Some(intent));
        }
    }

    #[test]
    fn unknown_labels_have_no_action() {
        assert_eq!(Intent::from_label(UNKNOWN_INTENT), None);
        assert_eq!(Intent::from_label("Saludo"), None);
        assert_eq!(Intent::from_label("evaluar riesgo"), None);
    }
}
