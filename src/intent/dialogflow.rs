//! Dialogflow CX `detectIntent` client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{IntentGateway, IntentResult, UNKNOWN_INTENT};
use crate::auth::{TokenSource, bearer};
use crate::config::DialogflowConfig;
use crate::error::IntentError;

/// Session parameter carrying the registration flag.
const REGISTRATION_PARAM: &str = "requiereRegistro";

pub struct DialogflowClient {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    agent_url: String,
    language_code: String,
}

impl DialogflowClient {
    pub fn new(config: &DialogflowConfig, client: reqwest::Client, tokens: Arc<dyn TokenSource>) -> Self {
        let agent_url = format!(
            "{}/v3/projects/{}/locations/{}/agents/{}",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.location,
            config.agent_id
        );
        Self {
            client,
            tokens,
            agent_url,
            language_code: config.language_code.clone(),
        }
    }

    fn detect_intent_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}:detectIntent", self.agent_url, session_id)
    }
}

#[async_trait]
impl IntentGateway for DialogflowClient {
    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
        registration_pending: bool,
    ) -> Result<IntentResult, IntentError> {
        let token = self.tokens.access_token().await?;

        let body = json!({
            "queryInput": {
                "text": { "text": text },
                "languageCode": self.language_code,
            },
            "queryParams": {
                "parameters": { REGISTRATION_PARAM: registration_pending }
            }
        });

        debug!(session = %session_id, "Sending message to Dialogflow CX");
        let resp = self
            .client
            .post(self.detect_intent_url(session_id))
            .header(reqwest::header::AUTHORIZATION, bearer(&token))
            .json(&body)
            .send()
            .await
            .map_err(|e| IntentError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IntentError::Status { status, body });
        }

        let parsed: DetectIntentResponse = resp
            .json()
            .await
            .map_err(|e| IntentError::InvalidResponse(e.to_string()))?;
        let result = parsed.into_result();

        info!(
            session = %session_id,
            intent = %result.intent_label,
            fragments = result.reply_fragments.len(),
            "Intent detected"
        );
        Ok(result)
    }
}

// ── Wire format ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    query_result: QueryResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    intent: Option<MatchedIntent>,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
    #[serde(default)]
    response_messages: Vec<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedIntent {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    text: Option<ResponseText>,
}

#[derive(Debug, Deserialize)]
struct ResponseText {
    #[serde(default)]
    text: Vec<String>,
}

impl DetectIntentResponse {
    fn into_result(self) -> IntentResult {
        let query = self.query_result;

        let intent_label = query
            .intent
            .and_then(|i| i.display_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_INTENT.to_string());

        // Only the first text of each message; payload and card messages are skipped.
        let reply_fragments = query
            .response_messages
            .into_iter()
            .filter_map(|m| m.text.and_then(|t| t.text.into_iter().next()))
            .filter(|t| !t.is_empty())
            .collect();

        IntentResult {
            reply_fragments,
            intent_label,
            parameters: query.parameters.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: Value) -> IntentResult {
        serde_json::from_value::<DetectIntentResponse>(raw)
            .unwrap()
            .into_result()
    }

    #[test]
    fn extracts_intent_parameters_and_text() {
        let result = parse(json!({
            "responseId": "abc",
            "queryResult": {
                "text": "quiero una rutina",
                "intent": { "name": "projects/x/intents/1", "displayName": "GenerarRutina" },
                "parameters": { "level": 2, "bodypart": 1 },
                "responseMessages": [
                    { "text": { "text": ["Claro, preparo tu rutina."] } },
                    { "payload": { "richContent": [] } },
                    { "text": { "text": ["Un momento...", "ignored alternative"] } }
                ]
            }
        }));

        assert_eq!(result.intent_label, "GenerarRutina");
        assert_eq!(result.parameters["level"], 2);
        assert_eq!(
            result.reply_fragments,
            vec!["Claro, preparo tu rutina.", "Un momento..."]
        );
    }

    #[test]
    fn missing_intent_is_unknown() {
        let result = parse(json!({ "queryResult": { "responseMessages": [] } }));
        assert_eq!(result.intent_label, UNKNOWN_INTENT);
        assert!(result.parameters.is_empty());
        assert!(result.reply_fragments.is_empty());
        assert!(result.intent().is_none());
    }

    #[test]
    fn session_url_uses_sender_as_session() {
        let config = DialogflowConfig {
            base_url: "https://us-central1-dialogflow.googleapis.com".into(),
            project_id: "asistente-cardiovascular".into(),
            location: "us-central1".into(),
            agent_id: "agent-1".into(),
            language_code: "es".into(),
            credentials: crate::config::CredentialSource::StaticToken("t".to_string().into()),
        };
        let client = DialogflowClient::new(
            &config,
            reqwest::Client::new(),
            Arc::new(crate::auth::StaticTokenSource::new("t".to_string().into())),
        );
        assert_eq!(
            client.detect_intent_url("34600111222"),
            "https://us-central1-dialogflow.googleapis.com/v3/projects/asistente-cardiovascular/locations/us-central1/agents/agent-1/sessions/34600111222:detectIntent"
        );
    }
}
