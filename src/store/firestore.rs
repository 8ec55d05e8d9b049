//! Firestore REST backend for the user profile store.
//!
//! Documents live at
//! `{base}/v1/projects/{project}/databases/{database}/documents/{collection}/{id}`.
//! Firestore wraps every value in a type tag (`stringValue`, `integerValue`, ...);
//! `encode_fields` / `decode_fields` translate between that and plain JSON so
//! the profile model can stay a normal serde type.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::model::{ProfileUpdate, UserProfile};
use super::traits::UserStore;
use crate::auth::{TokenSource, bearer};
use crate::config::FirestoreConfig;
use crate::error::StoreError;

/// Firestore-backed `UserStore`.
pub struct FirestoreUserStore {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    documents_url: String,
}

impl FirestoreUserStore {
    pub fn new(config: &FirestoreConfig, client: reqwest::Client, tokens: Arc<dyn TokenSource>) -> Self {
        let documents_url = format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.database_id,
            config.collection
        );
        Self {
            client,
            tokens,
            documents_url,
        }
    }

    fn document_url(&self, user_id: &str) -> String {
        format!("{}/{}", self.documents_url, user_id)
    }

    async fn authorized(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let token = self.tokens.access_token().await?;
        req.header(reqwest::header::AUTHORIZATION, bearer(&token))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))
    }
}

#[async_trait]
impl UserStore for FirestoreUserStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        debug!(user_id = %user_id, "Fetching profile from Firestore");
        let resp = self.authorized(self.client.get(self.document_url(user_id))).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = check(resp)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let fields = doc
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let profile = serde_json::from_value(Value::Object(decode_fields(&fields)))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(profile))
    }

    async fn set(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let plain = match serde_json::to_value(profile) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(StoreError::Serialization("profile is not an object".into())),
            Err(e) => return Err(StoreError::Serialization(e.to_string())),
        };
        let body = json!({ "fields": encode_fields(&plain) });

        // PATCH without an update mask replaces the whole document.
        let resp = self
            .authorized(self.client.patch(self.document_url(user_id)).json(&body))
            .await?;
        check(resp).await?;
        info!(user_id = %user_id, "Profile written to Firestore");
        Ok(())
    }

    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut query: Vec<(&str, &str)> = update
            .fields()
            .keys()
            .map(|field| ("updateMask.fieldPaths", field.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let body = json!({ "fields": encode_fields(update.fields()) });
        let resp = self
            .authorized(
                self.client
                    .patch(self.document_url(user_id))
                    .query(&query)
                    .json(&body),
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(user_id.to_string()));
        }
        check(resp).await?;
        debug!(user_id = %user_id, fields = update.fields().len(), "Profile fields updated");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let resp = self
            .authorized(self.client.delete(self.document_url(user_id)))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(resp).await?;
        info!(user_id = %user_id, "Profile deleted from Firestore");
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

/// Plain JSON object → Firestore `fields` map.
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Firestore `fields` map → plain JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn decode_value(value: &Value) -> Value {
    let Some((tag, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match tag.as_str() {
        "booleanValue" | "doubleValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "stringValue" | "timestampValue" | "referenceValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}
