//! User profile data model.
//!
//! Field names on the wire match the documents already stored in the
//! `usuarios` collection, so profiles written by earlier deployments load
//! unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Field name of the wearable access token.
pub const ACCESS_TOKEN_FIELD: &str = "huawei_access_token";
/// Field name of the wearable refresh token.
pub const REFRESH_TOKEN_FIELD: &str = "huawei_refresh_token";

/// Stored when the user gave no name.
pub const UNKNOWN_NAME: &str = "Desconocido";
/// Stored when the user gave no gender.
pub const UNKNOWN_GENDER: &str = "N/A";

/// A registered user's demographic and clinical profile.
///
/// Older documents hold numbers as strings and `gender` as a bare number,
/// so reads are lenient: numeric fields accept numbers, numeric strings or
/// null, and missing text fields fall back to the placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub age: f64,
    #[serde(default = "unknown_gender", deserialize_with = "lenient_gender")]
    pub gender: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight: f64,
    /// Systolic blood pressure.
    #[serde(default, deserialize_with = "lenient_number")]
    pub ap_hi: f64,
    /// Diastolic blood pressure.
    #[serde(default, deserialize_with = "lenient_number")]
    pub ap_lo: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cholesterol: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub gluc: f64,
    #[serde(default)]
    pub smoke: bool,
    #[serde(default)]
    pub alco: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(rename = "registeredAt", default)]
    pub registered_at: DateTime<Utc>,
    #[serde(
        rename = "huawei_access_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub wearable_access_token: Option<String>,
    #[serde(
        rename = "huawei_refresh_token",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub wearable_refresh_token: Option<String>,
}

fn unknown_name() -> String {
    UNKNOWN_NAME.to_string()
}

fn unknown_gender() -> String {
    UNKNOWN_GENDER.to_string()
}

/// Render a JSON number as text, dropping the fraction of whole numbers.
pub fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{v:.0}"),
        _ => n.to_string(),
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(b)),
        _ => 0.0,
    })
}

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(number_text(&n)),
        _ => None,
    }
}

fn lenient_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_value(Value::deserialize(deserializer)?).unwrap_or_else(unknown_name))
}

fn lenient_gender<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_value(Value::deserialize(deserializer)?).unwrap_or_else(unknown_gender))
}

/// An access/refresh token pair for the wearable vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WearableTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl UserProfile {
    /// Both wearable tokens, if the user has linked a device.
    pub fn wearable_tokens(&self) -> Option<WearableTokens> {
        match (&self.wearable_access_token, &self.wearable_refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(WearableTokens {
                    access_token: access.clone(),
                    refresh_token: refresh.clone(),
                })
            }
            _ => None,
        }
    }

    /// Apply a partial update in place, mirroring what the store does.
    pub fn apply(&mut self, update: &ProfileUpdate) -> Result<(), serde_json::Error> {
        let mut doc = serde_json::to_value(&*self)?;
        if let Value::Object(ref mut fields) = doc {
            for (key, value) in update.fields() {
                fields.insert(key.clone(), value.clone());
            }
        }
        *self = serde_json::from_value(doc)?;
        Ok(())
    }
}

/// A partial profile update: only the listed fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    fields: Map<String, Value>,
}

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single field.
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Write a fresh access token only.
    pub fn access_token(token: &str) -> Self {
        Self::new().set(ACCESS_TOKEN_FIELD, token)
    }

    /// Write both wearable tokens.
    pub fn wearable_tokens(tokens: &WearableTokens) -> Self {
        Self::new()
            .set(ACCESS_TOKEN_FIELD, tokens.access_token.as_str())
            .set(REFRESH_TOKEN_FIELD, tokens.refresh_token.as_str())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_profile() -> UserProfile {
    UserProfile {
        name: "Lucía".to_string(),
        age: 54.0,
        gender: "2".to_string(),
        height: 168.0,
        weight: 72.5,
        ap_hi: 130.0,
        ap_lo: 85.0,
        cholesterol: 2.0,
        gluc: 1.0,
        smoke: false,
        alco: false,
        active: true,
        registered_at: DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
        wearable_access_token: None,
        wearable_refresh_token: None,
    }
}
