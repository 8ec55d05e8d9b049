//! Cardiovascular risk assessment from the stored profile.

use tracing::{error, info, warn};

use crate::predict::{HealthModels, RiskRequest};
use crate::session::SessionCache;
use crate::store::{UserProfile, UserStore};

const AT_RISK: &str = "Resultado: El modelo ha predecido que si tienes riesgo cardiovascular. \
Te recomiendo consultar con tu médico. Yo me encargare de generarte rutinas adaptadas a este resultado.";
const LOW_RISK: &str =
    "Resultado: Tu riesgo cardiovascular es BAJO. Sigue manteniendo hábitos saludables.";
const NOT_REGISTERED: &str = "No se pudieron obtener tus datos de salud. Regístrate primero.";
const UNDETERMINED: &str = "No se pudo determinar tu estado de salud en este momento.";
const RISK_FAILED: &str = "Hubo un problema al obtener tu estado de salud. Inténtalo más tarde.";

/// Model encoding of the stored gender: 1 female, 2 male, 0 unknown.
pub fn encode_gender(gender: &str) -> u8 {
    let gender = gender.trim().to_lowercase();
    if let Ok(code) = gender.parse::<f64>() {
        return if code == 1.0 || code == 2.0 { code as u8 } else { 0 };
    }
    match gender.as_str() {
        "f" | "female" | "femenino" | "mujer" => 1,
        "m" | "male" | "masculino" | "hombre" => 2,
        _ => 0,
    }
}

pub fn request_from_profile(profile: &UserProfile) -> RiskRequest {
    RiskRequest {
        age: profile.age,
        ap_hi: profile.ap_hi,
        ap_lo: profile.ap_lo,
        height: profile.height,
        weight: profile.weight,
        gender: encode_gender(&profile.gender),
        cholesterol: profile.cholesterol,
        gluc: profile.gluc,
        smoke: profile.smoke.into(),
        alco: profile.alco.into(),
        active: profile.active.into(),
    }
}

/// Map the binary prediction to its message. Only exactly 1 means at risk.
pub fn verdict(prediction: f64) -> &'static str {
    if prediction == 1.0 { AT_RISK } else { LOW_RISK }
}

pub async fn assess(
    models: &dyn HealthModels,
    store: &dyn UserStore,
    sessions: &SessionCache,
    user_id: &str,
) -> Vec<String> {
    info!(user_id = %user_id, "Requesting risk assessment");

    let profile = match sessions.load_profile(user_id, store).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            warn!(user_id = %user_id, "No profile for risk assessment");
            return vec![NOT_REGISTERED.to_string()];
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Failed to load profile for risk assessment");
            return vec![RISK_FAILED.to_string()];
        }
    };

    match models.assess_risk(&request_from_profile(&profile)).await {
        Ok(response) => match response.prediction {
            Some(prediction) => {
                info!(user_id = %user_id, prediction, "Risk prediction received");
                vec![verdict(prediction).to_string()]
            }
            None => {
                warn!(user_id = %user_id, "Risk response had no prediction");
                vec![UNDETERMINED.to_string()]
            }
        },
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Risk request failed");
            vec![RISK_FAILED.to_string()]
        }
    }
}
