//! Account lifecycle: registration and deletion.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use super::params::{self, Parameters};
use crate::session::{SessionCache, SessionEntry};
use crate::store::{UNKNOWN_GENDER, UNKNOWN_NAME, UserProfile, UserStore};

const REGISTERED: &str = "Tu registro ha sido completado con éxito. ¡Bienvenido!";
const REGISTER_FAILED: &str = "Hubo un problema al registrar tus datos. Inténtalo más tarde.";
const DELETED: &str =
    "Tu cuenta ha sido eliminada correctamente. Si deseas volver, regístrate de nuevo.";
const DELETE_FAILED: &str = "Hubo un problema al eliminar tu cuenta. Inténtalo más tarde.";

/// Build a profile from the agent's registration parameters.
///
/// Missing numbers become 0, missing flags false, and missing strings a placeholder.
pub fn profile_from_parameters(params: &Parameters, registered_at: DateTime<Utc>) -> UserProfile {
    UserProfile {
        name: params::person_name(params, "name").unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        age: params::number_or_zero(params, "age"),
        gender: params::text(params, "gender").unwrap_or_else(|| UNKNOWN_GENDER.to_string()),
        height: params::number_or_zero(params, "height"),
        weight: params::number_or_zero(params, "weight"),
        ap_hi: params::number_or_zero(params, "ap_hi"),
        ap_lo: params::number_or_zero(params, "ap_lo"),
        cholesterol: params::number_or_zero(params, "cholesterol"),
        gluc: params::number_or_zero(params, "gluc"),
        smoke: params::flag(params, "smoke"),
        alco: params::flag(params, "alco"),
        active: params::flag(params, "active"),
        registered_at,
        wearable_access_token: None,
        wearable_refresh_token: None,
    }
}

/// Write a full profile and mark the session active.
pub async fn register(
    store: &dyn UserStore,
    sessions: &SessionCache,
    user_id: &str,
    params: &Parameters,
) -> String {
    info!(user_id = %user_id, "Registering user");
    let profile = profile_from_parameters(params, Utc::now());

    match store.set(user_id, &profile).await {
        Ok(()) => {
            sessions.put(user_id, SessionEntry::registered(profile)).await;
            info!(user_id = %user_id, "User registered");
            REGISTERED.to_string()
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Failed to register user");
            REGISTER_FAILED.to_string()
        }
    }
}

/// Remove the stored profile and forget the session.
pub async fn delete_account(store: &dyn UserStore, sessions: &SessionCache, user_id: &str) -> String {
    info!(user_id = %user_id, "Deleting user");

    match store.delete(user_id).await {
        Ok(()) => {
            sessions.delete(user_id).await;
            info!(user_id = %user_id, "User deleted");
            DELETED.to_string()
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Failed to delete user");
            DELETE_FAILED.to_string()
        }
    }
}
