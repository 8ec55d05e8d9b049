//! Exercise recommendations.

use tracing::{debug, error, info, warn};

use super::params::{self, Parameters};
use crate::predict::{Exercise, HealthModels, RecommendationRequest};

const NO_RECOMMENDATIONS: &str = "No se pudieron obtener recomendaciones en este momento.";
const RECOMMENDATION_FAILED: &str =
    "Hubo un problema obteniendo tus recomendaciones. Inténtalo más tarde.";

/// Encode the agent's routine parameters for the model.
pub fn request_from_parameters(params: &Parameters) -> RecommendationRequest {
    let top_n = params::number(params, "numberexercises")
        .filter(|n| *n >= 1.0)
        .map_or(1, |n| n as u32);

    RecommendationRequest {
        cardiovascular_safe: params::number_or_zero(params, "cardio"),
        body_part: params::number_or_zero(params, "bodypart"),
        equipment: params::number_or_zero(params, "equipment"),
        level: params::number_or_zero(params, "level"),
        exercise_type: params::number_or_zero(params, "typeexercise"),
        top_n,
    }
}

/// Image file stem for an exercise title: lower-case, whitespace runs to `_`,
/// anything outside `[a-z0-9_]` dropped.
pub fn image_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_whitespace = false;
    for c in title.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            slug.push(c);
        }
    }
    slug
}

pub fn image_url(base_url: &str, title: &str) -> String {
    format!("{}/{}.jpg", base_url.trim_end_matches('/'), image_slug(title))
}

/// Three fragments per exercise: title, description, image.
pub fn exercise_fragments(exercises: &[Exercise], image_base_url: &str) -> Vec<String> {
    exercises
        .iter()
        .flat_map(|exercise| {
            let url = image_url(image_base_url, &exercise.title);
            debug!(title = %exercise.title, url = %url, "Exercise image");
            [
                format!("💪 Ejercicio: *{}*", exercise.title),
                format!("📖 Descripción: {}", exercise.description),
                url,
            ]
        })
        .collect()
}

pub async fn recommend(
    models: &dyn HealthModels,
    image_base_url: &str,
    user_id: &str,
    params: &Parameters,
) -> Vec<String> {
    let request = request_from_parameters(params);
    info!(user_id = %user_id, top_n = request.top_n, "Requesting exercise recommendations");

    match models.recommend(&request).await {
        Ok(response) => match response.exercises {
            Some(exercises) if !exercises.is_empty() => {
                info!(user_id = %user_id, count = exercises.len(), "Recommendations received");
                exercise_fragments(&exercises, image_base_url)
            }
            _ => {
                warn!(user_id = %user_id, "Recommendation service returned no exercises");
                vec![NO_RECOMMENDATIONS.to_string()]
            }
        },
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Recommendation request failed");
            vec![RECOMMENDATION_FAILED.to_string()]
        }
    }
}
