//! User feedback with optional screenshots

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    middleware,
    response::IntoResponse,
    routing::post,
};
use common::error::{ApiError, ApiResult};
use serde_json::json;
use tracing::{error, info, warn};

use auth::{AuthUser, FeedbackMail, middleware::optional_auth_middleware};
use media::storage::feedback_key;

use super::{multipart_error, read_field};
use crate::state::AppState;

const MIN_CONTENT_CHARS: usize = 5;
const MAX_CONTENT_CHARS: usize = 500;
const MAX_CONTACT_CHARS: usize = 100;
const MAX_IMAGES: usize = 5;
const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/feedback", post(submit_feedback))
        .layer(DefaultBodyLimit::max(
            MAX_IMAGES * MAX_IMAGE_SIZE as usize + 1024 * 1024,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            optional_auth_middleware,
        ))
}

struct FeedbackImage {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

async fn submit_feedback(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut content = String::new();
    let mut contact = String::new();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => content = field.text().await.map_err(multipart_error)?,
            "contact" => contact = field.text().await.map_err(multipart_error)?,
            // Extra images beyond the limit are ignored
            "images" if images.len() < MAX_IMAGES => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !content_type.starts_with("image/") {
                    return Err(ApiError::Validation(
                        "Only image attachments are accepted".to_string(),
                    ));
                }
                let file_name = field.file_name().unwrap_or("image.png").to_string();
                let data = read_field(field, MAX_IMAGE_SIZE).await?;
                images.push(FeedbackImage {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let content = content.trim().to_string();
    let contact = contact.trim().to_string();
    let content_chars = content.chars().count();
    if content_chars < MIN_CONTENT_CHARS {
        return Err(ApiError::Validation(format!(
            "Feedback must be at least {} characters",
            MIN_CONTENT_CHARS
        )));
    }
    if content_chars > MAX_CONTENT_CHARS {
        return Err(ApiError::Validation(format!(
            "Feedback must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    if contact.chars().count() > MAX_CONTACT_CHARS {
        return Err(ApiError::Validation(format!(
            "Contact must be at most {} characters",
            MAX_CONTACT_CHARS
        )));
    }

    let mut image_urls = Vec::with_capacity(images.len());
    for image in images {
        let key = feedback_key(&image.file_name);
        match state
            .storage
            .put_object(&key, image.data, &image.content_type)
            .await
        {
            Ok(url) => image_urls.push(url),
            Err(e) => warn!("Failed to store feedback image {}: {:#}", image.file_name, e),
        }
    }

    let feedback = FeedbackMail {
        user_name: user
            .map(|Extension(user)| user.name)
            .unwrap_or_else(|| "Anonymous".to_string()),
        content,
        contact,
        image_urls,
    };

    if let Err(e) = state.mailer.send_feedback(&feedback).await {
        error!("Failed to send feedback email: {:#}", e);
    }

    info!(
        "Feedback received from {} with {} images",
        feedback.user_name,
        feedback.image_urls.len()
    );
    Ok(Json(json!({ "message": "Feedback submitted, thank you!" })))
}
