//! Request bodies for create and update
//!
//! The web client sends either JSON or `multipart/form-data` (when an image
//! is attached). Both are read into the same flat field map.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};

use crate::http::error::ApiError;
use crate::http::upload::{UploadedImage, IMAGE_FIELD};

const INVALID_BODY: &str = "Invalid request body";

/// Text fields and an optional image from a create or update request
#[derive(Debug, Default)]
pub struct HabitForm {
    pub fields: Map<String, Value>,
    pub image: Option<UploadedImage>,
}

impl<S> FromRequest<S> for HabitForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(INVALID_BODY, e.body_text()))?;
            read_multipart(multipart).await
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(INVALID_BODY, e.body_text()))?;
            Ok(Self {
                fields: json_fields(&body)?,
                image: None,
            })
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<HabitForm, ApiError> {
    let mut form = HabitForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(INVALID_BODY, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if file_name.is_some() {
            if name != IMAGE_FIELD {
                tracing::debug!("Ignoring file in form field '{}'", name);
                continue;
            }

            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(INVALID_BODY, e.body_text()))?;
            // Browsers send an empty part when no file was picked
            if !bytes.is_empty() && form.image.is_none() {
                form.image = Some(UploadedImage { file_name, bytes });
            }
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(INVALID_BODY, e.body_text()))?;
            form.fields.insert(name, Value::String(text));
        }
    }

    Ok(form)
}

/// Parse a JSON object body; an empty body has no fields
pub fn json_fields(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ApiError::bad_request(INVALID_BODY, "expected a JSON object")),
        Err(e) => Err(ApiError::bad_request(INVALID_BODY, e)),
    }
}
