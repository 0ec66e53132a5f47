//! Request handlers
//!
//! Each handler parses its inputs, runs one action on a blocking thread
//! through the store handle and maps the outcome to a response.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::actions::{self, ActionError, LATEST_HABITS_LIMIT};
use crate::domain::{DomainError, Habit, HabitPatch, NewHabit};
use crate::http::error::ApiError;
use crate::http::form::{json_fields, HabitForm};
use crate::http::upload::{ImageStore, StoredImage, UploadedImage};
use crate::storage::StoreHandle;

/// Source of the current time
pub type Clock = fn() -> DateTime<Utc>;

/// Everything a handler needs, shared across requests
pub struct AppState {
    pub store: StoreHandle,
    pub images: ImageStore,
    pub clock: Clock,
}

impl AppState {
    pub fn new(store: StoreHandle, images: ImageStore) -> Self {
        Self {
            store,
            images,
            clock: Utc::now,
        }
    }

    /// Replace the source of the current time
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub type SharedState = Arc<AppState>;

/// Body of a mark-complete request
#[derive(Debug, Default, Deserialize)]
struct CompleteRequest {
    #[serde(default)]
    date: Option<String>,
}

pub async fn health() -> &'static str {
    "Server is running fine!"
}

pub async fn latest_habits(State(state): State<SharedState>) -> Result<Json<Vec<Habit>>, ApiError> {
    let today = state.today();
    state
        .store
        .call(move |store| actions::list_latest_habits(store, LATEST_HABITS_LIMIT, today))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_action("Failed to fetch habits", e))
}

pub async fn public_habits(State(state): State<SharedState>) -> Result<Json<Vec<Habit>>, ApiError> {
    let today = state.today();
    state
        .store
        .call(move |store| actions::list_public_habits(store, today))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_action("Failed to fetch public habits", e))
}

pub async fn my_habits(
    State(state): State<SharedState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Habit>>, ApiError> {
    let today = state.today();
    state
        .store
        .call(move |store| actions::list_habits_by_creator(store, &email, today))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_action("Failed to fetch user's habits", e))
}

pub async fn create_habit(
    State(state): State<SharedState>,
    form: HabitForm,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const CONTEXT: &str = "Failed to add habit";

    let mut params = NewHabit::from_fields(form.fields)
        .map_err(|e| ApiError::from_action(CONTEXT, e.into()))?;

    let stored = save_image(&state, form.image.as_ref(), CONTEXT).await?;
    if let Some(stored) = &stored {
        params.image_url = Some(stored.url.clone());
    }

    let now = state.now();
    let result = state
        .store
        .call(move |store| actions::create_habit(store, params, now))
        .await;
    let habit_id = discard_on_error(&state, stored.as_ref(), result)
        .await
        .map_err(|e| ApiError::from_action(CONTEXT, e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Habit added successfully", "id": habit_id })),
    ))
}

pub async fn get_habit(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Habit>, ApiError> {
    let today = state.today();
    state
        .store
        .call(move |store| actions::get_habit(store, &id, today))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_action("Failed to fetch habit", e))
}

pub async fn update_habit(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    form: HabitForm,
) -> Result<Json<Habit>, ApiError> {
    const CONTEXT: &str = "Failed to update habit";

    let mut patch = HabitPatch::from_fields(form.fields)
        .map_err(|e| ApiError::from_action(CONTEXT, e.into()))?;

    let stored = save_image(&state, form.image.as_ref(), CONTEXT).await?;
    if let Some(stored) = &stored {
        patch.image_url = Some(stored.url.clone());
    }

    let today = state.today();
    let result = state
        .store
        .call(move |store| actions::update_habit(store, &id, patch, today))
        .await;
    discard_on_error(&state, stored.as_ref(), result)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_action(CONTEXT, e))
}

async fn save_image(
    state: &AppState,
    image: Option<&UploadedImage>,
    context: &str,
) -> Result<Option<StoredImage>, ApiError> {
    match image {
        Some(image) => state
            .images
            .save(image)
            .await
            .map(Some)
            .map_err(|e| ApiError::internal(context, e)),
        None => Ok(None),
    }
}

/// Remove the request's upload if the action failed, so rejected requests
/// leave nothing behind in the upload directory
async fn discard_on_error<T>(
    state: &AppState,
    stored: Option<&StoredImage>,
    result: Result<T, ActionError>,
) -> Result<T, ActionError> {
    if let Some(stored) = stored.filter(|_| result.is_err()) {
        state.images.discard(stored).await;
    }
    result
}

pub async fn mark_complete(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Habit>, ApiError> {
    const CONTEXT: &str = "Failed to mark habit complete";

    let fields = json_fields(&body)?;
    let request: CompleteRequest = serde_json::from_value(Value::Object(fields)).map_err(|e| {
        let err = DomainError::InvalidDate(e.to_string());
        ApiError::from_action(CONTEXT, err.into())
    })?;

    let today = state.today();
    state
        .store
        .call(move |store| actions::mark_complete(store, &id, request.date.as_deref(), today))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_action(CONTEXT, e))
}

pub async fn delete_habit(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .call(move |store| actions::delete_habit(store, &id))
        .await
        .map_err(|e| ApiError::from_action("Failed to delete habit", e))?;

    Ok(Json(json!({ "message": "Habit deleted successfully" })))
}
