use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::routing::divisions::is_valid_division;
use crate::shared::schema::category_division_mapping;
use crate::shared::state::AppState;

/// One `(category, division)` routing rule. Edited only from the
/// super-admin surface; authentication happens upstream of this service.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = category_division_mapping)]
pub struct CategoryDivisionMapping {
    pub id: Uuid,
    pub nlp_category: String,
    pub target_division: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Mapping already exists")]
    Duplicate,
    #[error("Unknown division: {0}")]
    InvalidDivision(String),
    #[error("Mapping not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(String),
}

impl axum::response::IntoResponse for MappingError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::Duplicate => StatusCode::CONFLICT,
            Self::InvalidDivision(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<DieselError> for MappingError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Self::Duplicate,
            other => Self::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMappingRequest {
    pub nlp_category: String,
    pub target_division: String,
}

#[derive(Debug, Deserialize)]
pub struct SetMappingActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct MappingListQuery {
    /// Deactivated rows are hidden unless the caller asks for them (the
    /// super-admin UI does, to re-enable rules).
    #[serde(default)]
    pub include_inactive: bool,
}

pub async fn list_mappings(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(query): axum::extract::Query<MappingListQuery>,
) -> Result<Json<Vec<CategoryDivisionMapping>>, MappingError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| MappingError::Database(e.to_string()))?;

    let mut q = category_division_mapping::table.into_boxed();
    if !query.include_inactive {
        q = q.filter(category_division_mapping::is_active.eq(true));
    }

    let mappings: Vec<CategoryDivisionMapping> = q
        .order((
            category_division_mapping::nlp_category.asc(),
            category_division_mapping::target_division.asc(),
        ))
        .load(&mut conn)?;

    Ok(Json(mappings))
}

pub async fn create_mapping(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMappingRequest>,
) -> Result<(axum::http::StatusCode, Json<CategoryDivisionMapping>), MappingError> {
    if !is_valid_division(&req.target_division) {
        return Err(MappingError::InvalidDivision(req.target_division));
    }

    let mut conn = state
        .conn
        .get()
        .map_err(|e| MappingError::Database(e.to_string()))?;

    let mapping = CategoryDivisionMapping {
        id: Uuid::new_v4(),
        nlp_category: req.nlp_category,
        target_division: req.target_division,
        is_active: true,
        created_at: Utc::now(),
    };

    diesel::insert_into(category_division_mapping::table)
        .values(&mapping)
        .execute(&mut conn)?;

    info!(
        "mapping created: {} -> {}",
        mapping.nlp_category, mapping.target_division
    );

    Ok((axum::http::StatusCode::CREATED, Json(mapping)))
}

pub async fn set_mapping_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetMappingActiveRequest>,
) -> Result<Json<CategoryDivisionMapping>, MappingError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| MappingError::Database(e.to_string()))?;

    let updated = diesel::update(
        category_division_mapping::table.filter(category_division_mapping::id.eq(id)),
    )
    .set(category_division_mapping::is_active.eq(req.is_active))
    .execute(&mut conn)?;

    if updated == 0 {
        return Err(MappingError::NotFound);
    }

    let mapping: CategoryDivisionMapping = category_division_mapping::table
        .filter(category_division_mapping::id.eq(id))
        .first(&mut conn)?;

    Ok(Json(mapping))
}

pub fn configure_mapping_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/mappings", get(list_mappings).post(create_mapping))
        .route("/api/mappings/:id", patch(set_mapping_active))
}
