//! # Check Catalog API
//!
//! Read-only views of the regions and the ordered check plan.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use cgw_core::{CheckCatalog, CheckCategory, CheckDefinition, Region};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionView {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckView {
    pub id: String,
    pub name: String,
    pub description: String,
    /// `technical`, or the region id for regional checks.
    pub scope: String,
}

impl From<&CheckDefinition> for CheckView {
    fn from(c: &CheckDefinition) -> Self {
        let scope = match c.category {
            CheckCategory::Technical => "technical".to_string(),
            CheckCategory::Regional(region) => region.id().to_string(),
        };
        Self {
            id: c.id.to_string(),
            name: c.name.clone(),
            description: c.description.clone(),
            scope,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckPlanView {
    /// The region the plan is for; absent when listing the whole catalog.
    pub region: Option<String>,
    pub checks: Vec<CheckView>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckQuery {
    /// Region id (`eu`, `uk`, `us`, `apac`).
    pub region: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/catalog/regions", get(list_regions))
        .route("/v1/catalog/checks", get(list_checks))
}

/// GET /v1/catalog/regions: Regions in display order.
#[utoipa::path(
    get,
    path = "/v1/catalog/regions",
    responses((status = 200, description = "Regions", body = Vec<RegionView>)),
    tag = "catalog"
)]
async fn list_regions(State(_state): State<AppState>) -> Json<Vec<RegionView>> {
    Json(
        Region::ALL
            .iter()
            .map(|r| RegionView {
                id: r.id().to_string(),
                name: r.display_name().to_string(),
            })
            .collect(),
    )
}

/// GET /v1/catalog/checks: The ordered plan for a region, or the whole
/// catalog without one.
#[utoipa::path(
    get,
    path = "/v1/catalog/checks",
    params(CheckQuery),
    responses(
        (status = 200, description = "Ordered checks", body = CheckPlanView),
        (status = 422, description = "Unknown region", body = crate::error::ErrorBody),
    ),
    tag = "catalog"
)]
async fn list_checks(
    State(_state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckPlanView>, AppError> {
    let view = match query.region.as_deref() {
        Some(raw) => {
            let region: Region = raw.parse()?;
            CheckPlanView {
                region: Some(region.id().to_string()),
                checks: CheckCatalog::plan_for(region).iter().map(CheckView::from).collect(),
            }
        }
        None => CheckPlanView {
            region: None,
            checks: CheckCatalog::all().iter().map(CheckView::from).collect(),
        },
    };
    Ok(Json(view))
}
