use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_macros::debug_handler;
use catalog::{NewSpot, Spot, SpotChanges, SpotFilter, SpotPage, SpotQuery, spot};
use contextual::Context;
use data_access::DataAccess;

use super::Error;
use crate::{Admin, AppState};

pub const PATH: &str = "/spots";
pub const ITEM_PATH: &str = "/spots/{id}";

#[debug_handler(state = AppState)]
#[tracing::instrument(skip_all, fields(?filter))]
pub async fn list(
    State(data_access): State<DataAccess>,
    Query(filter): Query<SpotFilter>,
) -> Result<Json<SpotPage>, Error> {
    let query = SpotQuery::try_from(filter)?;
    let page = spot::list(&data_access, &query)
        .await
        .context("list spots")?;
    Ok(Json(page))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access))]
pub async fn get(
    State(data_access): State<DataAccess>,
    Path(id): Path<i64>,
) -> Result<Json<Spot>, Error> {
    let spot = spot::get(&data_access, id)
        .await
        .context(format!("spot {id}"))?;
    Ok(Json(spot))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip_all, fields(name = %body.name))]
pub async fn create(
    _: Admin,
    State(data_access): State<DataAccess>,
    Json(body): Json<NewSpot>,
) -> Result<(StatusCode, Json<Spot>), Error> {
    let spot = spot::create(&data_access, body.validate()?)
        .await
        .context("create spot")?;

    tracing::info!(id = spot.id, "spot created");
    Ok((StatusCode::CREATED, Json(spot)))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access, body))]
pub async fn update(
    _: Admin,
    State(data_access): State<DataAccess>,
    Path(id): Path<i64>,
    Json(body): Json<SpotChanges>,
) -> Result<Json<Spot>, Error> {
    let spot = spot::update(&data_access, id, body.validate()?)
        .await
        .context(format!("spot {id}"))?;
    Ok(Json(spot))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access))]
pub async fn delete(
    _: Admin,
    State(data_access): State<DataAccess>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    spot::delete(&data_access, id)
        .await
        .context(format!("spot {id}"))?;

    tracing::info!("spot deleted");
    Ok(StatusCode::NO_CONTENT)
}
