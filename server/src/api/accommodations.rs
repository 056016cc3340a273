use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_macros::debug_handler;
use catalog::{
    Accommodation, AccommodationChanges, AccommodationFilter, AccommodationList,
    AccommodationQuery, NewAccommodation, accommodation,
};
use contextual::Context;
use data_access::DataAccess;

use super::Error;
use crate::{Admin, AppState};

pub const SPOT_PATH: &str = "/spots/{id}/accommodations";
pub const ITEM_PATH: &str = "/accommodations/{id}";

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access))]
pub async fn list(
    State(data_access): State<DataAccess>,
    Path(spot_id): Path<i64>,
    Query(filter): Query<AccommodationFilter>,
) -> Result<Json<AccommodationList>, Error> {
    let query = AccommodationQuery::new(spot_id, filter)?;
    let list = accommodation::list_for_spot(&data_access, &query)
        .await
        .context(format!("spot {spot_id}"))?;
    Ok(Json(list))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access, body))]
pub async fn create(
    _: Admin,
    State(data_access): State<DataAccess>,
    Path(spot_id): Path<i64>,
    Json(body): Json<NewAccommodation>,
) -> Result<(StatusCode, Json<Accommodation>), Error> {
    let accommodation = accommodation::create(&data_access, spot_id, body.validate()?)
        .await
        .context(format!("spot {spot_id}"))?;

    tracing::info!(id = accommodation.id, "accommodation created");
    Ok((StatusCode::CREATED, Json(accommodation)))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access))]
pub async fn get(
    State(data_access): State<DataAccess>,
    Path(id): Path<i64>,
) -> Result<Json<Accommodation>, Error> {
    let accommodation = accommodation::get(&data_access, id)
        .await
        .context(format!("accommodation {id}"))?;
    Ok(Json(accommodation))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access, body))]
pub async fn update(
    _: Admin,
    State(data_access): State<DataAccess>,
    Path(id): Path<i64>,
    Json(body): Json<AccommodationChanges>,
) -> Result<Json<Accommodation>, Error> {
    let accommodation = accommodation::update(&data_access, id, body.validate()?)
        .await
        .context(format!("accommodation {id}"))?;
    Ok(Json(accommodation))
}

#[debug_handler(state = AppState)]
#[tracing::instrument(skip(data_access))]
pub async fn delete(
    _: Admin,
    State(data_access): State<DataAccess>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    accommodation::delete(&data_access, id)
        .await
        .context(format!("accommodation {id}"))?;

    tracing::info!("accommodation deleted");
    Ok(StatusCode::NO_CONTENT)
}
