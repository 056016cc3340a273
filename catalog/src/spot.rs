//! Tourist spots.
//!
//! Spots are soft-deleted: a deleted spot keeps its row with `deleted_at` set
//! and disappears from every read.

use cache::{FilterParams, Resource};
use data_access::{DataAccess, Error, InvalidationSet};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};
use time::OffsetDateTime;

use crate::{
    accommodation::ACCOMMODATIONS,
    validation::{Valid, ValidationError, filter, fold, like_pattern, optional, range, text},
};

pub const SPOTS: Resource = Resource::new("spot");

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

const SUMMARY_DESCRIPTION_CHARS: usize = 200;

const NAME_MAX: usize = 255;
const PLACE_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Spot {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A spot as shown in list results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpotSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotPage {
    pub spots: Vec<SpotSummary>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
    pub has_more: bool,
}

/// Raw list parameters as they arrive in a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotFilter {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub search: Option<String>,
}

/// Validated list parameters. `city`, `state` and `country` are
/// case-insensitive substring matches; `search` matches name or description.
/// Filter values are kept lower-cased, so differently cased requests share a
/// cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotQuery {
    pub skip: i64,
    pub limit: i64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSpot {
    pub name: String,
    pub description: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpotChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

impl SpotSummary {
    fn truncated(mut self) -> Self {
        if let Some((cut, _)) = self.description.char_indices().nth(SUMMARY_DESCRIPTION_CHARS) {
            self.description.truncate(cut);
            self.description.push_str("...");
        }
        self
    }
}

impl TryFrom<SpotFilter> for SpotQuery {
    type Error = ValidationError;

    fn try_from(value: SpotFilter) -> Result<Self, Self::Error> {
        let skip = value.skip.unwrap_or(0);
        if skip < 0 {
            return Err(ValidationError::Negative("skip"));
        }

        let limit = value.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::OutOfRange {
                field: "limit",
                min: 1.0,
                max: MAX_LIMIT as f64,
            });
        }

        Ok(Self {
            skip,
            limit,
            city: filter(value.city).map(|v| fold(&v)),
            state: filter(value.state).map(|v| fold(&v)),
            country: filter(value.country).map(|v| fold(&v)),
            search: filter(value.search).map(|v| fold(&v)),
        })
    }
}

impl SpotQuery {
    pub fn params(&self) -> FilterParams {
        FilterParams::new()
            .with("skip", Some(self.skip))
            .with("limit", Some(self.limit))
            .with("city", self.city.as_deref())
            .with("state", self.state.as_deref())
            .with("country", self.country.as_deref())
            .with("search", self.search.as_deref())
    }

    fn push_filters(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE deleted_at IS NULL");

        for (column, value) in [
            ("city_folded", &self.city),
            ("state_folded", &self.state),
            ("country_folded", &self.country),
        ] {
            if let Some(value) = value {
                builder
                    .push(format!(" AND {column} LIKE "))
                    .push_bind(like_pattern(value))
                    .push(" ESCAPE '\\'");
            }
        }

        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            builder
                .push(" AND (name_folded LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description_folded LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }
}

impl NewSpot {
    pub fn validate(self) -> Result<Valid<Self>, ValidationError> {
        Ok(Valid(Self {
            name: text("name", self.name, Some(NAME_MAX))?,
            description: text("description", self.description, None)?,
            city: text("city", self.city, Some(PLACE_MAX))?,
            state: text("state", self.state, Some(PLACE_MAX))?,
            country: text("country", self.country, Some(PLACE_MAX))?,
            latitude: range("latitude", self.latitude, -90.0, 90.0)?,
            longitude: range("longitude", self.longitude, -180.0, 180.0)?,
            address: text("address", self.address, None)?,
        }))
    }
}

impl SpotChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.address.is_none()
    }

    pub fn validate(self) -> Result<Valid<Self>, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::NoChanges);
        }

        Ok(Valid(Self {
            name: optional(self.name, |v| text("name", v, Some(NAME_MAX)))?,
            description: optional(self.description, |v| text("description", v, None))?,
            city: optional(self.city, |v| text("city", v, Some(PLACE_MAX)))?,
            state: optional(self.state, |v| text("state", v, Some(PLACE_MAX)))?,
            country: optional(self.country, |v| text("country", v, Some(PLACE_MAX)))?,
            latitude: optional(self.latitude, |v| range("latitude", v, -90.0, 90.0))?,
            longitude: optional(self.longitude, |v| range("longitude", v, -180.0, 180.0))?,
            address: optional(self.address, |v| text("address", v, None))?,
        }))
    }
}

#[tracing::instrument(skip(data_access), err(level = "debug"))]
pub async fn get(data_access: &DataAccess, id: i64) -> Result<Spot, Error> {
    data_access
        .read(SPOTS.detail(id), |pool| {
            sqlx::query_as::<_, Spot>(
                r#"
                SELECT id, name, description, city, state, country, latitude, longitude, address,
                       created_at, updated_at
                FROM spots
                WHERE id = ? AND deleted_at IS NULL
                "#,
            )
            .bind(id)
            .fetch_one(pool)
        })
        .await
}

/// One page of live spots, newest first, with the total number of matches.
#[tracing::instrument(skip(data_access), err)]
pub async fn list(data_access: &DataAccess, query: &SpotQuery) -> Result<SpotPage, Error> {
    let query = query.clone();

    data_access
        .read(SPOTS.list(&query.params()), |pool| async move {
            // one snapshot for the count and the page
            let mut tx = pool.begin().await?;

            let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM spots");
            query.push_filters(&mut count);
            let total = count
                .build_query_scalar::<i64>()
                .fetch_one(&mut *tx)
                .await?;

            let mut select = QueryBuilder::<Sqlite>::new(
                "SELECT id, name, description, city, state, country, created_at FROM spots",
            );
            query.push_filters(&mut select);
            select
                .push(" ORDER BY id DESC LIMIT ")
                .push_bind(query.limit)
                .push(" OFFSET ")
                .push_bind(query.skip);

            let spots = select
                .build_query_as::<SpotSummary>()
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .map(SpotSummary::truncated)
                .collect::<Vec<_>>();

            tx.commit().await?;

            let has_more = query.skip + (spots.len() as i64) < total;

            Ok::<_, sqlx::Error>(SpotPage {
                spots,
                total,
                skip: query.skip,
                limit: query.limit,
                has_more,
            })
        })
        .await
}

#[tracing::instrument(skip_all, fields(name = %spot.name), err)]
pub async fn create(data_access: &DataAccess, spot: Valid<NewSpot>) -> Result<Spot, Error> {
    let spot = spot.into_inner();
    let name_folded = fold(&spot.name);
    let description_folded = fold(&spot.description);
    let city_folded = fold(&spot.city);
    let state_folded = fold(&spot.state);
    let country_folded = fold(&spot.country);
    let now = OffsetDateTime::now_utc();

    data_access
        .write(
            |pool| {
                sqlx::query_as::<_, Spot>(
                    r#"
                    INSERT INTO spots
                    (name, description, city, state, country, latitude, longitude, address,
                     created_at, updated_at,
                     name_folded, description_folded, city_folded, state_folded, country_folded)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    RETURNING id, name, description, city, state, country, latitude, longitude,
                              address, created_at, updated_at
                    "#,
                )
                .bind(spot.name)
                .bind(spot.description)
                .bind(spot.city)
                .bind(spot.state)
                .bind(spot.country)
                .bind(spot.latitude)
                .bind(spot.longitude)
                .bind(spot.address)
                .bind(now)
                .bind(now)
                .bind(name_folded)
                .bind(description_folded)
                .bind(city_folded)
                .bind(state_folded)
                .bind(country_folded)
                .fetch_one(pool)
            },
            |_| InvalidationSet::new().with_lists(SPOTS),
        )
        .await
}

#[tracing::instrument(skip(data_access, changes), err(level = "debug"))]
pub async fn update(
    data_access: &DataAccess,
    id: i64,
    changes: Valid<SpotChanges>,
) -> Result<Spot, Error> {
    let changes = changes.into_inner();
    let folded = |value: &Option<String>| value.as_deref().map(fold);
    let name_folded = folded(&changes.name);
    let description_folded = folded(&changes.description);
    let city_folded = folded(&changes.city);
    let state_folded = folded(&changes.state);
    let country_folded = folded(&changes.country);
    let now = OffsetDateTime::now_utc();

    data_access
        .write(
            |pool| {
                sqlx::query_as::<_, Spot>(
                    r#"
                    UPDATE spots SET
                        name = COALESCE(?, name),
                        description = COALESCE(?, description),
                        city = COALESCE(?, city),
                        state = COALESCE(?, state),
                        country = COALESCE(?, country),
                        latitude = COALESCE(?, latitude),
                        longitude = COALESCE(?, longitude),
                        address = COALESCE(?, address),
                        name_folded = COALESCE(?, name_folded),
                        description_folded = COALESCE(?, description_folded),
                        city_folded = COALESCE(?, city_folded),
                        state_folded = COALESCE(?, state_folded),
                        country_folded = COALESCE(?, country_folded),
                        updated_at = ?
                    WHERE id = ? AND deleted_at IS NULL
                    RETURNING id, name, description, city, state, country, latitude, longitude,
                              address, created_at, updated_at
                    "#,
                )
                .bind(changes.name)
                .bind(changes.description)
                .bind(changes.city)
                .bind(changes.state)
                .bind(changes.country)
                .bind(changes.latitude)
                .bind(changes.longitude)
                .bind(changes.address)
                .bind(name_folded)
                .bind(description_folded)
                .bind(city_folded)
                .bind(state_folded)
                .bind(country_folded)
                .bind(now)
                .bind(id)
                .fetch_one(pool)
            },
            |spot| InvalidationSet::entity(SPOTS, spot.id),
        )
        .await
}

/// Soft-deletes a live spot. Accommodation lists are invalidated too, since
/// they are only served for live spots.
#[tracing::instrument(skip(data_access), err(level = "debug"))]
pub async fn delete(data_access: &DataAccess, id: i64) -> Result<(), Error> {
    let now = OffsetDateTime::now_utc();

    data_access
        .write(
            |pool| {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    UPDATE spots SET deleted_at = ?, updated_at = ?
                    WHERE id = ? AND deleted_at IS NULL
                    RETURNING id
                    "#,
                )
                .bind(now)
                .bind(now)
                .bind(id)
                .fetch_one(pool)
            },
            |id| InvalidationSet::entity(SPOTS, id).with_lists(ACCOMMODATIONS),
        )
        .await
        .map(|_| ())
}
