use std::{fmt::Display, str::FromStr};

use cache::{FilterParams, Resource};
use data_access::{DataAccess, Error, InvalidationSet};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, Type, error::BoxDynError};
use time::OffsetDateTime;

use crate::validation::{Valid, ValidationError, filter, non_negative, optional, text};

pub const ACCOMMODATIONS: Resource = Resource::new("accommodation");

const NAME_MAX: usize = 255;
const PHONE_MAX: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccommodationKind {
    Hotel,
    Pousada,
    Hostel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Accommodation {
    pub id: i64,
    pub spot_id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub avg_price: Option<f64>,
    pub kind: AccommodationKind,
    pub booking_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccommodationList {
    pub accommodations: Vec<Accommodation>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccommodationFilter {
    pub kind: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// Accommodations of one live spot, cheapest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AccommodationQuery {
    pub spot_id: i64,
    pub kind: Option<AccommodationKind>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewAccommodation {
    pub name: String,
    pub address: String,
    pub kind: String,
    pub phone: Option<String>,
    pub avg_price: Option<f64>,
    pub booking_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccommodationChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub kind: Option<String>,
    pub phone: Option<String>,
    pub avg_price: Option<f64>,
    pub booking_url: Option<String>,
}

impl AccommodationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            AccommodationKind::Hotel => "hotel",
            AccommodationKind::Pousada => "pousada",
            AccommodationKind::Hostel => "hostel",
        }
    }
}

impl FromStr for AccommodationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hotel" => Ok(AccommodationKind::Hotel),
            "pousada" => Ok(AccommodationKind::Pousada),
            "hostel" => Ok(AccommodationKind::Hostel),
            _ => Err(ValidationError::UnknownKind(s.to_string())),
        }
    }
}

impl Display for AccommodationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Type<Sqlite> for AccommodationKind {
    fn type_info() -> <Sqlite as sqlx::Database>::TypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &<Sqlite as sqlx::Database>::TypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }
}

impl sqlx::Encode<'_, Sqlite> for AccommodationKind {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'_>,
    ) -> Result<sqlx::encode::IsNull, BoxDynError> {
        <String as sqlx::Encode<Sqlite>>::encode_by_ref(&self.as_str().to_string(), buf)
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for AccommodationKind {
    fn decode(value: <Sqlite as sqlx::Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        let kind = <String as sqlx::Decode<Sqlite>>::decode(value)?;
        Ok(kind.parse::<Self>()?)
    }
}

impl AccommodationQuery {
    pub fn new(spot_id: i64, filter: AccommodationFilter) -> Result<Self, ValidationError> {
        let kind = crate::validation::filter(filter.kind)
            .map(|kind| kind.parse::<AccommodationKind>())
            .transpose()?;
        let min_price = optional(filter.min_price, |v| non_negative("min_price", v))?;
        let max_price = optional(filter.max_price, |v| non_negative("max_price", v))?;

        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(ValidationError::InvertedPriceRange);
            }
        }

        Ok(Self {
            spot_id,
            kind,
            min_price,
            max_price,
        })
    }

    pub fn params(&self) -> FilterParams {
        FilterParams::new()
            .with("spot_id", Some(self.spot_id))
            .with("kind", self.kind)
            .with("min_price", self.min_price)
            .with("max_price", self.max_price)
    }
}

impl NewAccommodation {
    pub fn validate(self) -> Result<Valid<Self>, ValidationError> {
        Ok(Valid(Self {
            name: text("name", self.name, Some(NAME_MAX))?,
            address: text("address", self.address, None)?,
            kind: self.kind.parse::<AccommodationKind>()?.as_str().to_string(),
            phone: optional(filter(self.phone), |v| text("phone", v, Some(PHONE_MAX)))?,
            avg_price: optional(self.avg_price, |v| non_negative("avg_price", v))?,
            booking_url: filter(self.booking_url),
        }))
    }
}

impl AccommodationChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.kind.is_none()
            && self.phone.is_none()
            && self.avg_price.is_none()
            && self.booking_url.is_none()
    }

    pub fn validate(self) -> Result<Valid<Self>, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::NoChanges);
        }

        Ok(Valid(Self {
            name: optional(self.name, |v| text("name", v, Some(NAME_MAX)))?,
            address: optional(self.address, |v| text("address", v, None))?,
            kind: optional(self.kind, |v| {
                Ok(v.parse::<AccommodationKind>()?.as_str().to_string())
            })?,
            phone: optional(self.phone, |v| text("phone", v, Some(PHONE_MAX)))?,
            avg_price: optional(self.avg_price, |v| non_negative("avg_price", v))?,
            booking_url: optional(self.booking_url, |v| text("booking_url", v, None))?,
        }))
    }
}

#[tracing::instrument(skip(data_access), err(level = "debug"))]
pub async fn get(data_access: &DataAccess, id: i64) -> Result<Accommodation, Error> {
    data_access
        .read(ACCOMMODATIONS.detail(id), |pool| {
            sqlx::query_as::<_, Accommodation>(
                r#"
                SELECT id, spot_id, name, address, phone, avg_price, kind, booking_url,
                       created_at, updated_at
                FROM accommodations
                WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_one(pool)
        })
        .await
}

/// Fails with [`Error::NotFound`] when the spot is absent or deleted.
#[tracing::instrument(skip(data_access), err(level = "debug"))]
pub async fn list_for_spot(
    data_access: &DataAccess,
    query: &AccommodationQuery,
) -> Result<AccommodationList, Error> {
    let query = query.clone();

    data_access
        .read(ACCOMMODATIONS.list(&query.params()), |pool| async move {
            let mut tx = pool.begin().await?;

            sqlx::query_scalar::<_, i64>("SELECT id FROM spots WHERE id = ? AND deleted_at IS NULL")
                .bind(query.spot_id)
                .fetch_one(&mut *tx)
                .await?;

            let mut select = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT id, spot_id, name, address, phone, avg_price, kind, booking_url,
                       created_at, updated_at
                FROM accommodations
                WHERE spot_id = "#,
            );
            select.push_bind(query.spot_id);

            if let Some(kind) = query.kind {
                select.push(" AND kind = ").push_bind(kind);
            }
            if let Some(min_price) = query.min_price {
                select.push(" AND avg_price >= ").push_bind(min_price);
            }
            if let Some(max_price) = query.max_price {
                select.push(" AND avg_price <= ").push_bind(max_price);
            }

            // unpriced entries go last
            select.push(" ORDER BY avg_price IS NULL, avg_price ASC, id ASC");

            let accommodations = select
                .build_query_as::<Accommodation>()
                .fetch_all(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok::<_, sqlx::Error>(AccommodationList {
                total: accommodations.len(),
                accommodations,
            })
        })
        .await
}

/// Fails with [`Error::NotFound`] when the spot is absent or deleted.
#[tracing::instrument(skip(data_access, accommodation), err(level = "debug"))]
pub async fn create(
    data_access: &DataAccess,
    spot_id: i64,
    accommodation: Valid<NewAccommodation>,
) -> Result<Accommodation, Error> {
    let accommodation = accommodation.into_inner();
    let now = OffsetDateTime::now_utc();

    data_access
        .write(
            |pool| {
                sqlx::query_as::<_, Accommodation>(
                    r#"
                    INSERT INTO accommodations
                    (spot_id, name, address, phone, avg_price, kind, booking_url,
                     created_at, updated_at)
                    SELECT id, ?, ?, ?, ?, ?, ?, ?, ?
                    FROM spots
                    WHERE id = ? AND deleted_at IS NULL
                    RETURNING id, spot_id, name, address, phone, avg_price, kind, booking_url,
                              created_at, updated_at
                    "#,
                )
                .bind(accommodation.name)
                .bind(accommodation.address)
                .bind(accommodation.phone)
                .bind(accommodation.avg_price)
                .bind(accommodation.kind)
                .bind(accommodation.booking_url)
                .bind(now)
                .bind(now)
                .bind(spot_id)
                .fetch_one(pool)
            },
            |_| InvalidationSet::new().with_lists(ACCOMMODATIONS),
        )
        .await
}

#[tracing::instrument(skip(data_access, changes), err(level = "debug"))]
pub async fn update(
    data_access: &DataAccess,
    id: i64,
    changes: Valid<AccommodationChanges>,
) -> Result<Accommodation, Error> {
    let changes = changes.into_inner();
    let now = OffsetDateTime::now_utc();

    data_access
        .write(
            |pool| {
                sqlx::query_as::<_, Accommodation>(
                    r#"
                    UPDATE accommodations SET
                        name = COALESCE(?, name),
                        address = COALESCE(?, address),
                        kind = COALESCE(?, kind),
                        phone = COALESCE(?, phone),
                        avg_price = COALESCE(?, avg_price),
                        booking_url = COALESCE(?, booking_url),
                        updated_at = ?
                    WHERE id = ?
                    RETURNING id, spot_id, name, address, phone, avg_price, kind, booking_url,
                              created_at, updated_at
                    "#,
                )
                .bind(changes.name)
                .bind(changes.address)
                .bind(changes.kind)
                .bind(changes.phone)
                .bind(changes.avg_price)
                .bind(changes.booking_url)
                .bind(now)
                .bind(id)
                .fetch_one(pool)
            },
            |accommodation| InvalidationSet::entity(ACCOMMODATIONS, accommodation.id),
        )
        .await
}

#[tracing::instrument(skip(data_access), err(level = "debug"))]
pub async fn delete(data_access: &DataAccess, id: i64) -> Result<(), Error> {
    data_access
        .write(
            |pool| {
                sqlx::query_scalar::<_, i64>("DELETE FROM accommodations WHERE id = ? RETURNING id")
                    .bind(id)
                    .fetch_one(pool)
            },
            |id| InvalidationSet::entity(ACCOMMODATIONS, id),
        )
        .await
        .map(|_| ())
}
