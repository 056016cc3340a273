//! Tourist spots and their accommodations, read and written through
//! [`data_access::DataAccess`] so every query is cached and every mutation
//! invalidates what it changed.

pub mod accommodation;
pub mod spot;
mod validation;

pub use accommodation::{
    ACCOMMODATIONS, Accommodation, AccommodationChanges, AccommodationFilter, AccommodationKind,
    AccommodationList, AccommodationQuery, NewAccommodation,
};
pub use spot::{
    NewSpot, SPOTS, Spot, SpotChanges, SpotFilter, SpotPage, SpotQuery, SpotSummary,
};
pub use validation::{Valid, ValidationError};
