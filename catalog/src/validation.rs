use std::ops::Deref;

/// Input that passed validation. Only constructed by this crate's `validate`
/// functions, so operations taking a `Valid<T>` never see unchecked input.
#[derive(Debug, Clone, PartialEq)]
pub struct Valid<T>(pub(crate) T);

impl<T> Valid<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("`{field}` must be at most {max} characters long")]
    TooLong { field: &'static str, max: usize },

    #[error("`{field}` must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("`{0}` must not be negative")]
    Negative(&'static str),

    #[error("`min_price` must not be greater than `max_price`")]
    InvertedPriceRange,

    #[error("unknown accommodation kind `{0}`. expected one of `hotel`, `pousada`, `hostel`")]
    UnknownKind(String),

    #[error("no fields to update")]
    NoChanges,
}

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub(crate) fn text(
    field: &'static str,
    value: String,
    max: Option<usize>,
) -> Result<String, ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }

    match max {
        Some(max) if value.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(value.to_string()),
    }
}

pub(crate) fn range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    match (min..=max).contains(&value) {
        true => Ok(value),
        false => Err(ValidationError::OutOfRange { field, min, max }),
    }
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    match value >= 0.0 {
        true => Ok(value),
        false => Err(ValidationError::Negative(field)),
    }
}

/// Empty and whitespace-only filter values mean "no filter".
pub(crate) fn filter(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn optional<T>(
    value: Option<T>,
    check: impl FnOnce(T) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    value.map(check).transpose()
}

/// Unicode lower-casing used for stored and queried filter text.
pub(crate) fn fold(value: &str) -> String {
    value.to_lowercase()
}

/// Escapes `%`, `_` and `\` and wraps `value` for a substring `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
