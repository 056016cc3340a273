use std::fmt::{self, Debug, Display};

/// An error `E` together with a description of what was being attempted.
pub struct Error<E> {
    context: String,
    source: E,
}

pub trait Context<T, E> {
    fn context(self, context: impl ToString) -> Result<T, Error<E>>;

    fn with_context<C: ToString>(self, f: impl FnOnce() -> C) -> Result<T, Error<E>>;
}

impl<E> Error<E> {
    pub fn new(context: impl ToString, source: E) -> Self {
        Self {
            context: context.to_string(),
            source,
        }
    }

    #[inline]
    pub fn context(&self) -> &str {
        &self.context
    }

    #[inline]
    pub fn inner(&self) -> &E {
        &self.source
    }

    #[inline]
    pub fn into_inner(self) -> E {
        self.source
    }
}

impl<T, E> Context<T, E> for Result<T, E> {
    #[inline]
    fn context(self, context: impl ToString) -> Result<T, Error<E>> {
        self.map_err(|source| Error::new(context, source))
    }

    #[inline]
    fn with_context<C: ToString>(self, f: impl FnOnce() -> C) -> Result<T, Error<E>> {
        self.map_err(|source| Error::new(f(), source))
    }
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.context, self.source)
    }
}

impl<E: Debug> Debug for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {:?}", self.context, self.source)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Error<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
