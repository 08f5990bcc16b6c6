/// Outcome of a create-or-get style lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted<T> {
    /// The call created the entry
    Created(T),
    /// The entry was already there
    Existing(T),
    NotFound,
}

impl<T> Persisted<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub fn as_ref(&self) -> Persisted<&T> {
        match self {
            Self::Created(v) => Persisted::Created(v),
            Self::Existing(v) => Persisted::Existing(v),
            Self::NotFound => Persisted::NotFound,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Persisted<U> {
        match self {
            Self::Created(v) => Persisted::Created(f(v)),
            Self::Existing(v) => Persisted::Existing(f(v)),
            Self::NotFound => Persisted::NotFound,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Created(v) | Self::Existing(v) => Some(v),
            Self::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants() {
        assert!(Persisted::Created(1).is_created());
        assert!(Persisted::Existing(1).is_found());
        assert!(!Persisted::<i32>::NotFound.is_found());
        assert_eq!(Persisted::Existing(2).map(|v| v * 2).into_option(), Some(4));
        assert_eq!(Persisted::<i32>::NotFound.into_option(), None);
    }
}
