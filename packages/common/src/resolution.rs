/// Outcome of a best-effort lookup against an external source.
///
/// Enrichment lookups never fail the caller's operation. They either produce
/// a value or they don't, and the caller has to decide what "don't" means.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved(T),
    Unresolved,
}

impl<T> Resolution<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Unresolved => None,
        }
    }

    pub fn as_ref(&self) -> Resolution<&T> {
        match self {
            Self::Resolved(value) => Resolution::Resolved(value),
            Self::Unresolved => Resolution::Unresolved,
        }
    }

    pub fn map<U, F>(self, f: F) -> Resolution<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Resolved(value) => Resolution::Resolved(f(value)),
            Self::Unresolved => Resolution::Unresolved,
        }
    }
}

impl<T> From<Option<T>> for Resolution<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Resolved(v),
            None => Self::Unresolved,
        }
    }
}
