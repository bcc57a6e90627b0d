use candela_types::CandelaError;

/// Observable state of a [`Resource`](super::Resource).
///
/// `data` survives a new fetch's loading phase and is only replaced by the
/// next success or cleared by the next failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState<D, E = CandelaError> {
    /// Result of the last successful fetch, if still valid.
    pub data: Option<D>,
    /// Whether a fetch of the current generation is outstanding.
    pub loading: bool,
    /// Failure of the last completed fetch.
    pub error: Option<E>,
}

impl<D, E> Default for ResourceState<D, E> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<D, E> ResourceState<D, E> {
    /// Nothing loaded, nothing in flight.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    /// Settled with `data`.
    #[must_use]
    pub const fn success(data: D) -> Self {
        Self {
            data: Some(data),
            loading: false,
            error: None,
        }
    }

    /// Settled with `error`; any previous data is dropped.
    #[must_use]
    pub const fn failed(error: E) -> Self {
        Self {
            data: None,
            loading: false,
            error: Some(error),
        }
    }

    /// Fresh fetch started: keep data, clear error.
    #[must_use]
    pub fn revalidating(self) -> Self {
        Self {
            data: self.data,
            loading: true,
            error: None,
        }
    }

    /// `true` for the initial/reset state.
    pub const fn is_idle(&self) -> bool {
        !self.loading && self.data.is_none() && self.error.is_none()
    }

    /// `true` while a fetch of the current generation is outstanding.
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// `true` once a fetch succeeded and nothing newer is loading.
    pub const fn is_success(&self) -> bool {
        !self.loading && self.data.is_some()
    }

    /// `true` once a fetch failed and nothing newer is loading.
    pub const fn is_failed(&self) -> bool {
        !self.loading && self.error.is_some()
    }
}
