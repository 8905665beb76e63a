//! Per-run options and the authorization capability handed to stores

/// Who is touching the settings table
///
/// Stores only accept writes from [`AccessContext::internal`]; the repair is
/// not a user action and must not go through user permission checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessContext {
    /// The host itself (migrations, startup tasks)
    Internal,
    /// A regular user session
    User(String),
}

impl AccessContext {
    pub fn internal() -> Self {
        Self::Internal
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Options bag for a single repair run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub access: AccessContext,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::internal()
    }
}

impl RunOptions {
    /// Options carrying the internal access context
    pub fn internal() -> Self {
        Self {
            access: AccessContext::Internal,
        }
    }

    #[must_use]
    pub fn access(mut self, access: AccessContext) -> Self {
        self.access = access;
        self
    }
}
