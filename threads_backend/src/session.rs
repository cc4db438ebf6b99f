use crate::error::{FeedError, FeedResult};

/// Who is making a request. Passed explicitly into every use case instead of
/// being read from process-wide auth state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// Builds a session from an optional raw id; blank ids count as anonymous.
    pub fn from_user_id(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::authenticated(id),
            _ => Self::anonymous(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn require_user_id(&self) -> FeedResult<&str> {
        self.user_id().ok_or(FeedError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_anonymous() {
        assert_eq!(Session::from_user_id(Some("  ")), Session::anonymous());
        assert_eq!(Session::from_user_id(None), Session::anonymous());
        assert_eq!(
            Session::from_user_id(Some(" u1 ")).require_user_id(),
            Ok("u1")
        );
        assert_eq!(
            Session::anonymous().require_user_id(),
            Err(FeedError::Unauthenticated)
        );
    }
}
