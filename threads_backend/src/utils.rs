use chrono::Utc;

pub const APP_NAME: &str = "threads_backend";

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Header carrying the caller's user id on every REST request.
pub const USER_ID_HEADER: &str = "x-user-id";
