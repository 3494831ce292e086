//! Default endpoint paths and storage key names
//!
//! All of these can be overridden at construction time; they only exist so a
//! client talking to a conventional backend needs no extra configuration.

/// Login endpoint, relative to the API base URL
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Refresh endpoint, relative to the API base URL
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Logout endpoint, relative to the API base URL
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";

/// Storage key for the access token
pub const DEFAULT_ACCESS_KEY: &str = "access_token";

/// Storage key for the refresh token
pub const DEFAULT_REFRESH_KEY: &str = "refresh_token";

/// Storage key for the cached user profile (JSON-encoded)
pub const DEFAULT_USER_KEY: &str = "user_profile";
