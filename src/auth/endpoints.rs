// Endpoint classification

use reqwest::Url;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
pub const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";
pub const VERIFY_TOKEN_PATH: &str = "/auth/verify-token";

/// Endpoints reachable without an access token
pub const PUBLIC_ENDPOINTS: [&str; 5] = [
    LOGIN_PATH,
    REGISTER_PATH,
    FORGOT_PASSWORD_PATH,
    RESET_PASSWORD_PATH,
    REFRESH_TOKEN_PATH,
];

/// True if the URL targets a public endpoint and must not carry a bearer token
pub fn is_public(url: &Url) -> bool {
    let path = url.path();
    PUBLIC_ENDPOINTS.iter().any(|p| path.contains(p))
}

/// True if the URL targets the refresh endpoint itself
pub fn is_refresh(url: &Url) -> bool {
    url.path().contains(REFRESH_TOKEN_PATH)
}
