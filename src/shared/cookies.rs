use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Read a (percent-decoded) cookie value from the request headers
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
}

/// An HttpOnly, same-site cookie scoped to the whole site
pub fn build_cookie(name: &str, value: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs as i64))
        .secure(secure)
        .build()
}

/// A cookie that tells the browser to drop `name`
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = build_cookie(name, String::new(), 0, false);
    cookie.make_removal();
    cookie
}

/// Append a percent-encoded `Set-Cookie` header to a response
pub fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.encoded().to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Dropping invalid Set-Cookie value: {}", e),
    }
}
