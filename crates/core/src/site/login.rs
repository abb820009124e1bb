use crate::transport::Response;

/// Path fragments of pages a tracker sends anonymous visitors to.
const LOGIN_MARKERS: &[&str] = &["login", "signin", "sign_in", "verify", "checkpoint", "takelogin"];

/// Body markers of a login form, used by strict checking.
const LOGIN_FORM_MARKERS: &[&str] = &[
    "type=\"password\"",
    "type='password'",
    "name=\"password\"",
    "name=\"passwd\"",
];

/// Bodies shorter than this are suspicious under strict checking.
const STRICT_BODY_LIMIT: usize = 8 * 1024;

fn is_login_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    // only the path and query matter, hosts like login.example.org are fine
    let tail = match lower.find("://") {
        Some(scheme_end) => {
            let rest = &lower[scheme_end + 3..];
            rest.find('/').map_or("", |i| &rest[i..])
        }
        None => lower.as_str(),
    };
    LOGIN_MARKERS.iter().any(|marker| tail.contains(marker))
}

fn refresh_target(value: &str) -> Option<&str> {
    let lower = value.to_ascii_lowercase();
    let index = lower.find("url=")?;
    Some(value[index + 4..].trim().trim_matches(|c| c == '\'' || c == '"'))
}

/// Default authenticated-session heuristic. Never fails.
pub fn default_login_check(response: &Response, strict: bool) -> bool {
    if is_login_url(&response.final_url) {
        return false;
    }
    if let Some(target) = response.header("refresh").and_then(refresh_target) {
        if is_login_url(target) {
            return false;
        }
    }
    if strict && response.body.len() < STRICT_BODY_LIMIT {
        let body = response.body.to_ascii_lowercase();
        if LOGIN_FORM_MARKERS.iter().any(|marker| body.contains(marker)) {
            return false;
        }
    }
    true
}
