pub mod admin;
pub mod auth;
pub mod contact;
pub mod events;
pub mod notifications;
pub mod users;

use crate::config::ApiConfig;

/// Parse page/limit the permissive way form clients send them: missing or
/// non-numeric values fall back to defaults instead of rejecting the request.
pub(crate) fn page_params(page: Option<&str>, limit: Option<&str>, api: &ApiConfig) -> (i64, i64) {
    let page = page
        .and_then(|p| p.parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = limit
        .and_then(|l| l.parse::<i64>().ok())
        .filter(|l| *l >= 1)
        .unwrap_or(api.default_page_limit)
        .min(api.max_page_limit);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> ApiConfig {
        ApiConfig {
            default_page_limit: 10,
            max_page_limit: 100,
        }
    }

    #[test]
    fn defaults_when_missing_or_garbage() {
        assert_eq!(page_params(None, None, &api()), (1, 10));
        assert_eq!(page_params(Some("abc"), Some("-3"), &api()), (1, 10));
        assert_eq!(page_params(Some("0"), Some("0"), &api()), (1, 10));
    }

    #[test]
    fn parses_and_clamps() {
        assert_eq!(page_params(Some("4"), Some("25"), &api()), (4, 25));
        assert_eq!(page_params(Some("2"), Some("9999"), &api()), (2, 100));
    }
}
