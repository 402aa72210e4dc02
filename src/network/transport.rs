use std::error::Error;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Build the shared HTTP client. Every request carries the anti-forgery header;
/// when no usable token is configured the header is sent empty and the server
/// decides whether to reject.
pub fn build_http_client(
    csrf_token: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-csrftoken"),
        csrf_header_value(csrf_token),
    );

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?;

    Ok(client)
}

fn csrf_header_value(token: Option<&str>) -> HeaderValue {
    let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
        log::warn!("No CSRF token configured; sending empty {CSRF_HEADER}");
        return HeaderValue::from_static("");
    };

    match HeaderValue::from_str(token) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("CSRF token is not a valid header value ({err}); sending empty token");
            HeaderValue::from_static("")
        }
    }
}
