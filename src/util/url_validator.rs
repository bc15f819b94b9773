use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating a service base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP pointed at a non-loopback host.
    #[error("Insecure base URL: HTTPS required (except localhost for emulators)")]
    Insecure,
    /// The URL carries a query string or fragment, which would corrupt request paths.
    #[error("Base URL must not contain a query or fragment")]
    HasQuery,
}

/// Validates the base URL of the document store or the functions endpoint.
///
/// The API key travels in the query string of every store request, so plain
/// HTTP is only accepted for loopback hosts (local emulators and tests).
///
/// # Examples
///
/// ```
/// use folio::util::validate_base_url;
///
/// assert!(validate_base_url("https://firestore.googleapis.com").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://example.com").is_err());
/// assert!(validate_base_url("ftp://example.com").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_loopback_host(&url) {
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS base URL (loopback only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::HasQuery);
    }

    Ok(url)
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_accepted() {
        let url = validate_base_url("https://us-central1-demo.cloudfunctions.net").unwrap();
        assert_eq!(url.host_str(), Some("us-central1-demo.cloudfunctions.net"));
    }

    #[test]
    fn test_http_loopback_accepted() {
        assert!(validate_base_url("http://localhost:5001").is_ok());
        assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
        assert!(validate_base_url("http://[::1]:8080").is_ok());
    }

    #[test]
    fn test_http_remote_rejected() {
        let err = validate_base_url("http://firestore.googleapis.com").unwrap_err();
        assert!(matches!(err, UrlValidationError::Insecure));
    }

    #[test]
    fn test_private_ip_over_http_rejected() {
        assert!(validate_base_url("http://192.168.1.10:8080").is_err());
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        assert!(matches!(
            validate_base_url("file:///etc/passwd").unwrap_err(),
            UrlValidationError::UnsupportedScheme(_)
        ));
    }

    #[test]
    fn test_query_rejected() {
        assert!(matches!(
            validate_base_url("https://example.com/?key=abc").unwrap_err(),
            UrlValidationError::HasQuery
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validate_base_url("not a url").is_err());
    }
}
