// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::config::MAX_SERVICE_URL_LENGTH;
use crate::error::ModelsError;

/// Checks that a validator service URL is an absolute http(s) URL with an explicit port.
///
/// The check is case insensitive. Accepted form: `http[s]://host.domain:port`
/// with `port` in `0..=65535` and at least one `.` in the URL.
///
/// ```
/// # use relay_models::validate_service_url;
/// assert!(validate_service_url("https://a.example:443").is_ok());
/// assert!(validate_service_url("https://a.example").is_err());
/// assert!(validate_service_url("ftp://a.example:21").is_err());
/// ```
pub fn validate_service_url(url: &str) -> Result<(), ModelsError> {
    if url.is_empty() {
        return Err(ModelsError::InvalidServiceUrl("empty url".to_string()));
    }
    if url.len() > MAX_SERVICE_URL_LENGTH {
        return Err(ModelsError::InvalidServiceUrl(format!(
            "url longer than {} bytes",
            MAX_SERVICE_URL_LENGTH
        )));
    }
    let url = url.to_lowercase();
    let host_and_port = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            ModelsError::InvalidServiceUrl(format!("{} must start with http:// or https://", url))
        })?;
    if host_and_port.is_empty() || host_and_port.contains(char::is_whitespace) {
        return Err(ModelsError::InvalidServiceUrl(format!(
            "{} has an invalid host",
            url
        )));
    }
    let parts: Vec<&str> = url.split(':').collect();
    if parts.len() != 3 {
        return Err(ModelsError::InvalidServiceUrl(format!(
            "{} needs exactly one :port",
            url
        )));
    }
    if parts[2].parse::<u16>().is_err() {
        return Err(ModelsError::InvalidServiceUrl(format!(
            "invalid port {} in {}",
            parts[2], url
        )));
    }
    if !url.contains('.') {
        return Err(ModelsError::InvalidServiceUrl(format!(
            "{} must contain at least one '.'",
            url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_urls() {
        assert!(validate_service_url("http://node.relay.net:8081").is_ok());
        assert!(validate_service_url("HTTPS://NODE.RELAY.NET:0").is_ok());
        assert!(validate_service_url("https://node.relay.net:65535").is_ok());
        assert!(validate_service_url("https://node.relay.net:65536").is_err());
        assert!(validate_service_url("https://node.relay.net:-1").is_err());
        assert!(validate_service_url("https://localhost:8081").is_err());
        assert!(validate_service_url("https://node.relay.net:80:80").is_err());
        assert!(validate_service_url("node.relay.net:8081").is_err());
        assert!(validate_service_url("https://:8081").is_err());
        assert!(validate_service_url("").is_err());
        let long = format!("https://{}.net:1", "a".repeat(MAX_SERVICE_URL_LENGTH));
        assert!(validate_service_url(&long).is_err());
    }
}
