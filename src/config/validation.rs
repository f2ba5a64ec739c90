use crate::config::types::{
    ApiConfig, CatalogConfig, Config, PlannerConfig, PublisherConfig, RetryConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_publisher_config(&config.publisher)?;
    validate_catalog_config(&config.catalog)?;
    validate_planner_config(&config.planner)?;
    Ok(())
}

/// Validates source API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "threshold must be >= 1, got {}",
            config.threshold
        )));
    }

    if config.page_ceiling < 1 {
        return Err(ConfigError::Validation(format!(
            "page_ceiling must be >= 1, got {}",
            config.page_ceiling
        )));
    }

    if config.request_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be >= 100ms, got {}ms",
            config.request_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry budgets
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    for (name, attempts) in [
        ("probe_attempts", config.probe_attempts),
        ("leaf_attempts", config.leaf_attempts),
    ] {
        if !(1..=10).contains(&attempts) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and 10, got {}",
                name, attempts
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates message broker configuration
fn validate_publisher_config(config: &PublisherConfig) -> Result<(), ConfigError> {
    Url::parse(&config.server_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid server_url: {}", e)))?;

    if config.subject.is_empty() || config.subject.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "subject must be non-empty and contain no whitespace, got '{}'",
            config.subject
        )));
    }

    if config.stream.is_empty()
        || !config
            .stream
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "stream must be non-empty and contain only letters, digits, '-' or '_', got '{}'",
            config.stream
        )));
    }

    if config.reconnect_attempts < 1 {
        return Err(ConfigError::Validation(
            "reconnect_attempts must be >= 1".to_string(),
        ));
    }

    if config.confirm_batch < 1 {
        return Err(ConfigError::Validation(
            "confirm_batch must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the catalog source
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if !config.codes.is_empty() {
        if let Some(code) = config.codes.iter().find(|c| !is_country_code(c)) {
            return Err(ConfigError::Validation(format!(
                "catalog code '{}' must be 1-3 ASCII letters or digits",
                code
            )));
        }
        return Ok(());
    }

    match &config.page_url {
        Some(page_url) => validate_http_url("page_url", page_url),
        None => Err(ConfigError::Validation(
            "catalog needs either inline codes or a page_url".to_string(),
        )),
    }
}

/// Validates the refinement order
fn validate_planner_config(config: &PlannerConfig) -> Result<(), ConfigError> {
    if config.refinement_order.is_empty() {
        return Err(ConfigError::Validation(
            "refinement_order cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for dimension in &config.refinement_order {
        if !seen.insert(dimension) {
            return Err(ConfigError::Validation(format!(
                "refinement_order lists '{}' more than once",
                dimension
            )));
        }
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    Ok(())
}

fn is_country_code(code: &str) -> bool {
    (1..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterDimension;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }

    #[test]
    fn test_catalog_requires_a_source() {
        let empty = CatalogConfig::default();
        assert!(validate_catalog_config(&empty).is_err());

        let scraped = CatalogConfig {
            codes: vec![],
            page_url: Some("https://example.org/notices".to_string()),
        };
        assert!(validate_catalog_config(&scraped).is_ok());

        let inline = CatalogConfig {
            codes: vec!["FR".to_string(), "922".to_string()],
            page_url: None,
        };
        assert!(validate_catalog_config(&inline).is_ok());

        let bad = CatalogConfig {
            codes: vec!["FRANCE".to_string()],
            page_url: None,
        };
        assert!(validate_catalog_config(&bad).is_err());
    }

    #[test]
    fn test_refinement_order_rejects_duplicates() {
        let order = PlannerConfig {
            refinement_order: vec![FilterDimension::Sex, FilterDimension::Sex],
        };
        assert!(validate_planner_config(&order).is_err());

        let empty = PlannerConfig {
            refinement_order: vec![],
        };
        assert!(validate_planner_config(&empty).is_err());

        assert!(validate_planner_config(&PlannerConfig::default()).is_ok());
    }

    #[test]
    fn test_retry_budgets_bounded() {
        let config = RetryConfig {
            probe_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(validate_retry_config(&config).is_err());

        let config = RetryConfig {
            leaf_attempts: 11,
            ..RetryConfig::default()
        };
        assert!(validate_retry_config(&config).is_err());
    }

    #[test]
    fn test_confirm_batch_must_be_positive() {
        let config = PublisherConfig {
            server_url: "nats://localhost:4222".to_string(),
            subject: "notices.red".to_string(),
            stream: "NOTICES".to_string(),
            reconnect_attempts: 5,
            reconnect_interval_ms: 5000,
            confirm_batch: 0,
        };
        assert!(validate_publisher_config(&config).is_err());

        let config = PublisherConfig {
            confirm_batch: 1,
            ..config
        };
        assert!(validate_publisher_config(&config).is_ok());
    }

    #[test]
    fn test_http_url_validation() {
        assert!(validate_http_url("base_url", "https://example.org/api").is_ok());
        assert!(validate_http_url("base_url", "ftp://example.org/api").is_err());
        assert!(validate_http_url("base_url", "not a url").is_err());
    }
}
