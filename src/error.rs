use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdctlError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Graph API error: {0}")]
    GraphApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Interactive prompt error: {0}")]
    DialoguerError(#[from] dialoguer::Error),

    #[error("Invalid locale phrase pattern: {0}")]
    LocalePattern(#[from] regex::Error),

    #[error("Host list error: {0}")]
    HostList(String),

    #[error("Token not found. Please run 'adctl login' first")]
    TokenNotFound,

    #[error("Tenant '{0}' not found")]
    TenantNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AdctlError>;

/// Parse Graph API error response and provide helpful context
pub fn enhance_graph_error(error_response: &str) -> String {
    if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(error_response) {
        if let Some(error_obj) = error_json.get("error") {
            let code = error_obj
                .get("code")
                .and_then(|c| c.as_str())
                .unwrap_or("Unknown");
            let message = error_obj
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("No message");

            let hint = match code {
                "InvalidAuthenticationToken" => {
                    "\nHint: Token expired or malformed. Run 'adctl login' again."
                }
                "Authorization_RequestDenied" => {
                    "\nHint: The app registration is missing a required Graph permission \
                     (admin consent may still be pending)."
                }
                "Request_ResourceNotFound" => {
                    "\nHint: The object no longer exists or the tenant ID is wrong."
                }
                _ => "",
            };

            return format!("{}: {}{}", code, message, hint);
        }
    }

    error_response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_graph_error_known_code() {
        let body =
            r#"{"error":{"code":"InvalidAuthenticationToken","message":"Access token is empty."}}"#;
        let enhanced = enhance_graph_error(body);
        assert!(enhanced.contains("InvalidAuthenticationToken"));
        assert!(enhanced.contains("adctl login"));
    }

    #[test]
    fn test_enhance_graph_error_passthrough() {
        assert_eq!(enhance_graph_error("plain text failure"), "plain text failure");
    }
}
