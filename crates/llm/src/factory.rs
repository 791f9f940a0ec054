//! LLM provider factory.
//!
//! Builds an `LlmClient` from the provider name and connection settings
//! resolved by the application configuration.

use crate::client::LlmClient;
use crate::providers::ollama::{OllamaClient, DEFAULT_OLLAMA_URL};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout_secs` - Optional request timeout owned by the client
///
/// # Errors
/// Returns a message when the provider is unknown or the client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<Arc<dyn LlmClient>, String> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            let client = match timeout_secs {
                Some(secs) => OllamaClient::with_timeout(base_url, secs).map_err(|e| e.to_string())?,
                None => OllamaClient::with_base_url(base_url),
            };
            tracing::debug!("Created Ollama client for {}", base_url);
            Ok(Arc::new(client))
        }
        _ => Err(format!("Unknown provider: {}. Supported: ollama", provider)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint_and_timeout() {
        let client = create_client("Ollama", Some("http://localhost:8080"), Some(30));
        assert!(client.is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
