use super::ProviderResponse;
use crate::errors::ExtractionError;

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, response: &ProviderResponse) -> Result<String, ExtractionError>;
}

/// Plain text for the client: the extracted text, or the raw response
/// serialized as JSON when extraction fails.
pub fn normalize_output(extractor: &dyn TextExtractor, response: &ProviderResponse) -> String {
    match extractor.extract_text(response) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Falling back to raw provider response: {}", e);
            serde_json::to_string(response.raw()).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Result<String, ExtractionError>);

    impl TextExtractor for Fixed {
        fn extract_text(&self, _response: &ProviderResponse) -> Result<String, ExtractionError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_extracted_text_wins() {
        let response = ProviderResponse(json!({"anything": true}));
        let output = normalize_output(&Fixed(Ok("hello".to_string())), &response);
        assert_eq!(output, "hello");
    }

    #[test]
    fn test_failure_serializes_raw_response() {
        let response = ProviderResponse(json!({"candidates": []}));
        let output = normalize_output(&Fixed(Err(ExtractionError::NoCandidates)), &response);
        assert_eq!(output, r#"{"candidates":[]}"#);
    }
}
