pub mod llm;
pub mod prompt;
pub mod sanitize;
pub mod schema;

pub use llm::{ChatClient, Structurer};
pub use prompt::TextBudget;
pub use sanitize::sanitize_response;
pub use schema::{
    Address, Amount, BankInfo, DescriptionError, DocumentDescription, DocumentHeader, Recipient,
    RelatedParty, ShapeError,
};

use anyhow::{Context, Result};

/// Structure `text` and return the sanitized response, ready for parsing.
pub async fn structure_text(structurer: &dyn Structurer, text: &str) -> Result<String> {
    let raw = structurer
        .structure(text)
        .await
        .context("Structuring call failed")?;

    Ok(sanitize_response(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl Structurer for Canned {
        async fn structure(&self, _text: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Offline;

    #[async_trait]
    impl Structurer for Offline {
        async fn structure(&self, _text: &str) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_response_is_sanitized() {
        let json = structure_text(&Canned("{'title': 'Invoice', 'summary': None}"), "Invoice 123")
            .await
            .unwrap();
        let header = DocumentDescription::parse(&json).unwrap().header();
        assert_eq!(header.title.as_deref(), Some("Invoice"));
        assert_eq!(header.summary, None);
    }

    #[tokio::test]
    async fn test_call_failure_propagates() {
        let err = structure_text(&Offline, "Invoice 123").await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
    }
}
