pub mod store;

pub use store::{DocumentStore, PLACEHOLDER, TableCounts};

use extract::{DescriptionError, DocumentDescription, Recipient, ShapeError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PersistError {
    /// Nothing was written.
    #[error(transparent)]
    Malformed(#[from] DescriptionError),
    /// Rows written before the offending field stay committed.
    #[error("document {document_id} stored partially: {source}")]
    UnsupportedShape {
        document_id: i64,
        #[source]
        source: ShapeError,
    },
    /// `document_id` is set when the Document row was written before the
    /// failing insert.
    #[error("database write failed: {source}")]
    Database {
        document_id: Option<i64>,
        #[source]
        source: rusqlite::Error,
    },
}

impl PersistError {
    /// Id of the document left behind by a partial write, if any.
    pub fn partial_document(&self) -> Option<i64> {
        match self {
            PersistError::UnsupportedShape { document_id, .. } => Some(*document_id),
            PersistError::Database { document_id, .. } => *document_id,
            PersistError::Malformed(_) => None,
        }
    }
}

/// Flatten one structuring response into the six document tables.
///
/// Rows are written in a fixed order (document, bank info, amount, related
/// parties with their addresses, recipients), each in its own commit.
/// Returns the id of the new document.
pub fn persist_response(
    store: &DocumentStore,
    json: &str,
    link_original: &str,
) -> Result<i64, PersistError> {
    let description = DocumentDescription::parse(json)?;

    let document_id = store
        .insert_document(&description.header(), link_original, json)
        .map_err(database_error(None))?;
    let written = || database_error(Some(document_id));

    let bank = description.bank_info();
    let bank_info_id = store.insert_bank_info(&bank, document_id).map_err(written())?;
    store.insert_amount(&bank.amount, bank_info_id).map_err(written())?;

    let parties = description
        .related_parties()
        .map_err(|source| PersistError::UnsupportedShape { document_id, source })?;
    for party in at_least_one(parties) {
        let related_info_id = store
            .insert_related_party(&party, document_id)
            .map_err(written())?;
        store.insert_address(&party.address, related_info_id).map_err(written())?;
    }

    let recipients = description
        .recipients()
        .map_err(|source| PersistError::UnsupportedShape { document_id, source })?;
    let recipient_rows: Vec<Recipient> = at_least_one(recipients);
    for recipient in &recipient_rows {
        store.insert_recipient(recipient, document_id).map_err(written())?;
    }

    debug!(document_id, recipients = recipient_rows.len(), "Document persisted");
    Ok(document_id)
}

fn database_error(document_id: Option<i64>) -> impl FnOnce(rusqlite::Error) -> PersistError {
    move |source| PersistError::Database { document_id, source }
}

/// An empty list still yields one fully defaulted row.
fn at_least_one<T: Default>(mut items: Vec<T>) -> Vec<T> {
    if items.is_empty() {
        items.push(T::default());
    }
    items
}
