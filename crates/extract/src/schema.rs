//! Typed, lazily evaluated view over a structuring response.
//!
//! The response is an irregular JSON object: any field may be missing,
//! nested objects may be absent, and the party/recipient lists may be a
//! single object or an array. Scalar fields are exposed as `Option<String>`;
//! deciding how a missing value is stored is left to the persistence layer.
//!
//! Each section is read on demand so that a caller can write the parts it
//! has already read before a later section turns out to be malformed.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const RELATED_PARTIES_FIELD: &str = "related_companies_or_people";
pub const RECIPIENTS_FIELD: &str = "recipients";

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("structuring response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("structuring response must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

#[derive(Debug, Error, PartialEq)]
#[error("field `{field}` has unsupported shape: {found}")]
pub struct ShapeError {
    pub field: &'static str,
    pub found: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentHeader {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub reference_number: Option<String>,
    pub language: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Amount {
    pub currency: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BankInfo {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
    pub transfer_deadline: Option<String>,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelatedParty {
    pub name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recipient {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentDescription {
    fields: Map<String, Value>,
}

impl DocumentDescription {
    pub fn parse(json: &str) -> Result<Self, DescriptionError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DescriptionError::NotAnObject { found: kind(&other) }),
        }
    }

    pub fn header(&self) -> DocumentHeader {
        let fields = Some(&self.fields);
        DocumentHeader {
            title: text(fields, "title"),
            summary: text(fields, "summary"),
            reference_number: text(fields, "reference_number"),
            language: text(fields, "language"),
            timestamp: text(fields, "timestamp"),
        }
    }

    pub fn bank_info(&self) -> BankInfo {
        let bank = object(Some(&self.fields), "bank_info");
        let amount = object(bank, "amount");
        BankInfo {
            bank_name: text(bank, "bank_name"),
            account_number: text(bank, "account_number"),
            account_holder: text(bank, "account_holder"),
            transfer_deadline: text(bank, "transfer_deadline"),
            amount: Amount {
                currency: text(amount, "currency"),
                value: text(amount, "value"),
            },
        }
    }

    /// Related companies or people, in input order. Empty when the field is
    /// absent or empty.
    pub fn related_parties(&self) -> Result<Vec<RelatedParty>, ShapeError> {
        let entries = self.one_or_many(RELATED_PARTIES_FIELD)?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let entry = Some(entry);
                let contact = object(entry, "contact_info");
                let address = object(contact, "address");
                RelatedParty {
                    name: text(entry, "name"),
                    company: text(entry, "company"),
                    position: text(entry, "position"),
                    phone: text(contact, "phone"),
                    email: text(contact, "email"),
                    address: Address {
                        street: text(address, "street"),
                        city: text(address, "city"),
                        postal_code: text(address, "postal_code"),
                        country: text(address, "country"),
                    },
                }
            })
            .collect())
    }

    /// Recipients, in input order. Empty when the field is absent or empty.
    pub fn recipients(&self) -> Result<Vec<Recipient>, ShapeError> {
        let entries = self.one_or_many(RECIPIENTS_FIELD)?;
        Ok(entries
            .into_iter()
            .map(|entry| Recipient {
                name: text(Some(entry), "name"),
                email: text(Some(entry), "email"),
            })
            .collect())
    }

    /// Resolve a field that may be absent, one object, or a list of objects.
    /// The whole field is validated before anything is returned.
    fn one_or_many(&self, field: &'static str) -> Result<Vec<&Map<String, Value>>, ShapeError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
            Some(Value::Object(entry)) if entry.is_empty() => Ok(Vec::new()),
            Some(Value::Object(entry)) => Ok(vec![entry]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Object(entry) => Ok(entry),
                    other => Err(ShapeError { field, found: kind(other) }),
                })
                .collect(),
            Some(other) => Err(ShapeError { field, found: kind(other) }),
        }
    }
}

fn object<'a>(parent: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Map<String, Value>> {
    parent?.get(key)?.as_object()
}

fn text(parent: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    match parent?.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
