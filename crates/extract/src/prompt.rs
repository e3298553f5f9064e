pub const SYSTEM_PROMPT: &str = r#"You read scanned letters, invoices and payment requests and describe them as JSON.

INSTRUCTIONS:
1. Output ONLY one JSON object, nothing else
2. Leave out any field you cannot find in the text
3. Use the exact schema below

SCHEMA:
{
  "title": "short title of the document",
  "summary": "one or two sentences",
  "reference_number": "invoice, customer or case number",
  "language": "language of the document",
  "timestamp": "date of the document",
  "bank_info": {
    "bank_name": "", "account_number": "", "account_holder": "", "transfer_deadline": "",
    "amount": {"currency": "", "value": ""}
  },
  "related_companies_or_people": [
    {"name": "", "company": "", "position": "",
     "contact_info": {"phone": "", "email": "",
                      "address": {"street": "", "city": "", "postal_code": "", "country": ""}}}
  ],
  "recipients": [{"name": "", "email": ""}]
}"#;

/// Character budget for the document text sent in one structuring call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBudget {
    pub max_chars: usize,
    /// Headroom kept free for the instructions.
    pub reserved: usize,
}

impl Default for TextBudget {
    fn default() -> Self {
        Self {
            max_chars: 8192,
            reserved: 50,
        }
    }
}

impl TextBudget {
    /// Longest prefix of `text` that fits the budget, cut on a char boundary.
    pub fn truncate<'a>(&self, text: &'a str) -> &'a str {
        let limit = self.max_chars.saturating_sub(self.reserved);
        match text.char_indices().nth(limit) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }
}
