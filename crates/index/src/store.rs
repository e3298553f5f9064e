use anyhow::{Context, Result};
use extract::{Address, Amount, BankInfo, DocumentHeader, Recipient, RelatedParty};
use rusqlite::{Connection, params};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Stored in place of any value the structuring response did not provide.
pub const PLACEHOLDER: &str = "not available";

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        reference_number TEXT NOT NULL,
        language TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        link_original TEXT NOT NULL,
        raw_json TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS bank_info (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bank_name TEXT NOT NULL,
        account_number TEXT NOT NULL,
        account_holder TEXT NOT NULL,
        transfer_deadline TEXT NOT NULL,
        document_id INTEGER NOT NULL REFERENCES documents(id)
    );

    CREATE TABLE IF NOT EXISTS amount (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        currency TEXT NOT NULL,
        value TEXT NOT NULL,
        bank_info_id INTEGER NOT NULL REFERENCES bank_info(id)
    );

    CREATE TABLE IF NOT EXISTS related_info (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        company TEXT NOT NULL,
        position TEXT NOT NULL,
        phone TEXT NOT NULL,
        email TEXT NOT NULL,
        document_id INTEGER NOT NULL REFERENCES documents(id)
    );

    CREATE TABLE IF NOT EXISTS address (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        street TEXT NOT NULL,
        city TEXT NOT NULL,
        postal_code TEXT NOT NULL,
        country TEXT NOT NULL,
        related_info_id INTEGER NOT NULL REFERENCES related_info(id)
    );

    CREATE TABLE IF NOT EXISTS recipients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        document_id INTEGER NOT NULL REFERENCES documents(id)
    );
"#;

/// Row count of every table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub documents: usize,
    pub bank_info: usize,
    pub amount: usize,
    pub related_info: usize,
    pub address: usize,
    pub recipients: usize,
}

/// SQLite store for structured documents.
///
/// Every insert is its own implicit transaction.
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create database directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .context(format!("Failed to open database: {:?}", path))?;
        info!(path = %path.display(), "Opened document database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create tables")?;
        debug!("Document schema ready");
        Ok(Self { conn })
    }

    pub fn insert_document(
        &self,
        header: &DocumentHeader,
        link_original: &str,
        raw_json: &str,
    ) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO documents (title, summary, reference_number, language, timestamp, link_original, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                or_placeholder(&header.title),
                or_placeholder(&header.summary),
                or_placeholder(&header.reference_number),
                or_placeholder(&header.language),
                or_placeholder(&header.timestamp),
                link_original,
                raw_json,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_bank_info(&self, bank: &BankInfo, document_id: i64) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO bank_info (bank_name, account_number, account_holder, transfer_deadline, document_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                or_placeholder(&bank.bank_name),
                or_placeholder(&bank.account_number),
                or_placeholder(&bank.account_holder),
                or_placeholder(&bank.transfer_deadline),
                document_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_amount(&self, amount: &Amount, bank_info_id: i64) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO amount (currency, value, bank_info_id) VALUES (?1, ?2, ?3)",
            params![
                or_placeholder(&amount.currency),
                or_placeholder(&amount.value),
                bank_info_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_related_party(
        &self,
        party: &RelatedParty,
        document_id: i64,
    ) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO related_info (name, company, position, phone, email, document_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                or_placeholder(&party.name),
                or_placeholder(&party.company),
                or_placeholder(&party.position),
                or_placeholder(&party.phone),
                or_placeholder(&party.email),
                document_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_address(&self, address: &Address, related_info_id: i64) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO address (street, city, postal_code, country, related_info_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                or_placeholder(&address.street),
                or_placeholder(&address.city),
                or_placeholder(&address.postal_code),
                or_placeholder(&address.country),
                related_info_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_recipient(&self, recipient: &Recipient, document_id: i64) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO recipients (name, email, document_id) VALUES (?1, ?2, ?3)",
            params![
                or_placeholder(&recipient.name),
                or_placeholder(&recipient.email),
                document_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn counts(&self) -> rusqlite::Result<TableCounts> {
        Ok(TableCounts {
            documents: self.count("documents")?,
            bank_info: self.count("bank_info")?,
            amount: self.count("amount")?,
            related_info: self.count("related_info")?,
            address: self.count("address")?,
            recipients: self.count("recipients")?,
        })
    }

    fn count(&self, table: &str) -> rusqlite::Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.conn.query_row(&sql, [], |row| row.get::<_, i64>(0)).map(|n| n as usize)
    }

    /// Read-only access for inspection queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")
    }
}

fn or_placeholder(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(PLACEHOLDER)
}
