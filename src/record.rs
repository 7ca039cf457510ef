//! Block payload records
//!
//! Records are meant to be principally transactions, but what goes into a
//! record and when it is considered valid is only encoded in consensus
//! behavior. The economic validity of a transaction is the wallet's concern
//! and reaches this crate as an opaque boolean predicate.

use serde::{Deserialize, Serialize};

/// An account participating in a holdings change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Account {
    Numbered(u64),
    Named(String),
}

/// A change to an entity's holdings. The transaction id assists in auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountChange {
    pub transaction_id: u64,
    pub entity: Account,
    pub quantity: i64,
}

/// A transfer of holdings from one account to one or more others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: AccountChange,
    pub to: Vec<AccountChange>,
}

/// A single entry in a block's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", content = "value")]
pub enum Record {
    Opaque(String),
    Transaction(Transaction),
}

impl Account {
    /// Canonical, injective encoding used inside block serialization.
    pub fn canonical(&self) -> String {
        match self {
            Account::Numbered(n) => format!("n{}", n),
            Account::Named(s) => format!("s{}:{}", s.len(), s),
        }
    }
}

impl AccountChange {
    pub fn canonical(&self) -> String {
        format!(
            "ac({},{},{})",
            self.transaction_id,
            self.entity.canonical(),
            self.quantity
        )
    }
}

impl Transaction {
    pub fn canonical(&self) -> String {
        let to: Vec<String> = self.to.iter().map(AccountChange::canonical).collect();
        format!("tx({};{})", self.from.canonical(), to.join(","))
    }
}

impl Record {
    /// Canonical, injective encoding used inside block serialization.
    ///
    /// Opaque strings are length-prefixed so record boundaries cannot be
    /// forged by embedding separators in the payload.
    pub fn canonical(&self) -> String {
        match self {
            Record::Opaque(s) => format!("o{}:{}", s.len(), s),
            Record::Transaction(tx) => tx.canonical(),
        }
    }
}

/// External record-validity predicate, consulted once per record during
/// block validation.
pub trait RecordValidator: Send + Sync {
    fn is_valid_record(&self, record: &Record) -> bool;
}

/// Default validator.
///
/// Opaque strings are accepted except for the literal `dummy-data`, which is
/// reserved so tests can manufacture an invalid record. Transactions are
/// accepted structurally; their economic validity belongs to the wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRecordValidator;

impl RecordValidator for StandardRecordValidator {
    fn is_valid_record(&self, record: &Record) -> bool {
        match record {
            Record::Opaque(s) => s != "dummy-data",
            Record::Transaction(tx) => !tx.to.is_empty(),
        }
    }
}
