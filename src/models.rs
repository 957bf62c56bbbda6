//! Core data models for the banking assistant

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Identity =================
//

/// Stable, externally assigned user identifier (the Telegram user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    /// Absent means gated retrieval is disabled for this user.
    pub access_code: Option<String>,
}

/// True for exactly four ASCII digits.
pub fn is_access_code(text: &str) -> bool {
    text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit())
}

/// A message as delivered by a transport. `text` is absent for stickers,
/// photos and other content without interpretable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub user_id: UserId,
    /// Conversation the reply goes to. Equals the user id in private chats.
    pub chat_id: i64,
    pub display_name: String,
    pub text: Option<String>,
}

impl InboundMessage {
    /// A message from a private conversation with `user_id`.
    pub fn direct(user_id: UserId, display_name: impl Into<String>, text: Option<String>) -> Self {
        Self {
            user_id,
            chat_id: user_id.0,
            display_name: display_name.into(),
            text,
        }
    }
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    BalanceQuery,
    LoanQuery,
    GeneralInfo,
    Fallback,
}

impl Intent {
    /// The retrieval this intent must be gated behind, if any.
    pub fn sensitive_action(self) -> Option<SensitiveAction> {
        match self {
            Intent::BalanceQuery => Some(SensitiveAction::BalanceQuery),
            Intent::LoanQuery => Some(SensitiveAction::LoanQuery),
            Intent::GeneralInfo | Intent::Fallback => None,
        }
    }
}

/// Retrieval deferred until the access code is verified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveAction {
    BalanceQuery,
    LoanQuery,
}

impl fmt::Display for SensitiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensitiveAction::BalanceQuery => "balance_query",
            SensitiveAction::LoanQuery => "loan_query",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Records =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub account_name: String,
    pub description: String,
    pub amount: f64,
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub name: String,
    pub total: f64,
    pub paid: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

impl Loan {
    pub fn paid_amount(&self) -> f64 {
        self.paid.unwrap_or(0.0)
    }

    pub fn pending(&self) -> f64 {
        self.total - self.paid_amount()
    }
}

//
// ================= Generation =================
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Delivered(String),
    Blocked(String),
    Empty,
    Failed(String),
}

//
// ================= Replies =================
//

/// Which branch of the conversation produced a reply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    PromptForCode,
    Delivered,
    ConfigurationMissing,
    VerificationFailure,
    RetrievalFailure,
    StoreUnavailable,
    Generated,
    GenerationBlocked,
    GenerationEmpty,
    GenerationFailure,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub kind: ReplyKind,
    pub text: String,
}

impl OutboundReply {
    pub fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}
