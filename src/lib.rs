//! Banking Assistant
//!
//! A conversational banking assistant that:
//! - Classifies free-text messages into balance, loan, general or fallback intents
//! - Holds balance and loan retrievals behind a per-user 4-digit access code
//! - Delegates general questions to a generative model
//! - Reports store and generation failures as distinct reply kinds
//!
//! MESSAGE FLOW:
//! TRANSPORT → COMMANDS → DISPATCHER → (GATE → STORE | PROMPT → GENERATOR) → REPLY

pub mod api;
pub mod audit;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod gemini;
pub mod models;
pub mod prompts;
pub mod store;
pub mod transport;

pub use error::Result;

// Re-export common types
pub use classifier::IntentClassifier;
pub use commands::CommandRouter;
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use gate::{GateOutcome, PendingActions, PinGate};
pub use models::*;
