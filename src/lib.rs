//! # GrantBloom
//!
//! A grant-writing assistant. It keeps a workspace of past grant applications
//! with their outcomes, asks Gemini for a comparative analysis of what wins and
//! what loses, answers questions about the dataset, and drafts answers to new
//! application questions that apply those lessons.
//!
//! ## Architecture
//!
//! ```text
//! CLI → Workspace (state manager) → AiGateway → Gemini REST API
//!            ↓                          ↑
//!      SnapshotStore              Prompt Builder ← Context Aggregator
//!   (SQLite or memory)                                 ↑
//!                                              Document Extraction
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use grantbloom::{Config, Workspace};
//! use grantbloom::gemini::{AiGateway, GeminiClient};
//! use grantbloom::storage::SqliteSnapshotStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = SqliteSnapshotStore::new(&config.storage).await?;
//!     let client = GeminiClient::new(&config.gemini, &config.request)?;
//!     let workspace = Workspace::open(Arc::new(store), AiGateway::new(Arc::new(client))).await;
//!     workspace.load_demo_grants().await?;
//!     let analysis = workspace.analyze().await?;
//!     println!("{}", analysis.executive_summary);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command-line interface definitions and command execution.
pub mod cli;
/// Configuration management.
pub mod config;
/// Knowledge base aggregation into prompt context.
pub mod context;
/// Error types and result aliases for the application.
pub mod error;
/// Text extraction from PDF, DOCX and plain text files.
pub mod extract;
/// Gemini API client, structured responses and chat sessions.
pub mod gemini;
/// Domain entities and the persisted snapshot.
pub mod model;
/// Prompt templates and payload construction.
pub mod prompts;
/// Snapshot persistence backends.
pub mod storage;
/// Application state manager.
pub mod workspace;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use workspace::Workspace;
