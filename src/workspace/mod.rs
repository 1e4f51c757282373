//! The application state manager.
//!
//! [`Workspace`] is the single writer of every entity. Mutations run under a
//! write lock that is never held across an AI call, so other operations (and
//! other in-flight generations) proceed while a model request is pending.
//! Every successful mutation is followed by a best-effort snapshot flush.


use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{AppResult, ImportError, StateError, StateResult};
use crate::extract::extract_file;
use crate::gemini::{AiGateway, ChatSession};
use crate::model::{
    demo_grants, AppSnapshot, ComparativeAnalysis, DraftSection, ExportDocument, FeedbackEntry,
    GrantRecord, KnowledgeItem, NewGrant,
};
use crate::prompts::{analysis_prompt, chat_system_instruction, draft_prompt, refine_prompt};
use crate::storage::SnapshotStore;

/// Minimum number of grants a comparative analysis needs.
pub const MIN_GRANTS_FOR_ANALYSIS: usize = 2;

/// Draft text stored when generation fails.
pub const DRAFT_ERROR_SENTINEL: &str = "Error generating draft.";

struct WorkspaceState {
    snapshot: AppSnapshot,
    /// Bumped whenever the grant collection changes.
    grants_revision: u64,
    /// Bumped whenever grants or knowledge items change.
    dataset_revision: u64,
}

impl WorkspaceState {
    fn new(snapshot: AppSnapshot) -> Self {
        Self {
            snapshot,
            grants_revision: 0,
            dataset_revision: 0,
        }
    }

    /// Record a change to the grant collection; drops the analysis.
    fn grants_changed(&mut self) {
        self.snapshot.analysis = None;
        self.grants_revision += 1;
        self.dataset_revision += 1;
    }

    fn knowledge_changed(&mut self) {
        self.dataset_revision += 1;
    }

    fn section_mut(&mut self, id: &str) -> StateResult<&mut DraftSection> {
        self.snapshot
            .apply_sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StateError::SectionNotFound {
                section_id: id.to_string(),
            })
    }

    fn section(&self, id: &str) -> StateResult<&DraftSection> {
        self.snapshot
            .apply_sections
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StateError::SectionNotFound {
                section_id: id.to_string(),
            })
    }
}

/// Owns the application snapshot and applies user actions and AI results.
pub struct Workspace {
    state: RwLock<WorkspaceState>,
    store: Arc<dyn SnapshotStore>,
    gateway: AiGateway,
    flush_lock: Mutex<()>,
}

impl Workspace {
    /// Load the stored snapshot, falling back to an empty state.
    ///
    /// A missing or unreadable snapshot is not an error: the workspace starts
    /// empty and keeps working in memory.
    pub async fn open(store: Arc<dyn SnapshotStore>, gateway: AiGateway) -> Self {
        let snapshot = match store.load().await {
            Ok(Some(snapshot)) => {
                info!(
                    grants = snapshot.grants.len(),
                    sections = snapshot.apply_sections.len(),
                    knowledge_items = snapshot.context_items.len(),
                    "Loaded saved workspace"
                );
                snapshot
            }
            Ok(None) => {
                debug!("No saved workspace, starting empty");
                AppSnapshot::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load saved workspace, starting empty");
                AppSnapshot::default()
            }
        };

        Self::with_snapshot(snapshot, store, gateway)
    }

    /// Start from an explicit snapshot.
    pub fn with_snapshot(
        mut snapshot: AppSnapshot,
        store: Arc<dyn SnapshotStore>,
        gateway: AiGateway,
    ) -> Self {
        release_stuck_sections(&mut snapshot);
        Self {
            state: RwLock::new(WorkspaceState::new(snapshot)),
            store,
            gateway,
            flush_lock: Mutex::new(()),
        }
    }

    // Reads

    /// Copy of the full state.
    pub async fn snapshot(&self) -> AppSnapshot {
        self.state.read().await.snapshot.clone()
    }

    pub async fn grants(&self) -> Vec<GrantRecord> {
        self.state.read().await.snapshot.grants.clone()
    }

    pub async fn analysis(&self) -> Option<ComparativeAnalysis> {
        self.state.read().await.snapshot.analysis.clone()
    }

    pub async fn knowledge_items(&self) -> Vec<KnowledgeItem> {
        self.state.read().await.snapshot.context_items.clone()
    }

    pub async fn apply_context(&self) -> String {
        self.state.read().await.snapshot.apply_context.clone()
    }

    pub async fn sections(&self) -> Vec<DraftSection> {
        self.state.read().await.snapshot.apply_sections.clone()
    }

    pub async fn section(&self, id: &str) -> StateResult<DraftSection> {
        self.state.read().await.section(id).cloned()
    }

    // Grants

    /// Add a grant record built from user input.
    pub async fn add_grant(&self, grant: NewGrant) -> StateResult<GrantRecord> {
        require_text("title", &grant.title)?;
        require_text("content", &grant.content)?;
        if grant.amount_requested.is_some_and(|a| a < 0.0)
            || grant.amount_awarded.is_some_and(|a| a < 0.0)
        {
            return Err(StateError::Validation {
                field: "amount".to_string(),
                reason: "Amounts cannot be negative".to_string(),
            });
        }

        let record = grant.into_record();
        let added = record.clone();
        self.mutate(move |state| {
            state.snapshot.grants.push(record);
            state.grants_changed();
            Ok(())
        })
        .await?;

        info!(grant_id = %added.id, title = %added.title, outcome = %added.outcome, "Grant added");
        Ok(added)
    }

    /// Add a grant whose content is extracted from a document.
    ///
    /// An empty title in `grant` is replaced by the file name stem.
    pub async fn add_grant_from_file(
        &self,
        path: impl AsRef<Path>,
        mut grant: NewGrant,
    ) -> AppResult<GrantRecord> {
        let document = extract_file(path).await?;
        grant.content = document.normalized_text();
        if grant.title.trim().is_empty() {
            grant.title = document.title_stem();
        }
        Ok(self.add_grant(grant).await?)
    }

    /// Remove a grant; the current analysis no longer applies.
    pub async fn remove_grant(&self, id: &str) -> StateResult<()> {
        self.mutate(|state| {
            let before = state.snapshot.grants.len();
            state.snapshot.grants.retain(|g| g.id != id);
            if state.snapshot.grants.len() == before {
                return Err(StateError::GrantNotFound {
                    grant_id: id.to_string(),
                });
            }
            state.grants_changed();
            Ok(())
        })
        .await?;

        info!(grant_id = %id, "Grant removed, analysis cleared");
        Ok(())
    }

    /// Replace the grant collection with the demo dataset.
    pub async fn load_demo_grants(&self) -> StateResult<usize> {
        let grants = demo_grants();
        let count = grants.len();
        self.mutate(move |state| {
            state.snapshot.grants = grants;
            state.grants_changed();
            Ok(())
        })
        .await?;
        Ok(count)
    }

    // Analysis

    /// Run the comparative analysis over every grant and store the result.
    ///
    /// Fails without calling the model when fewer than
    /// [`MIN_GRANTS_FOR_ANALYSIS`] grants exist. A result that arrives after
    /// the grant collection changed is returned but not stored.
    pub async fn analyze(&self) -> AppResult<ComparativeAnalysis> {
        let (grants, revision) = {
            let state = self.state.read().await;
            (state.snapshot.grants.clone(), state.grants_revision)
        };

        if grants.len() < MIN_GRANTS_FOR_ANALYSIS {
            return Err(StateError::NotEnoughGrants {
                required: MIN_GRANTS_FOR_ANALYSIS,
                actual: grants.len(),
            }
            .into());
        }

        info!(grants = grants.len(), "Starting comparative analysis");
        let analysis: ComparativeAnalysis = self
            .gateway
            .send_structured(&analysis_prompt(&grants))
            .await?;

        let stored = analysis.clone();
        let applied = self
            .mutate(move |state| {
                if state.grants_revision != revision {
                    return Ok(false);
                }
                state.snapshot.analysis = Some(stored);
                Ok(true)
            })
            .await?;

        if !applied {
            warn!("Grant collection changed during analysis, result discarded");
        }
        Ok(analysis)
    }

    /// Replace the current analysis wholesale.
    pub async fn set_analysis(&self, analysis: ComparativeAnalysis) -> StateResult<()> {
        self.mutate(move |state| {
            state.snapshot.analysis = Some(analysis);
            Ok(())
        })
        .await
    }

    /// Drop the current analysis.
    pub async fn clear_analysis(&self) -> StateResult<()> {
        self.mutate(|state| {
            state.snapshot.analysis = None;
            Ok(())
        })
        .await
    }

    // Knowledge base

    pub async fn add_knowledge_item(&self, item: KnowledgeItem) -> StateResult<KnowledgeItem> {
        let added = item.clone();
        self.mutate(move |state| {
            state.snapshot.context_items.push(item);
            state.knowledge_changed();
            Ok(())
        })
        .await?;
        info!(item_id = %added.id, title = %added.title, kind = ?added.kind, "Knowledge item added");
        Ok(added)
    }

    /// Add an external reference link.
    pub async fn add_knowledge_link(&self, title: &str, url: &str) -> StateResult<KnowledgeItem> {
        require_text("title", title)?;
        require_text("url", url)?;
        self.add_knowledge_item(KnowledgeItem::link(title.trim(), url.trim()))
            .await
    }

    /// Add a document's text to the knowledge base, titled by its file name.
    pub async fn add_knowledge_file(&self, path: impl AsRef<Path>) -> AppResult<KnowledgeItem> {
        let document = extract_file(path).await?;
        let text = document.normalized_text();
        if text.is_empty() {
            return Err(StateError::Validation {
                field: "file".to_string(),
                reason: format!("No text could be extracted from {}", document.file_name),
            }
            .into());
        }
        Ok(self
            .add_knowledge_item(KnowledgeItem::file(document.file_name, text))
            .await?)
    }

    pub async fn remove_knowledge_item(&self, id: &str) -> StateResult<()> {
        self.mutate(|state| {
            let before = state.snapshot.context_items.len();
            state.snapshot.context_items.retain(|i| i.id != id);
            if state.snapshot.context_items.len() == before {
                return Err(StateError::KnowledgeItemNotFound {
                    item_id: id.to_string(),
                });
            }
            state.knowledge_changed();
            Ok(())
        })
        .await
    }

    // Application guidelines

    pub async fn set_apply_context(&self, text: impl Into<String>) -> StateResult<()> {
        let text = text.into();
        self.mutate(move |state| {
            state.snapshot.apply_context = text;
            Ok(())
        })
        .await
    }

    /// Append a document's raw text to the guidelines, separated by a blank line.
    pub async fn append_apply_context_file(&self, path: impl AsRef<Path>) -> AppResult<usize> {
        let document = extract_file(path).await?;
        if document.text.is_empty() {
            return Err(StateError::Validation {
                field: "file".to_string(),
                reason: format!("No text could be extracted from {}", document.file_name),
            }
            .into());
        }

        Ok(self
            .mutate(move |state| {
                let context = &mut state.snapshot.apply_context;
                if !context.is_empty() {
                    context.push_str("\n\n");
                }
                context.push_str(&document.text);
                Ok(context.len())
            })
            .await?)
    }

    // Draft sections

    /// Create a section in the generating state.
    pub async fn queue_draft_section(&self, question: &str) -> StateResult<DraftSection> {
        require_text("question", question)?;
        let section = DraftSection::pending(question.trim());
        let queued = section.clone();
        self.mutate(move |state| {
            if state.snapshot.apply_context.trim().is_empty() {
                warn!("Drafting without application guidelines");
            }
            state.snapshot.apply_sections.push(section);
            Ok(())
        })
        .await?;
        Ok(queued)
    }

    /// Generate the draft for a queued section.
    ///
    /// The section always leaves the generating state: on failure its draft
    /// becomes [`DRAFT_ERROR_SENTINEL`] and the error is returned.
    pub async fn generate_draft(&self, id: &str) -> AppResult<DraftSection> {
        let payload = {
            let state = self.state.read().await;
            let section = state.section(id)?;
            draft_prompt(
                &section.question,
                &state.snapshot.apply_context,
                state.snapshot.analysis.as_ref(),
                &state.snapshot.context_items,
            )
        };

        let result = self.gateway.send_text(&payload).await;

        let (draft, outcome) = match result {
            Ok(text) => (text, Ok(())),
            Err(e) => {
                warn!(section_id = %id, error = %e, "Draft generation failed");
                (DRAFT_ERROR_SENTINEL.to_string(), Err(e))
            }
        };

        let section = self
            .mutate(|state| {
                let section = state.section_mut(id)?;
                section.draft = draft;
                section.is_generating = false;
                Ok(section.clone())
            })
            .await?;

        outcome?;
        info!(section_id = %id, chars = section.draft.len(), "Draft generated");
        Ok(section)
    }

    /// Queue a section and generate its draft.
    pub async fn add_draft_section(&self, question: &str) -> AppResult<DraftSection> {
        let section = self.queue_draft_section(question).await?;
        self.generate_draft(&section.id).await
    }

    /// Overwrite a draft by hand; no undo entry is recorded.
    pub async fn edit_draft_section(&self, id: &str, text: impl Into<String>) -> StateResult<()> {
        let text = text.into();
        self.mutate(move |state| {
            state.section_mut(id)?.draft = text;
            Ok(())
        })
        .await
    }

    /// Rewrite a draft according to feedback.
    ///
    /// On success the prior draft is kept in a new feedback entry for undo.
    /// On failure the section is left untouched. Concurrent refinements of the
    /// same section resolve last-writer-wins.
    pub async fn refine_draft_section(&self, id: &str, feedback: &str) -> AppResult<DraftSection> {
        require_text("feedback", feedback)?;

        let payload = {
            let state = self.state.read().await;
            let section = state.section(id)?;
            if section.is_generating {
                return Err(StateError::Validation {
                    field: "section".to_string(),
                    reason: "Draft is still being generated".to_string(),
                }
                .into());
            }
            refine_prompt(&section.question, &section.draft, feedback)
        };

        let new_draft = self.gateway.send_text(&payload).await.map_err(|e| {
            warn!(section_id = %id, error = %e, "Draft refinement failed");
            e
        })?;

        let section = self
            .mutate(|state| {
                let section = state.section_mut(id)?;
                let previous = std::mem::replace(&mut section.draft, new_draft);
                section.last_feedback = Some(FeedbackEntry::new(feedback, previous));
                Ok(section.clone())
            })
            .await?;

        info!(section_id = %id, "Draft refined");
        Ok(section)
    }

    /// Restore the draft from before the last refinement.
    ///
    /// Returns `false` when there is nothing to undo.
    pub async fn undo_last_feedback(&self, id: &str) -> StateResult<bool> {
        let restored = {
            let mut state = self.state.write().await;
            let section = state.section_mut(id)?;
            match section.last_feedback.take() {
                Some(feedback) => {
                    section.draft = feedback.original_draft;
                    true
                }
                None => false,
            }
        };

        if restored {
            self.flush().await;
        }
        Ok(restored)
    }

    pub async fn remove_draft_section(&self, id: &str) -> StateResult<()> {
        self.mutate(|state| {
            let before = state.snapshot.apply_sections.len();
            state.snapshot.apply_sections.retain(|s| s.id != id);
            if state.snapshot.apply_sections.len() == before {
                return Err(StateError::SectionNotFound {
                    section_id: id.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    // Chat

    /// Open a chat bound to the current grants and knowledge base.
    pub async fn chat_session(&self) -> StateResult<ChatSession> {
        let state = self.state.read().await;
        if state.snapshot.grants.is_empty() {
            return Err(StateError::NoGrants);
        }
        let instruction =
            chat_system_instruction(&state.snapshot.grants, &state.snapshot.context_items);
        Ok(self
            .gateway
            .chat(instruction)
            .bound_to_revision(state.dataset_revision))
    }

    /// Whether `session` still reflects the current grants and knowledge base.
    pub async fn is_chat_session_current(&self, session: &ChatSession) -> bool {
        self.state.read().await.dataset_revision == session.dataset_revision()
    }

    // Export / import

    /// Current state stamped with the export time.
    pub async fn export_document(&self) -> ExportDocument {
        ExportDocument::new(self.snapshot().await)
    }

    /// Validate an export file without touching the workspace.
    pub fn parse_import(bytes: &[u8]) -> Result<AppSnapshot, ImportError> {
        let mut value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ImportError::InvalidFormat {
                message: e.to_string(),
            })?;

        let object = value
            .as_object_mut()
            .ok_or_else(|| ImportError::InvalidFormat {
                message: "expected a JSON object".to_string(),
            })?;

        if !object.get("grants").is_some_and(|g| g.is_array()) {
            return Err(ImportError::InvalidFormat {
                message: "missing grants".to_string(),
            });
        }

        // Null top-level fields mean "empty", same as absent ones.
        object.retain(|_, v| !v.is_null());

        serde_json::from_value(value).map_err(|e| ImportError::InvalidFormat {
            message: e.to_string(),
        })
    }

    /// Replace every top-level field with the imported snapshot.
    pub async fn apply_import(&self, mut snapshot: AppSnapshot) -> StateResult<()> {
        release_stuck_sections(&mut snapshot);
        let grants = snapshot.grants.len();
        self.mutate(move |state| {
            state.snapshot = snapshot;
            state.grants_revision += 1;
            state.dataset_revision += 1;
            Ok(())
        })
        .await?;
        info!(grants, "Workspace replaced from import");
        Ok(())
    }

    /// Parse and apply an export file; on error the state is unchanged.
    pub async fn import_snapshot(&self, bytes: &[u8]) -> AppResult<()> {
        let snapshot = Self::parse_import(bytes)?;
        Ok(self.apply_import(snapshot).await?)
    }

    // Internals

    /// Apply a mutation atomically, then flush on success.
    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut WorkspaceState) -> StateResult<T>,
    ) -> StateResult<T> {
        let result = {
            let mut state = self.state.write().await;
            apply(&mut state)?
        };
        self.flush().await;
        Ok(result)
    }

    /// Save the current snapshot; failures are logged, never returned.
    ///
    /// Flushes are serialized and each one reads the state after taking the
    /// flush lock, so an older snapshot never overwrites a newer one.
    async fn flush(&self) {
        let _guard = self.flush_lock.lock().await;
        let snapshot = self.state.read().await.snapshot.clone();
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(error = %e, "Failed to save workspace; continuing in memory");
        }
    }
}

/// Clear generating flags left behind by an interrupted run.
fn release_stuck_sections(snapshot: &mut AppSnapshot) {
    for section in snapshot.apply_sections.iter_mut().filter(|s| s.is_generating) {
        section.is_generating = false;
        if section.draft.is_empty() {
            section.draft = DRAFT_ERROR_SENTINEL.to_string();
        }
        debug!(section_id = %section.id, "Released section stuck in generating state");
    }
}

fn require_text(field: &str, value: &str) -> StateResult<()> {
    if value.trim().is_empty() {
        return Err(StateError::Validation {
            field: field.to_string(),
            reason: format!("{} cannot be empty", field),
        });
    }
    Ok(())
}
