//! Application entities and the persisted snapshot.
//!
//! Field names serialize in camelCase so snapshots and export files keep the
//! layout written by earlier GrantBloom releases.

mod demo;

pub use demo::demo_grants;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a past grant application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// Funded
    Won,
    /// Declined
    Lost,
    /// Decision not known yet
    Pending,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Won => write!(f, "WON"),
            Outcome::Lost => write!(f, "LOST"),
            Outcome::Pending => write!(f, "PENDING"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WON" => Ok(Outcome::Won),
            "LOST" => Ok(Outcome::Lost),
            "PENDING" => Ok(Outcome::Pending),
            _ => Err(format!("Unknown outcome: {}", s)),
        }
    }
}

/// Program location a grant targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantLocation {
    /// TOSA Salt Lake City
    #[serde(rename = "TOSA SLC")]
    TosaSlc,
    /// TOSV Salt Lake City
    #[serde(rename = "TOSV SLC")]
    TosvSlc,
    /// TOSA Denver
    #[serde(rename = "TOSA Denver")]
    TosaDenver,
}

impl GrantLocation {
    /// Every location, in display order.
    pub const ALL: [GrantLocation; 3] = [
        GrantLocation::TosaSlc,
        GrantLocation::TosvSlc,
        GrantLocation::TosaDenver,
    ];

    /// Label used in prompts and exports.
    pub fn label(&self) -> &'static str {
        match self {
            GrantLocation::TosaSlc => "TOSA SLC",
            GrantLocation::TosvSlc => "TOSV SLC",
            GrantLocation::TosaDenver => "TOSA Denver",
        }
    }
}

impl std::fmt::Display for GrantLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for GrantLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        GrantLocation::ALL
            .into_iter()
            .find(|loc| loc.label().to_lowercase() == normalized)
            .ok_or_else(|| format!("Unknown location: {}", s))
    }
}

/// One past grant application plus its outcome and funding facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
    /// UUID v4
    pub id: String,
    /// Display title
    pub title: String,
    /// Full application text
    pub content: String,
    /// Funding decision
    pub outcome: Outcome,
    /// Funder name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Amount asked for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_requested: Option<f64>,
    /// Amount received; 0 for grants that were not won
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_awarded: Option<f64>,
    /// Targeted locations, no duplicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<GrantLocation>>,
}

impl GrantRecord {
    /// Awarded amount, treated as zero unless the grant was won.
    pub fn effective_award(&self) -> f64 {
        match self.outcome {
            Outcome::Won => self.amount_awarded.unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// User input for a new grant record.
#[derive(Debug, Clone, Default)]
pub struct NewGrant {
    /// Display title
    pub title: String,
    /// Application text
    pub content: String,
    /// `None` means WON
    pub outcome: Option<Outcome>,
    /// Funder name; blank is dropped
    pub organization: Option<String>,
    /// Amount asked for
    pub amount_requested: Option<f64>,
    /// Amount received
    pub amount_awarded: Option<f64>,
    /// Targeted locations
    pub locations: Vec<GrantLocation>,
}

impl NewGrant {
    /// Start a new grant with title and content; outcome defaults to WON.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Set the outcome.
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set the funding organization.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set requested and awarded amounts.
    pub fn with_amounts(mut self, requested: Option<f64>, awarded: Option<f64>) -> Self {
        self.amount_requested = requested;
        self.amount_awarded = awarded;
        self
    }

    /// Add a location; duplicates are ignored.
    pub fn with_location(mut self, location: GrantLocation) -> Self {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
        self
    }

    /// Build the record, assigning a fresh id and zeroing the award of
    /// grants that were not won.
    pub fn into_record(self) -> GrantRecord {
        let outcome = self.outcome.unwrap_or(Outcome::Won);
        let amount_awarded = match outcome {
            Outcome::Won => Some(self.amount_awarded.unwrap_or(0.0)),
            _ => Some(0.0),
        };
        let mut locations = Vec::new();
        for loc in self.locations {
            if !locations.contains(&loc) {
                locations.push(loc);
            }
        }

        GrantRecord {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            content: self.content,
            outcome,
            organization: self.organization.filter(|o| !o.trim().is_empty()),
            amount_requested: self.amount_requested,
            amount_awarded,
            locations: if locations.is_empty() {
                None
            } else {
                Some(locations)
            },
        }
    }
}

/// Kind of knowledge base entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeKind {
    /// External URL, referenced by address only
    Link,
    /// Pasted text
    Text,
    /// Text extracted from an uploaded document
    File,
}

/// A reference source usable as generation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    /// UUID v4
    pub id: String,
    /// Entry kind, serialized as `type`
    #[serde(rename = "type")]
    pub kind: KnowledgeKind,
    /// Display title
    pub title: String,
    /// URL for links, extracted text otherwise.
    pub content: String,
    /// When the entry was added
    pub date_added: DateTime<Utc>,
}

impl KnowledgeItem {
    /// Create an external link entry.
    pub fn link(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(KnowledgeKind::Link, title, url)
    }

    /// Create an entry holding extracted document text.
    pub fn file(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(KnowledgeKind::File, title, text)
    }

    /// Create an entry holding pasted text.
    pub fn text(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(KnowledgeKind::Text, title, text)
    }

    fn new(kind: KnowledgeKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            content: content.into(),
            date_added: Utc::now(),
        }
    }

    /// Whether this entry is an external link.
    pub fn is_link(&self) -> bool {
        self.kind == KnowledgeKind::Link
    }
}

/// Sentiment a theme carries in the analyzed applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    /// Associated with wins
    Positive,
    /// Associated with losses
    Negative,
    /// No clear direction
    Neutral,
}

/// A recurring theme found across applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    /// Short theme name
    pub name: String,
    /// What the theme covers
    pub description: String,
    /// Direction of its effect
    pub sentiment: Sentiment,
    /// 1-10 scale of how much the theme contributed to the outcome.
    pub impact_score: f64,
    /// How often it appears; never negative.
    pub frequency: f64,
}

/// Success rate associated with a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSuccessRate {
    /// Theme name
    pub theme: String,
    /// 0.0-1.0
    pub rate: f64,
}

/// Structured comparison of winning vs. losing applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparativeAnalysis {
    /// Non-empty overview
    pub executive_summary: String,
    /// Traits of winning applications
    pub winning_strengths: Vec<String>,
    /// Traits of losing applications
    pub losing_weaknesses: Vec<String>,
    /// Recurring themes
    pub key_themes: Vec<Theme>,
    /// Recommendations for future applications
    pub actionable_advice: Vec<String>,
    /// Per-theme success rates
    pub success_rate_by_theme: Vec<ThemeSuccessRate>,
}

impl ComparativeAnalysis {
    /// Check the value ranges the response schema cannot express.
    pub fn check_ranges(&self) -> Result<(), String> {
        if self.executive_summary.trim().is_empty() {
            return Err("executiveSummary is empty".to_string());
        }
        for theme in &self.key_themes {
            if !(1.0..=10.0).contains(&theme.impact_score) {
                return Err(format!(
                    "impactScore {} for theme '{}' is outside 1-10",
                    theme.impact_score, theme.name
                ));
            }
            if !(theme.frequency >= 0.0) {
                return Err(format!(
                    "frequency {} for theme '{}' is negative",
                    theme.frequency, theme.name
                ));
            }
        }
        for entry in &self.success_rate_by_theme {
            if !(0.0..=1.0).contains(&entry.rate) {
                return Err(format!(
                    "rate {} for theme '{}' is outside 0.0-1.0",
                    entry.rate, entry.theme
                ));
            }
        }
        Ok(())
    }
}

/// Feedback applied to a draft, kept for one level of undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// UUID v4
    pub id: String,
    /// Instruction the user gave
    pub text: String,
    /// When the refinement was applied
    pub timestamp: DateTime<Utc>,
    /// Draft right before the refinement; restored by undo
    pub original_draft: String,
}

impl FeedbackEntry {
    /// Record feedback applied on top of `original_draft`.
    pub fn new(text: impl Into<String>, original_draft: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            timestamp: Utc::now(),
            original_draft: original_draft.into(),
        }
    }
}

/// One application question plus its drafted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    /// UUID v4
    pub id: String,
    /// Application question
    pub question: String,
    /// Current answer; empty until generated
    pub draft: String,
    /// Most recent refinement, if any
    #[serde(default)]
    pub last_feedback: Option<FeedbackEntry>,
    /// Set while the first draft is being generated
    #[serde(default)]
    pub is_generating: bool,
}

impl DraftSection {
    /// New section awaiting its first draft.
    pub fn pending(question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            draft: String::new(),
            last_feedback: None,
            is_generating: true,
        }
    }
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The person asking
    User,
    /// The assistant
    Model,
}

/// One turn of a dataset chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// User turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Model turn.
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// The complete persisted application state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSnapshot {
    /// Past applications
    pub grants: Vec<GrantRecord>,
    /// Latest comparative analysis
    pub analysis: Option<ComparativeAnalysis>,
    /// Guidelines for the application being drafted
    pub apply_context: String,
    /// Drafted questions, in insertion order
    pub apply_sections: Vec<DraftSection>,
    /// Knowledge base entries
    pub context_items: Vec<KnowledgeItem>,
}

/// Export file: the snapshot plus the time it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Exported state, flattened into the top-level object
    #[serde(flatten)]
    pub snapshot: AppSnapshot,
    /// Time of export
    pub export_date: DateTime<Utc>,
}

impl ExportDocument {
    /// Stamp `snapshot` with the current time.
    pub fn new(snapshot: AppSnapshot) -> Self {
        Self {
            snapshot,
            export_date: Utc::now(),
        }
    }

    /// Download name, e.g. `grantbloom-backup-2026-10-17.json`.
    pub fn file_name(&self) -> String {
        format!(
            "grantbloom-backup-{}.json",
            self.export_date.format("%Y-%m-%d")
        )
    }
}
