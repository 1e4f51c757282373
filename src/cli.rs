//! Command-line surface.
//!
//! Every subcommand maps onto one [`Workspace`] operation and renders the
//! outcome as a [`CliResult`]. The binary only wires configuration, logging
//! and the workspace together.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::model::{
    ComparativeAnalysis, DraftSection, GrantLocation, GrantRecord, KnowledgeItem, NewGrant,
    Outcome,
};
use crate::workspace::Workspace;

/// Grant-writing assistant backed by the Gemini API.
#[derive(Parser, Debug)]
#[command(name = "grantbloom", version, about)]
pub struct Cli {
    /// Keep the workspace in memory only; nothing is written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage past grant applications
    Grant {
        /// Subcommand
        #[command(subcommand)]
        command: GrantCommands,
    },

    /// Run a comparative analysis over all grants
    Analyze,

    /// Inspect or discard the stored analysis
    Analysis {
        /// Subcommand
        #[command(subcommand)]
        command: AnalysisCommands,
    },

    /// Manage the knowledge base of links and documents
    Kb {
        /// Subcommand
        #[command(subcommand)]
        command: KbCommands,
    },

    /// Manage the application guidelines used for drafting
    Guidelines {
        /// Subcommand
        #[command(subcommand)]
        command: GuidelinesCommands,
    },

    /// Draft answers to application questions
    Draft {
        /// Subcommand
        #[command(subcommand)]
        command: DraftCommands,
    },

    /// Chat about the grant dataset (type `exit` to leave)
    Chat,

    /// Write a backup of the whole workspace
    Export {
        /// Output file, defaults to grantbloom-backup-<date>.json
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace the workspace with a backup file
    Import {
        /// Backup file produced by `export`
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Grant subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum GrantCommands {
    /// Add a grant from text or a document
    Add {
        /// Grant title, defaults to the file name when --file is given
        #[arg(long, default_value = "")]
        title: String,

        /// Application text
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,

        /// PDF, DOCX or text file holding the application
        #[arg(long)]
        file: Option<PathBuf>,

        /// Outcome: won, lost or pending
        #[arg(long, default_value = "won")]
        outcome: Outcome,

        /// Funding organization
        #[arg(long)]
        organization: Option<String>,

        /// Amount requested
        #[arg(long)]
        requested: Option<f64>,

        /// Amount awarded (ignored unless the grant was won)
        #[arg(long)]
        awarded: Option<f64>,

        /// Program location, repeatable: "TOSA SLC", "TOSV SLC", "TOSA Denver"
        #[arg(long = "location")]
        locations: Vec<GrantLocation>,
    },

    /// List grants
    List,

    /// Remove a grant by id
    Remove {
        /// Grant id
        id: String,
    },

    /// Replace all grants with the demo dataset
    Demo,
}

/// Analysis subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AnalysisCommands {
    /// Show the stored analysis
    Show,
    /// Discard the stored analysis
    Reset,
}

/// Knowledge base subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum KbCommands {
    /// Add a reference link
    AddLink {
        /// Link title
        title: String,
        /// Link URL
        url: String,
    },
    /// Add a document's text
    AddFile {
        /// PDF, DOCX or text file
        path: PathBuf,
    },
    /// List knowledge items
    List,
    /// Remove a knowledge item by id
    Remove {
        /// Item id
        id: String,
    },
}

/// Guidelines subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum GuidelinesCommands {
    /// Replace the guidelines text
    Set {
        /// New guidelines
        text: String,
    },
    /// Append a document's text to the guidelines
    AddFile {
        /// PDF, DOCX or text file
        path: PathBuf,
    },
    /// Print the guidelines
    Show,
}

/// Draft subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DraftCommands {
    /// Add a question and generate its draft
    Add {
        /// Application question
        question: String,
    },
    /// List draft sections
    List,
    /// Replace a draft by hand
    Edit {
        /// Section id
        id: String,
        /// New draft text
        text: String,
    },
    /// Rewrite a draft following feedback
    Refine {
        /// Section id
        id: String,
        /// Instructions for the rewrite
        feedback: String,
    },
    /// Restore the draft from before the last refinement
    Undo {
        /// Section id
        id: String,
    },
    /// Remove a draft section
    Remove {
        /// Section id
        id: String,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a command against the workspace.
///
/// `chat` and unconfirmed `import` read from stdin.
pub async fn execute_command(command: Commands, workspace: &Workspace) -> CliResult {
    match command {
        Commands::Grant { command } => execute_grant(command, workspace).await,
        Commands::Analyze => execute_analyze(workspace).await,
        Commands::Analysis { command } => execute_analysis(command, workspace).await,
        Commands::Kb { command } => execute_kb(command, workspace).await,
        Commands::Guidelines { command } => execute_guidelines(command, workspace).await,
        Commands::Draft { command } => execute_draft(command, workspace).await,
        Commands::Chat => {
            let input = BufReader::new(tokio::io::stdin());
            run_chat(workspace, input, tokio::io::stdout()).await
        }
        Commands::Export { out } => execute_export(workspace, out).await,
        Commands::Import { file, yes } => {
            let mut input = BufReader::new(tokio::io::stdin());
            let mut output = tokio::io::stdout();
            import_file(workspace, file, yes, &mut input, &mut output).await
        }
    }
}

async fn execute_grant(command: GrantCommands, workspace: &Workspace) -> CliResult {
    match command {
        GrantCommands::Add {
            title,
            content,
            file,
            outcome,
            organization,
            requested,
            awarded,
            locations,
        } => {
            let mut grant = NewGrant::new(title, content.unwrap_or_default())
                .with_outcome(outcome)
                .with_amounts(requested, awarded);
            if let Some(organization) = organization {
                grant = grant.with_organization(organization);
            }
            for location in locations {
                grant = grant.with_location(location);
            }

            let added = match file {
                Some(path) => workspace.add_grant_from_file(path, grant).await,
                None => workspace.add_grant(grant).await.map_err(Into::into),
            };
            match added {
                Ok(record) => CliResult::success(format!(
                    "Added grant {} ({}): {}",
                    record.id, record.outcome, record.title
                )),
                Err(e) => CliResult::error(format!("Failed to add grant: {}", e)),
            }
        }
        GrantCommands::List => {
            let grants = workspace.grants().await;
            if grants.is_empty() {
                return CliResult::success("No grants yet. Add one or run `grant demo`.");
            }
            let mut output = String::new();
            for grant in &grants {
                output.push_str(&format_grant(grant));
            }
            CliResult::success(output)
        }
        GrantCommands::Remove { id } => match workspace.remove_grant(&id).await {
            Ok(()) => CliResult::success(format!("Removed grant {}", id)),
            Err(e) => CliResult::error(e.to_string()),
        },
        GrantCommands::Demo => match workspace.load_demo_grants().await {
            Ok(count) => CliResult::success(format!("Loaded {} demo grants", count)),
            Err(e) => CliResult::error(e.to_string()),
        },
    }
}

async fn execute_analyze(workspace: &Workspace) -> CliResult {
    match workspace.analyze().await {
        Ok(analysis) => CliResult::success(format_analysis(&analysis)),
        Err(e) => CliResult::error(format!("Analysis failed: {}", e)),
    }
}

async fn execute_analysis(command: AnalysisCommands, workspace: &Workspace) -> CliResult {
    match command {
        AnalysisCommands::Show => match workspace.analysis().await {
            Some(analysis) => CliResult::success(format_analysis(&analysis)),
            None => CliResult::success("No analysis yet. Run `analyze`."),
        },
        AnalysisCommands::Reset => match workspace.clear_analysis().await {
            Ok(()) => CliResult::success("Analysis cleared"),
            Err(e) => CliResult::error(e.to_string()),
        },
    }
}

async fn execute_kb(command: KbCommands, workspace: &Workspace) -> CliResult {
    match command {
        KbCommands::AddLink { title, url } => {
            match workspace.add_knowledge_link(&title, &url).await {
                Ok(item) => CliResult::success(format!("Added link {}", item.id)),
                Err(e) => CliResult::error(e.to_string()),
            }
        }
        KbCommands::AddFile { path } => match workspace.add_knowledge_file(&path).await {
            Ok(item) => CliResult::success(format!(
                "Added document {} ({} chars)",
                item.id,
                item.content.chars().count()
            )),
            Err(e) => CliResult::error(format!("Failed to add {}: {}", path.display(), e)),
        },
        KbCommands::List => {
            let items = workspace.knowledge_items().await;
            if items.is_empty() {
                return CliResult::success("Knowledge base is empty");
            }
            let mut output = String::new();
            for item in &items {
                output.push_str(&format_knowledge_item(item));
            }
            CliResult::success(output)
        }
        KbCommands::Remove { id } => match workspace.remove_knowledge_item(&id).await {
            Ok(()) => CliResult::success(format!("Removed item {}", id)),
            Err(e) => CliResult::error(e.to_string()),
        },
    }
}

async fn execute_guidelines(command: GuidelinesCommands, workspace: &Workspace) -> CliResult {
    match command {
        GuidelinesCommands::Set { text } => match workspace.set_apply_context(text).await {
            Ok(()) => CliResult::success("Guidelines updated"),
            Err(e) => CliResult::error(e.to_string()),
        },
        GuidelinesCommands::AddFile { path } => {
            match workspace.append_apply_context_file(&path).await {
                Ok(len) => CliResult::success(format!("Guidelines now {} chars", len)),
                Err(e) => CliResult::error(format!("Failed to add {}: {}", path.display(), e)),
            }
        }
        GuidelinesCommands::Show => {
            let context = workspace.apply_context().await;
            if context.trim().is_empty() {
                CliResult::success("No guidelines set")
            } else {
                CliResult::success(context)
            }
        }
    }
}

async fn execute_draft(command: DraftCommands, workspace: &Workspace) -> CliResult {
    match command {
        DraftCommands::Add { question } => match workspace.add_draft_section(&question).await {
            Ok(section) => CliResult::success(format_section(&section)),
            Err(e) => CliResult::error(format!("Draft generation failed: {}", e)),
        },
        DraftCommands::List => {
            let sections = workspace.sections().await;
            if sections.is_empty() {
                return CliResult::success("No draft sections yet");
            }
            let output: Vec<String> = sections.iter().map(format_section).collect();
            CliResult::success(output.join("\n"))
        }
        DraftCommands::Edit { id, text } => match workspace.edit_draft_section(&id, text).await {
            Ok(()) => CliResult::success(format!("Updated section {}", id)),
            Err(e) => CliResult::error(e.to_string()),
        },
        DraftCommands::Refine { id, feedback } => {
            match workspace.refine_draft_section(&id, &feedback).await {
                Ok(section) => CliResult::success(format_section(&section)),
                Err(e) => CliResult::error(format!("Refinement failed: {}", e)),
            }
        }
        DraftCommands::Undo { id } => match workspace.undo_last_feedback(&id).await {
            Ok(true) => CliResult::success(format!("Restored previous draft of {}", id)),
            Ok(false) => CliResult::success(format!("Nothing to undo for {}", id)),
            Err(e) => CliResult::error(e.to_string()),
        },
        DraftCommands::Remove { id } => match workspace.remove_draft_section(&id).await {
            Ok(()) => CliResult::success(format!("Removed section {}", id)),
            Err(e) => CliResult::error(e.to_string()),
        },
    }
}

async fn execute_export(workspace: &Workspace, out: Option<PathBuf>) -> CliResult {
    let document = workspace.export_document().await;
    let path = out.unwrap_or_else(|| PathBuf::from(document.file_name()));

    let bytes = match serde_json::to_vec_pretty(&document) {
        Ok(bytes) => bytes,
        Err(e) => return CliResult::error(format!("Failed to encode backup: {}", e)),
    };
    match tokio::fs::write(&path, bytes).await {
        Ok(()) => CliResult::success(format!("Exported workspace to {}", path.display())),
        Err(e) => CliResult::error(format!("Failed to write {}: {}", path.display(), e)),
    }
}

/// Read and validate a backup file, confirm unless `yes`, then replace the workspace.
///
/// An unreadable or invalid file is reported without prompting.
pub async fn import_file<R, W>(
    workspace: &Workspace,
    file: PathBuf,
    yes: bool,
    input: &mut R,
    output: &mut W,
) -> CliResult
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let bytes = match tokio::fs::read(&file).await {
        Ok(bytes) => bytes,
        Err(e) => return CliResult::error(format!("Failed to read {}: {}", file.display(), e)),
    };
    let snapshot = match Workspace::parse_import(&bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => return CliResult::error(format!("Import failed: {}", e)),
    };

    if !yes {
        match confirm_import(input, output).await {
            Ok(true) => {}
            Ok(false) => return CliResult::success("Import cancelled"),
            Err(e) => return CliResult::error(format!("Failed to read answer: {}", e)),
        }
    }

    match workspace.apply_import(snapshot).await {
        Ok(()) => CliResult::success(format!("Imported workspace from {}", file.display())),
        Err(e) => CliResult::error(format!("Import failed: {}", e)),
    }
}

/// Ask before an import overwrites the workspace.
pub async fn confirm_import<R, W>(input: &mut R, output: &mut W) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"This will overwrite all current grants, analysis, drafts and knowledge items. Continue? [y/N] ")
        .await?;
    output.flush().await?;

    let mut answer = String::new();
    input.read_line(&mut answer).await?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Line-oriented chat loop.
///
/// The session is rebuilt whenever grants or knowledge items change under it.
/// A failed reply is reported and the loop continues.
pub async fn run_chat<R, W>(workspace: &Workspace, input: R, mut output: W) -> CliResult
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = match workspace.chat_session().await {
        Ok(session) => session,
        Err(e) => return CliResult::error(format!("Chat unavailable: {}", e)),
    };

    let mut lines = input.lines();
    let mut exchanges = 0usize;
    loop {
        if output.write_all(b"> ").await.is_err() || output.flush().await.is_err() {
            break;
        }
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return CliResult::error(format!("Failed to read input: {}", e)),
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        if !workspace.is_chat_session_current(&session).await {
            match workspace.chat_session().await {
                Ok(fresh) => session = fresh,
                Err(e) => return CliResult::error(format!("Chat unavailable: {}", e)),
            }
        }

        let reply = match session.send(message).await {
            Ok(reply) => {
                exchanges += 1;
                reply
            }
            Err(e) => format!("Sorry, I couldn't answer that: {}", e),
        };
        if output
            .write_all(format!("{}\n\n", reply.trim_end()).as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }

    CliResult::success(format!("Chat ended after {} exchange(s)", exchanges))
}

fn format_grant(grant: &GrantRecord) -> String {
    let mut line = format!("{}  [{}]  {}", grant.id, grant.outcome, grant.title);
    if let Some(organization) = &grant.organization {
        line.push_str(&format!("  ({})", organization));
    }
    if let Some(requested) = grant.amount_requested {
        line.push_str(&format!("  requested ${:.0}", requested));
    }
    if grant.outcome == Outcome::Won {
        line.push_str(&format!("  awarded ${:.0}", grant.effective_award()));
    }
    if let Some(locations) = grant.locations.as_deref().filter(|l| !l.is_empty()) {
        let labels: Vec<&str> = locations.iter().map(GrantLocation::label).collect();
        line.push_str(&format!("  @ {}", labels.join(", ")));
    }
    line.push('\n');
    line
}

fn format_knowledge_item(item: &KnowledgeItem) -> String {
    if item.is_link() {
        format!("{}  [link]  {}: {}\n", item.id, item.title, item.content)
    } else {
        format!(
            "{}  [doc]   {} ({} chars, added {})\n",
            item.id,
            item.title,
            item.content.chars().count(),
            item.date_added.format("%Y-%m-%d")
        )
    }
}

fn format_section(section: &DraftSection) -> String {
    let status = if section.is_generating {
        " (generating)"
    } else if section.last_feedback.is_some() {
        " (refined, undo available)"
    } else {
        ""
    };
    format!(
        "[{}]{}\nQ: {}\n\n{}\n",
        section.id, status, section.question, section.draft
    )
}

fn format_analysis(analysis: &ComparativeAnalysis) -> String {
    let mut output = String::new();
    output.push_str("\nComparative Analysis\n");
    output.push_str("════════════════════\n\n");
    output.push_str(&analysis.executive_summary);
    output.push_str("\n\n");

    push_list(&mut output, "Winning strengths", &analysis.winning_strengths);
    push_list(&mut output, "Losing weaknesses", &analysis.losing_weaknesses);
    push_list(&mut output, "Actionable advice", &analysis.actionable_advice);

    if !analysis.key_themes.is_empty() {
        output.push_str("Key themes:\n");
        for theme in &analysis.key_themes {
            output.push_str(&format!(
                "  - {} [{:?}] impact {:.1}, frequency {:.0}: {}\n",
                theme.name, theme.sentiment, theme.impact_score, theme.frequency, theme.description
            ));
        }
        output.push('\n');
    }

    if !analysis.success_rate_by_theme.is_empty() {
        output.push_str("Success rate by theme:\n");
        for rate in &analysis.success_rate_by_theme {
            output.push_str(&format!("  - {}: {:.0}%\n", rate.theme, rate.rate * 100.0));
        }
    }
    output
}

fn push_list(output: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(heading);
    output.push_str(":\n");
    for item in items {
        output.push_str(&format!("  - {}\n", item));
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use crate::gemini::{AiGateway, MockContentGenerator};
    use crate::model::AppSnapshot;
    use crate::storage::MemorySnapshotStore;
    use std::sync::Arc;

    fn workspace(mock: MockContentGenerator) -> Workspace {
        Workspace::with_snapshot(
            AppSnapshot::default(),
            Arc::new(MemorySnapshotStore::new()),
            AiGateway::new(Arc::new(mock)),
        )
    }

    fn offline() -> Workspace {
        let mut mock = MockContentGenerator::new();
        mock.expect_generate().never();
        workspace(mock)
    }

    #[test]
    fn test_parse_grant_add() {
        let cli = Cli::try_parse_from([
            "grantbloom",
            "grant",
            "add",
            "--title",
            "Garden",
            "--content",
            "Urban gardens",
            "--outcome",
            "won",
            "--awarded",
            "5000",
            "--location",
            "tosa-slc",
            "--location",
            "TOSA Denver",
        ])
        .unwrap();

        match cli.command {
            Commands::Grant {
                command:
                    GrantCommands::Add {
                        outcome, locations, awarded, ..
                    },
            } => {
                assert_eq!(outcome, Outcome::Won);
                assert_eq!(awarded, Some(5000.0));
                assert_eq!(
                    locations,
                    vec![GrantLocation::TosaSlc, GrantLocation::TosaDenver]
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_grant_add_outcome_defaults_to_won() {
        let cli = Cli::try_parse_from([
            "grantbloom", "grant", "add", "--title", "Garden", "--content", "Urban gardens",
        ])
        .unwrap();

        match cli.command {
            Commands::Grant {
                command: GrantCommands::Add { outcome, .. },
            } => assert_eq!(outcome, Outcome::Won),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_grant_add_needs_content_or_file() {
        assert!(Cli::try_parse_from(["grantbloom", "grant", "add", "--title", "x"]).is_err());
        assert!(
            Cli::try_parse_from(["grantbloom", "grant", "add", "--file", "a.pdf"]).is_ok()
        );
    }

    #[test]
    fn test_ephemeral_is_global() {
        let cli = Cli::try_parse_from(["grantbloom", "grant", "list", "--ephemeral"]).unwrap();
        assert!(cli.ephemeral);
    }

    #[test]
    fn test_parse_import_flags() {
        let cli = Cli::try_parse_from(["grantbloom", "import", "backup.json", "--yes"]).unwrap();
        assert!(matches!(cli.command, Commands::Import { yes: true, .. }));
    }

    #[tokio::test]
    async fn test_grant_list_after_demo() {
        let ws = offline();
        let result = execute_command(
            Commands::Grant {
                command: GrantCommands::Demo,
            },
            &ws,
        )
        .await;
        assert_eq!(result.exit_code, 0);

        let listed = execute_command(
            Commands::Grant {
                command: GrantCommands::List,
            },
            &ws,
        )
        .await;
        assert!(listed.message.contains("Tech for Seniors"));
        assert!(listed.message.contains("[WON]"));
    }

    #[tokio::test]
    async fn test_analyze_with_one_grant_fails() {
        let ws = offline();
        ws.add_grant(NewGrant::new("One", "text")).await.unwrap();
        let result = execute_command(Commands::Analyze, &ws).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.message.contains("At least 2"));
    }

    #[tokio::test]
    async fn test_remove_unknown_grant_is_error() {
        let ws = offline();
        let result = execute_command(
            Commands::Grant {
                command: GrantCommands::Remove { id: "nope".into() },
            },
            &ws,
        )
        .await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_chat_requires_grants() {
        let ws = offline();
        let result = run_chat(&ws, &b"hello\n"[..], Vec::new()).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_chat_loop_reports_failures_and_continues() {
        let mut mock = MockContentGenerator::new();
        let mut calls = 0;
        mock.expect_generate().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(AiError::TransportFailure {
                    message: "offline".to_string(),
                })
            } else {
                Ok("Two grants were won.".to_string())
            }
        });
        let ws = workspace(mock);
        ws.load_demo_grants().await.unwrap();

        let mut output = Vec::new();
        let result = run_chat(&ws, &b"first\n\nsecond\nexit\nignored\n"[..], &mut output).await;

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.message, "Chat ended after 1 exchange(s)");
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Sorry, I couldn't answer that"));
        assert!(printed.contains("Two grants were won."));
    }

    #[tokio::test]
    async fn test_confirm_import_answers() {
        let mut output = Vec::new();
        assert!(confirm_import(&mut &b"y\n"[..], &mut output).await.unwrap());
        assert!(confirm_import(&mut &b"YES\n"[..], &mut output).await.unwrap());
        assert!(!confirm_import(&mut &b"\n"[..], &mut output).await.unwrap());
        assert!(!confirm_import(&mut &b""[..], &mut output).await.unwrap());
    }

    #[tokio::test]
    async fn test_export_then_import_via_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let source = offline();
        source.load_demo_grants().await.unwrap();
        source.set_apply_context("Max 500 words").await.unwrap();
        let exported = execute_command(
            Commands::Export {
                out: Some(path.clone()),
            },
            &source,
        )
        .await;
        assert_eq!(exported.exit_code, 0);

        let target = offline();
        let imported = execute_command(
            Commands::Import {
                file: path,
                yes: true,
            },
            &target,
        )
        .await;
        assert_eq!(imported.exit_code, 0, "{}", imported.message);
        assert_eq!(target.snapshot().await, source.snapshot().await);
    }

    #[tokio::test]
    async fn test_invalid_import_file_fails_before_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"analysis":null}"#).unwrap();

        let ws = offline();
        ws.load_demo_grants().await.unwrap();
        let before = ws.snapshot().await;

        let mut input: &[u8] = b"y\n";
        let mut output = Vec::new();
        let result = import_file(&ws, path, false, &mut input, &mut output).await;

        assert_eq!(result.exit_code, 1);
        assert!(result.message.starts_with("Import failed"), "{}", result.message);
        assert_eq!(input, b"y\n", "answer must not be consumed");
        assert!(output.is_empty(), "no prompt for an invalid file");
        assert_eq!(ws.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_missing_import_file_fails_before_prompting() {
        let ws = offline();
        let mut input: &[u8] = b"y\n";
        let mut output = Vec::new();
        let result = import_file(
            &ws,
            PathBuf::from("/nonexistent/backup.json"),
            false,
            &mut input,
            &mut output,
        )
        .await;

        assert_eq!(result.exit_code, 1);
        assert!(result.message.starts_with("Failed to read"));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_declined_import_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(&path, r#"{"grants":[],"applyContext":"From backup"}"#).unwrap();

        let ws = offline();
        ws.set_apply_context("Current").await.unwrap();
        let before = ws.snapshot().await;

        let mut input: &[u8] = b"n\n";
        let mut output = Vec::new();
        let result = import_file(&ws, path.clone(), false, &mut input, &mut output).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.message, "Import cancelled");
        assert!(String::from_utf8(output).unwrap().contains("Continue? [y/N]"));
        assert_eq!(ws.snapshot().await, before);

        let mut input: &[u8] = b"yes\n";
        let mut output = Vec::new();
        let result = import_file(&ws, path, false, &mut input, &mut output).await;
        assert_eq!(result.exit_code, 0, "{}", result.message);
        assert_eq!(ws.snapshot().await.apply_context, "From backup");
    }

    #[tokio::test]
    async fn test_undo_without_feedback() {
        let ws = offline();
        let section = ws.queue_draft_section("Q").await.unwrap();
        let result = execute_command(
            Commands::Draft {
                command: DraftCommands::Undo { id: section.id },
            },
            &ws,
        )
        .await;
        assert_eq!(result.exit_code, 0);
        assert!(result.message.starts_with("Nothing to undo"));
    }
}
