//! notewise-cli — command-line client for the Notewise HTTP API
//!
//! Covers everything the notes web UI does: note CRUD, AI processing and the
//! per-note processing history.
//!
//! # Subcommands
//! - `notes <user-id>`                          — list a user's notes
//! - `show <note-id>`                           — print one note
//! - `create --user <id> --title <t> --content <c>`
//! - `update <note-id> --title <t> --content <c>`
//! - `delete <note-id>`
//! - `process <kind> (--content <c> | --note <id>) [--json]`
//! - `history <note-id>` / `history-delete <process-id>`
//! - `status`                                   — show server health

use clap::{Parser, Subcommand};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
const DEFAULT_USER: i64 = 1;

/// Characters of the original content shown per history entry.
const PREVIEW_CHARS: usize = 60;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "notewise-cli",
    version,
    about = "Notewise notes — create notes and turn them into summaries, bullet points or study questions"
)]
struct Cli {
    /// Notewise HTTP server URL (overrides NOTEWISE_HTTP_URL env var)
    #[arg(long, env = "NOTEWISE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List a user's notes, most recently updated first
    Notes {
        #[arg(default_value_t = DEFAULT_USER)]
        user_id: i64,
    },

    /// Print a single note
    Show { note_id: i64 },

    /// Create a note
    Create {
        #[arg(long, default_value_t = DEFAULT_USER)]
        user: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },

    /// Replace a note's title and content
    Update {
        note_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },

    /// Delete a note
    Delete { note_id: i64 },

    /// Run an AI transformation (summary, bullet_points, study_questions)
    Process {
        kind: String,

        /// Text to process; defaults to the body of --note
        #[arg(long, required_unless_present = "note")]
        content: Option<String>,

        /// Attach the result to this note's history
        #[arg(long)]
        note: Option<i64>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show AI processing history for a note
    History { note_id: i64 },

    /// Delete one AI processing history entry
    HistoryDelete { process_id: i64 },

    /// Show Notewise server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub note_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessView {
    pub success: bool,
    pub message: String,
    pub processed_content: String,
    pub process_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub process_id: i64,
    pub process_type: String,
    pub original_content: String,
    pub processed_content: String,
    pub processed_at: String,
}

/// Heading shown above processed output, as the web UI labels it.
pub fn kind_title(kind: &str) -> &str {
    match kind {
        "summary" => "AI Summary",
        "bullet_points" => "Bullet Points",
        "study_questions" => "Study Questions",
        other => other,
    }
}

/// First line of `text`, capped at `max` characters, with an ellipsis when cut.
pub fn preview(text: &str, max: usize) -> String {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut out: String = first_line.chars().take(max).collect();
    if first_line.chars().count() > max || text.lines().filter(|l| !l.trim().is_empty()).count() > 1 {
        out.push('…');
    }
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

struct Api {
    client: Client,
    server: String,
}

impl Api {
    fn new(server: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(90))
            .build()?;
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    /// Send a request and return the JSON body, exiting on transport or HTTP errors.
    fn send(&self, request: RequestBuilder, url: &str) -> anyhow::Result<serde_json::Value> {
        let resp = match request.send() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("notewise-cli: connection failed to {}: {}", url, e);
                std::process::exit(1);
            }
        };

        let status = resp.status();
        let body: serde_json::Value = resp.json().unwrap_or_default();

        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("request failed");
            eprintln!("notewise-cli: server returned {}: {}", status, message);
            std::process::exit(1);
        }

        Ok(body)
    }

    fn get(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        let url = self.url(path);
        self.send(self.client.get(&url), &url)
    }

    fn post(&self, path: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let url = self.url(path);
        self.send(self.client.post(&url).json(&body), &url)
    }

    fn put(&self, path: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let url = self.url(path);
        self.send(self.client.put(&url).json(&body), &url)
    }

    fn delete(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        let url = self.url(path);
        self.send(self.client.delete(&url), &url)
    }
}

fn do_notes(api: &Api, user_id: i64) -> anyhow::Result<()> {
    let notes: Vec<NoteView> = serde_json::from_value(api.get(&format!("/getNotes/{}", user_id))?)?;

    if notes.is_empty() {
        eprintln!("No notes yet for user {}", user_id);
        return Ok(());
    }
    for n in &notes {
        println!("#{:<5} {}  ({})", n.note_id, n.title, n.updated_at);
        println!("       {}", preview(&n.content, PREVIEW_CHARS));
    }
    Ok(())
}

fn do_show(api: &Api, note_id: i64) -> anyhow::Result<()> {
    let note: NoteView = serde_json::from_value(api.get(&format!("/getNote/{}", note_id))?)?;
    println!("{}", note.title);
    println!("note #{} · user {} · created {} · updated {}\n", note.note_id, note.user_id, note.created_at, note.updated_at);
    println!("{}", note.content);
    Ok(())
}

fn do_process(
    api: &Api,
    kind: &str,
    content: Option<String>,
    note_id: Option<i64>,
    json_output: bool,
) -> anyhow::Result<()> {
    let content = match (content, note_id) {
        (Some(c), _) => c,
        (None, Some(id)) => {
            let note: NoteView = serde_json::from_value(api.get(&format!("/getNote/{}", id))?)?;
            note.content
        }
        (None, None) => anyhow::bail!("either --content or --note is required"),
    };

    let body = api.post(
        "/processNote",
        serde_json::json!({
            "processType": kind,
            "content": content,
            "noteId": note_id.unwrap_or(0),
        }),
    )?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let result: ProcessView = serde_json::from_value(body)?;
    if !result.success {
        anyhow::bail!("AI processing failed");
    }
    println!("== {} ==\n", kind_title(kind));
    println!("{}\n", result.processed_content);
    match result.process_id {
        Some(id) => eprintln!("{} (history #{})", result.message, id),
        None => eprintln!("{}", result.message),
    }
    Ok(())
}

fn do_history(api: &Api, note_id: i64) -> anyhow::Result<()> {
    let records: Vec<HistoryView> =
        serde_json::from_value(api.get(&format!("/getAIHistory/{}", note_id))?)?;

    if records.is_empty() {
        eprintln!("No AI history for note {}", note_id);
        return Ok(());
    }
    for r in &records {
        println!("#{} {} · {}", r.process_id, kind_title(&r.process_type), r.processed_at);
        println!("  from: {}", preview(&r.original_content, PREVIEW_CHARS));
        println!("{}\n", r.processed_content);
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(api: &Api) -> anyhow::Result<()> {
    let body = api.get("/health")?;
    println!("Notewise server: {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
    println!("Storage:         {}", body["storage"].as_str().unwrap_or("?"));
    if let Some(pg) = body["postgresql"].as_str() {
        println!("PostgreSQL:      {}", pg);
    }
    Ok(())
}

fn print_message(body: &serde_json::Value) {
    println!("{}", body["message"].as_str().unwrap_or("ok"));
}

// ============================================================================
// Main
// ============================================================================

fn run(cli: Cli) -> anyhow::Result<()> {
    let api = Api::new(&cli.server)?;

    match cli.command {
        Commands::Notes { user_id } => do_notes(&api, user_id),
        Commands::Show { note_id } => do_show(&api, note_id),
        Commands::Create { user, title, content } => {
            let body = api.post(
                "/createNote",
                serde_json::json!({ "userId": user, "title": title, "content": content }),
            )?;
            println!("{} (#{})", body["message"].as_str().unwrap_or("ok"), body["noteId"]);
            Ok(())
        }
        Commands::Update { note_id, title, content } => {
            let body = api.put(
                &format!("/updateNote/{}", note_id),
                serde_json::json!({ "title": title, "content": content }),
            )?;
            print_message(&body);
            Ok(())
        }
        Commands::Delete { note_id } => {
            print_message(&api.delete(&format!("/deleteNote/{}", note_id))?);
            Ok(())
        }
        Commands::Process { kind, content, note, json } => do_process(&api, &kind, content, note, json),
        Commands::History { note_id } => do_history(&api, note_id),
        Commands::HistoryDelete { process_id } => {
            print_message(&api.delete(&format!("/deleteAIHistory/{}", process_id))?);
            Ok(())
        }
        Commands::Status => do_status(&api),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("notewise-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
