mod cli;
mod client;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use client::ApiClient;
use fsearch_core::{ConversationState, ConversationStore, SearchOutcome, SearchService, Source};
use fsearch_model::{ChatHistoryEntry, SearchError};
use fsearch_server::new_session_id;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Some(cmd) = &cli.command {
        match cmd {
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                return Ok(());
            }
            Commands::ShowConfig => {
                let config = fsearch_config::load(cli.config.as_deref())?;
                println!("{}", toml::to_string_pretty(&config)?);
                return Ok(());
            }
            Commands::Chats { limit } => return print_chats(&cli, *limit),
            Commands::Clear { query, all } => return clear_chats(&cli, query.as_deref(), *all),
            Commands::Serve { listen } => return serve(&cli, listen.clone()).await,
        }
    }

    let Some(query) = cli.query.clone() else {
        anyhow::bail!("no query given; try `fsearch \"your question\"` or `fsearch serve`");
    };
    run_query(&cli, &query).await
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open_store(cli: &Cli) -> anyhow::Result<ConversationStore> {
    let config = fsearch_config::load(cli.config.as_deref())?;
    Ok(match &config.storage.state_dir {
        Some(dir) => ConversationStore::open(dir),
        None => ConversationStore::at_default(),
    })
}

// ─── Server ──────────────────────────────────────────────────────────────────

async fn serve(cli: &Cli, listen: Option<String>) -> anyhow::Result<()> {
    let config = fsearch_config::load(cli.config.as_deref())?;
    let listen = listen.unwrap_or_else(|| config.server.listen.clone());
    let provider: Arc<dyn fsearch_model::SearchModel> =
        Arc::from(fsearch_model::from_config(&config.model)?);
    let service = Arc::new(SearchService::with_default_formatter(provider));
    fsearch_server::run(&listen, service).await
}

// ─── Query flow ──────────────────────────────────────────────────────────────

async fn run_query(cli: &Cli, query: &str) -> anyhow::Result<()> {
    let config = fsearch_config::load(cli.config.as_deref())?;

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| fsearch_model::resolve_api_key(&config.model))
        .unwrap_or_default();
    if api_key.is_empty() {
        anyhow::bail!(
            "no API key: pass --api-key, set [model] api_key in the config, \
             or export GEMINI_API_KEY"
        );
    }
    if !fsearch_config::looks_like_gemini_key(&api_key) {
        tracing::warn!("API key does not look like a Gemini key (expected AIza… prefix)");
    }

    let store = open_store(cli)?;
    let saved = if cli.fresh { None } else { store.load_by_query(query) };

    // Resume without a new request: repeating a saved query shows its latest
    // answer; a follow-up or --fresh is needed to hit the model again.
    if cli.follow.is_none() {
        if let Some(prior) = &saved {
            tracing::info!(session = %prior.session_id, "resuming saved conversation");
            print_saved(prior);
            return Ok(());
        }
    }

    match (&cli.server, &cli.follow) {
        (Some(base), follow) => {
            run_remote(query, follow.as_deref(), &api_key, base, &store, saved).await
        }
        (None, follow) => {
            run_local(query, follow.as_deref(), &api_key, &config, &store, saved).await
        }
    }
}

/// In-process pipeline: build the provider from config and call the service
/// directly.
async fn run_local(
    query: &str,
    follow: Option<&str>,
    api_key: &str,
    config: &fsearch_config::Config,
    store: &ConversationStore,
    saved: Option<ConversationState>,
) -> anyhow::Result<()> {
    let provider: Arc<dyn fsearch_model::SearchModel> =
        Arc::from(fsearch_model::from_config(&config.model)?);
    let service = SearchService::with_default_formatter(provider);

    if let (Some(question), Some(prior)) = (follow, &saved) {
        match service.follow_up(question, &prior.history, api_key).await {
            Ok(outcome) => {
                let new_entries = vec![
                    ChatHistoryEntry::user(question),
                    ChatHistoryEntry::assistant(outcome.text.clone()),
                ];
                store.append_exchange(
                    &prior.session_id,
                    &outcome.formatted_text,
                    &outcome.sources,
                    &new_entries,
                )?;
                print_outcome(&outcome.text, &outcome.sources);
                return Ok(());
            }
            Err(SearchError::SessionNotFound(_)) => {
                tracing::info!("saved session rejected; falling back to a fresh search");
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Fresh search: either no conversation to follow up on, or the session
    // fell through.  A follow-up question with nothing to resume becomes its
    // own top-level search.
    let effective_query = follow.unwrap_or(query);
    let outcome = service.search(effective_query, api_key).await?;
    save_search(store, effective_query, &outcome)?;
    print_outcome(&outcome.text, &outcome.sources);
    Ok(())
}

/// Same flow against a remote fsearch server.  The 404 fallback lives inside
/// [`ApiClient::follow_up`].
async fn run_remote(
    query: &str,
    follow: Option<&str>,
    api_key: &str,
    base_url: &str,
    store: &ConversationStore,
    saved: Option<ConversationState>,
) -> anyhow::Result<()> {
    let api = ApiClient::new(base_url);

    if let (Some(question), Some(prior)) = (follow, &saved) {
        let result = api
            .follow_up(&prior.session_id, question, &prior.history, api_key)
            .await?;
        let raw_text = result.raw.model_response.clone();
        if result.session_id == prior.session_id {
            store.append_exchange(
                &prior.session_id,
                &result.summary,
                &result.sources,
                &result.new_history_entries,
            )?;
        } else {
            // The client fell back to a fresh search under a new session.
            let state = ConversationState {
                session_id: result.session_id,
                query: question.to_string(),
                summary: result.summary.clone(),
                sources: result.sources.clone(),
                history: result.new_history_entries.clone(),
                is_follow_up: false,
                created_at: chrono::Utc::now(),
            };
            store.save(&state)?;
        }
        print_outcome(&raw_text, &result.sources);
        return Ok(());
    }

    let effective_query = follow.unwrap_or(query);
    let result = api.search(effective_query, api_key).await?;
    let state = ConversationState {
        session_id: result.session_id,
        query: result.query,
        summary: result.summary,
        sources: result.sources.clone(),
        history: result.history,
        is_follow_up: false,
        created_at: chrono::Utc::now(),
    };
    store.save(&state)?;
    print_outcome(&result.raw.model_response, &result.sources);
    Ok(())
}

fn save_search(
    store: &ConversationStore,
    query: &str,
    outcome: &SearchOutcome,
) -> anyhow::Result<()> {
    let state = ConversationState::from_search(
        new_session_id(),
        query,
        outcome.formatted_text.clone(),
        outcome.sources.clone(),
        outcome.text.clone(),
    );
    store.save(&state).context("saving conversation state")
}

// ─── Output ──────────────────────────────────────────────────────────────────

fn print_outcome(text: &str, sources: &[Source]) {
    println!("{text}");
    print_sources(sources);
}

fn print_saved(state: &ConversationState) {
    // The latest raw answer is the last assistant turn; the summary holds its
    // HTML form, which is not terminal-friendly.
    if let Some(last) = state
        .history
        .iter()
        .rev()
        .find(|e| e.role == fsearch_model::ChatRole::Assistant)
    {
        println!("{}", last.content);
    }
    print_sources(&state.sources);
    eprintln!("\n(saved conversation: ask more with --follow, or restart with --fresh)");
}

fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for (i, s) in sources.iter().enumerate() {
        println!("  {}. {} <{}>", i + 1, s.title, s.url);
    }
}

// ─── Saved conversations ─────────────────────────────────────────────────────

fn print_chats(cli: &Cli, limit: Option<usize>) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let mut chats = store.list_all();
    if let Some(n) = limit {
        chats.truncate(n);
    }
    if chats.is_empty() {
        println!("No saved conversations.");
        return Ok(());
    }
    for c in &chats {
        let turns = c.history.len() / 2;
        println!(
            "{}  {}  [{} turn{}]  {}",
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.session_id,
            turns,
            if turns == 1 { "" } else { "s" },
            c.query,
        );
    }
    Ok(())
}

fn clear_chats(cli: &Cli, query: Option<&str>, all: bool) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    match (query, all) {
        (_, true) => {
            store.clear_all()?;
            println!("Cleared all saved conversations.");
        }
        (Some(q), false) => {
            store.clear_by_query(q)?;
            println!("Cleared saved conversation for: {q}");
        }
        (None, false) => anyhow::bail!("pass a query to clear, or --all"),
    }
    Ok(())
}
