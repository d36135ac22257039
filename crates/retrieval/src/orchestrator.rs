use crate::engine::{RetrievalEngine, RetrievedChunk};
use crate::error::Result;
use crate::providers::{CompletionProvider, RepoSource};
use crate::retry::RetryPolicy;
use crate::rewrite;
use serde::Deserialize;
use std::sync::Arc;

const DECISION_SYSTEM_PROMPT: &str = "You decide whether a code-retrieval \
system needs to fetch another file before answering. Respond with JSON only: \
{\"action\": \"fetch_file\", \"path\": \"<repo-relative path>\"} to request one \
file from the listing, or {\"action\": \"answer_directly\"} when the retrieved \
context is enough (or no listed file would help). Never invent paths.";

/// What the agent chose to do after seeing the retrieved context
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentAction {
    FetchFile { path: String },
    AnswerDirectly,
}

/// Phases of a turn, in the order they can occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPhase {
    Rewrite,
    Retrieve,
    Evaluate,
    Fetch,
    Ingest,
    Respond,
}

/// Everything a turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Keyword form of the query actually used for retrieval
    pub rewritten_query: String,
    pub chunks: Vec<RetrievedChunk>,
    /// Files fetched and ingested during this turn
    pub fetched_files: Vec<String>,
    /// False when the turn ended with thin context: the caller should say so
    /// rather than answer confidently
    pub context_complete: bool,
}

/// Per-turn retrieval orchestration with just-in-time fetching.
///
/// A turn rewrites the query, retrieves, and evaluates the result. Thin
/// context triggers the fetch loop: the agent picks a file from the source
/// listing, the file is ingested into the session, and retrieval reruns.
/// The loop is bounded by `max_fetches_per_turn`; failed fetch attempts
/// count against the cap, so a misbehaving source cannot stall a turn.
pub struct Orchestrator {
    engine: Arc<RetrievalEngine>,
    completion: Arc<dyn CompletionProvider>,
    source: Arc<dyn RepoSource>,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<RetrievalEngine>,
        completion: Arc<dyn CompletionProvider>,
        source: Arc<dyn RepoSource>,
    ) -> Self {
        Self {
            engine,
            completion,
            source,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one conversational turn for a session
    pub async fn run_turn(&self, session_id: &str, raw_query: &str) -> Result<TurnOutcome> {
        let mut phase = TurnPhase::Rewrite;
        log::debug!("turn for session {session_id}: {phase:?}");
        let rewritten_query =
            rewrite::rewrite_query(self.completion.as_ref(), raw_query).await;

        phase = TurnPhase::Retrieve;
        log::debug!("turn for session {session_id}: {phase:?}");
        let mut chunks = self.engine.retrieve(session_id, &rewritten_query).await?;

        let cap = self.engine.config().max_fetches_per_turn;
        let mut fetched_files = Vec::new();
        let mut fetches_attempted = 0usize;

        let context_complete = loop {
            phase = TurnPhase::Evaluate;
            log::debug!("turn for session {session_id}: {phase:?}");
            if self.is_sufficient(&chunks) {
                break true;
            }
            if fetches_attempted >= cap {
                log::info!(
                    "fetch cap ({cap}) reached for session {session_id} with thin context"
                );
                break false;
            }

            match self
                .decide_action(raw_query, &rewritten_query, &chunks, &fetched_files)
                .await
            {
                AgentAction::AnswerDirectly => break false,
                AgentAction::FetchFile { path } => {
                    fetches_attempted += 1;
                    phase = TurnPhase::Fetch;
                    log::debug!("turn for session {session_id}: {phase:?} {path}");

                    let source = Arc::clone(&self.source);
                    let fetch_path = path.clone();
                    let fetched = self
                        .retry
                        .run(move || {
                            let source = Arc::clone(&source);
                            let path = fetch_path.clone();
                            async move { source.fetch_file(&path).await }
                        })
                        .await;

                    match fetched {
                        Ok(content) => {
                            phase = TurnPhase::Ingest;
                            log::debug!("turn for session {session_id}: {phase:?} {path}");
                            self.engine
                                .ingest_document(session_id, &path, &content)
                                .await?;
                            fetched_files.push(path);

                            chunks =
                                self.engine.retrieve(session_id, &rewritten_query).await?;
                        }
                        Err(e) => {
                            // Attempt spent; the next Evaluate pass may try
                            // a different file if budget remains
                            log::warn!("fetch of {path} failed: {e}");
                        }
                    }
                }
            }
        };

        phase = TurnPhase::Respond;
        log::debug!(
            "turn for session {session_id}: {phase:?} ({} chunks, complete={context_complete})",
            chunks.len()
        );
        Ok(TurnOutcome {
            rewritten_query,
            chunks,
            fetched_files,
            context_complete,
        })
    }

    fn is_sufficient(&self, chunks: &[RetrievedChunk]) -> bool {
        // Scores below the floor were already dropped during retrieval
        chunks.len() >= self.engine.config().min_results
    }

    async fn decide_action(
        &self,
        raw_query: &str,
        rewritten_query: &str,
        chunks: &[RetrievedChunk],
        already_fetched: &[String],
    ) -> AgentAction {
        let listing = match self.source.list_files().await {
            Ok(files) => files,
            Err(e) => {
                log::warn!("could not list source files: {e}");
                return AgentAction::AnswerDirectly;
            }
        };

        let retrieved_paths: Vec<&str> = chunks
            .iter()
            .map(|c| c.chunk.file_path.as_str())
            .collect();
        let user_prompt = format!(
            "Question: {raw_query}\nSearch keywords: {rewritten_query}\n\
             Repository files:\n{}\n\
             Already retrieved from: {}\nAlready fetched this turn: {}",
            listing.join("\n"),
            if retrieved_paths.is_empty() {
                "(nothing)".to_string()
            } else {
                retrieved_paths.join(", ")
            },
            if already_fetched.is_empty() {
                "(nothing)".to_string()
            } else {
                already_fetched.join(", ")
            },
        );

        let response = match self
            .completion
            .complete(DECISION_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("fetch decision failed, answering with current context: {e}");
                return AgentAction::AnswerDirectly;
            }
        };

        let action = parse_action(&response);

        // Refetching the same path cannot add context and would burn the cap
        if let AgentAction::FetchFile { path } = &action {
            if already_fetched.iter().any(|f| f == path) {
                log::warn!("agent asked to refetch {path}, answering instead");
                return AgentAction::AnswerDirectly;
            }
        }
        action
    }
}

/// Parse the agent's JSON decision; anything unparseable means answering
/// with what we have
fn parse_action(response: &str) -> AgentAction {
    let Some(json) = rewrite::extract_json_object(response) else {
        log::warn!("agent response carried no JSON object, answering directly");
        return AgentAction::AnswerDirectly;
    };
    match serde_json::from_str::<AgentAction>(json) {
        Ok(AgentAction::FetchFile { path }) if path.trim().is_empty() => {
            AgentAction::AnswerDirectly
        }
        Ok(action) => action,
        Err(e) => {
            log::warn!("unparseable agent action ({e}), answering directly");
            AgentAction::AnswerDirectly
        }
    }
}
