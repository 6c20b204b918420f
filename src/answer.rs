//! Grounded answer composition.
//!
//! A [`PersonAgent`] pairs one person's [`Retriever`] with a
//! [`Generator`]: retrieve the top chunks, number them into a prompt that
//! restricts the model to that context, and return the model's answer
//! together with the hits it was given.
//!
//! [`Composer`] routes a query across several people. Each person is
//! answered independently and in order; a failure for one person becomes
//! an inline note in that person's section instead of aborting the rest.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::EmbedderHandle;
use crate::error::Result;
use crate::generation::Generator;
use crate::models::Hit;
use crate::retriever::Retriever;
use crate::store::Scope;

/// Marker used in place of the context block when nothing was retrieved.
pub const NO_CONTEXT: &str = "(no context)";

/// Subject named in prompts built over the global index.
pub const GLOBAL_SUBJECT: &str = "the indexed resumes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub instructions: String,
    pub user: String,
}

impl Prompt {
    /// Single-string form sent to providers that take one message.
    pub fn combined(&self) -> String {
        format!("[system]\n{}\n\n[user]\n{}", self.instructions, self.user)
    }
}

/// Build the prompt for `query` about `subject` from `hits`.
///
/// Hits are numbered from 1 as `[i] (source)` blocks separated by blank
/// lines, so the model can cite them in its `Sources` section.
pub fn build_prompt(subject: &str, query: &str, hits: &[Hit]) -> Prompt {
    let context = if hits.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| format!("[{}] ({})\n{}", i + 1, hit.source, hit.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let instructions = format!(
        "You are a retrieval assistant specialized in the resume of {subject}.\n\
         - Answer ONLY from the cited context.\n\
         - If the evidence is insufficient, say so explicitly.\n\
         - Keep sentences short and use bullet points when they help.\n\
         - Finish with a 'Sources' section listing the context indices you used."
    );
    let user = format!("Question about {subject}: {query}\n\nContext:\n{context}");

    Prompt {
        instructions,
        user: user.trim().to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub hits: Vec<Hit>,
}

pub struct PersonAgent {
    subject: String,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
}

impl PersonAgent {
    pub fn new(subject: impl Into<String>, retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            subject: subject.into(),
            retriever,
            generator,
        }
    }

    /// Retrieve, prompt, generate. Errors from any step propagate.
    pub async fn answer(&self, query: &str, top_k: Option<usize>) -> Result<Answer> {
        let hits = self.retriever.retrieve(query, top_k).await?;
        let prompt = build_prompt(&self.subject, query, &hits);
        let text = self.generator.generate(&prompt.combined()).await?;
        Ok(Answer { text, hits })
    }
}

/// One person's part of a multi-person answer.
#[derive(Debug)]
pub struct PersonAnswer {
    pub person: String,
    pub outcome: Result<Answer>,
}

#[derive(Debug)]
pub struct MultiAnswer {
    /// Markdown with one `### Name` section per person.
    pub text: String,
    pub answers: Vec<PersonAnswer>,
}

/// Render one section of a multi-person answer.
pub fn render_section(person: &str, outcome: &Result<Answer>) -> String {
    match outcome {
        Ok(answer) => format!("### {}\n{}", person, answer.text),
        Err(e) => format!("### {}\n_Could not answer for **{}**: {}_", person, person, e),
    }
}

/// Routes queries to per-person agents, creating each agent once.
pub struct Composer {
    storage_dir: PathBuf,
    top_k: usize,
    embedder: EmbedderHandle,
    generator: Arc<dyn Generator>,
    agents: Mutex<HashMap<String, Arc<PersonAgent>>>,
}

impl Composer {
    pub fn new(config: &Config, embedder: EmbedderHandle, generator: Arc<dyn Generator>) -> Self {
        Self {
            storage_dir: config.paths.storage_dir.clone(),
            top_k: config.retrieval.top_k,
            embedder,
            generator,
            agents: Mutex::new(HashMap::new()),
        }
    }

    /// The cached agent for `person`, created on first request.
    pub async fn agent(&self, person: &str) -> Arc<PersonAgent> {
        let mut agents = self.agents.lock().await;
        let agent = agents.entry(person.to_string()).or_insert_with(|| {
            let retriever = Retriever::new(
                Scope::Person(person.to_string()),
                &self.storage_dir,
                self.embedder.clone(),
                self.top_k,
            );
            Arc::new(PersonAgent::new(person, retriever, Arc::clone(&self.generator)))
        });
        Arc::clone(agent)
    }

    /// Answer `query` for each of `people`, in order.
    pub async fn answer_many(
        &self,
        query: &str,
        people: &[String],
        top_k: Option<usize>,
    ) -> MultiAnswer {
        let mut answers = Vec::with_capacity(people.len());
        for person in people {
            let agent = self.agent(person).await;
            let outcome = agent.answer(query, top_k).await;
            match &outcome {
                Ok(answer) => info!(person = %person, hits = answer.hits.len(), "answered"),
                Err(e) => warn!(person = %person, error = %e, "could not answer"),
            }
            answers.push(PersonAnswer {
                person: person.clone(),
                outcome,
            });
        }

        let text = answers
            .iter()
            .map(|a| render_section(&a.person, &a.outcome))
            .collect::<Vec<_>>()
            .join("\n\n");
        MultiAnswer { text, answers }
    }

    /// Answer `query` from the single global index.
    pub async fn answer_global(&self, query: &str, top_k: Option<usize>) -> Result<Answer> {
        let retriever = Retriever::new(
            Scope::Global,
            &self.storage_dir,
            self.embedder.clone(),
            self.top_k,
        );
        PersonAgent::new(GLOBAL_SUBJECT, retriever, Arc::clone(&self.generator))
            .answer(query, top_k)
            .await
    }
}
