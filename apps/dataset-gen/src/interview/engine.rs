//! Interview Engine: drives one persona through the question battery as a
//! multi-turn role-play with one model.
//!
//! Session states:
//!
//! ```text
//! NotStarted ─start→ InProgress ─ask→ AwaitingAnswer ─answer→ InProgress … → Completed
//!                         └──────────────── failure ──────────────→ Halted
//! ```
//!
//! The history is owned by the session and grows monotonically; it is never
//! shared between (persona, model) pairs.

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::pacing::Pacer;
use crate::interview::prompts::{format_answer_prompt, format_system_prompt};
use crate::interview::questions::Question;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{ChatMessage, GenerationSettings, LlmClient};
use crate::models::interview::Interaction;
use crate::models::persona::Persona;
use crate::storage::InteractionWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    AwaitingAnswer,
    Completed,
    Halted,
}

/// System framing first, then alternating question / answer turns.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}

/// Per-(persona, model) state machine.
pub struct InterviewSession<'a> {
    persona: &'a Persona,
    model: &'a str,
    questions: &'a [Question],
    history: ConversationHistory,
    state: SessionState,
    next: usize,
}

impl<'a> InterviewSession<'a> {
    pub fn new(persona: &'a Persona, model: &'a str, questions: &'a [Question]) -> Self {
        Self {
            persona,
            model,
            questions,
            history: ConversationHistory::default(),
            state: SessionState::NotStarted,
            next: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Injects the role-play framing. No-op unless `NotStarted`.
    pub fn start(&mut self) {
        if self.state != SessionState::NotStarted {
            return;
        }
        self.history.push(ChatMessage::system(format_system_prompt(self.persona)));
        self.state = if self.questions.is_empty() {
            SessionState::Completed
        } else {
            SessionState::InProgress
        };
    }

    /// Puts the next question into the history and returns it.
    /// `None` once the session is no longer `InProgress`.
    pub fn ask_next(&mut self) -> Option<Question> {
        if self.state != SessionState::InProgress {
            return None;
        }
        let question = self.questions.get(self.next)?.clone();
        self.history.push(ChatMessage::user(format_answer_prompt(&question.text)));
        self.state = SessionState::AwaitingAnswer;
        Some(question)
    }

    /// Appends the answer and produces the record for the pending question.
    pub fn record_answer(&mut self, answer: String) -> Result<Interaction, AppError> {
        if self.state != SessionState::AwaitingAnswer {
            return Err(AppError::Internal(anyhow::anyhow!(
                "answer recorded in state {:?}",
                self.state
            )));
        }
        let question = &self.questions[self.next];
        self.history.push(ChatMessage::assistant(answer.clone()));
        self.next += 1;
        self.state = if self.next == self.questions.len() {
            SessionState::Completed
        } else {
            SessionState::InProgress
        };

        Ok(Interaction {
            interaction_id: Uuid::new_v4(),
            persona_id: self.persona.id.clone(),
            model: self.model.to_string(),
            subject: question.subject,
            question_id: question.id.clone(),
            question_type: question.question_type,
            sequence: question.position,
            question: question.text.clone(),
            answer,
            created_at: Utc::now(),
        })
    }

    pub fn halt(&mut self) {
        if self.state != SessionState::Completed {
            self.state = SessionState::Halted;
        }
    }
}

#[derive(Debug)]
pub struct InterviewOutcome {
    pub persona_id: String,
    pub model: String,
    pub state: SessionState,
    /// Every record that reached the writer, in order.
    pub interactions: Vec<Interaction>,
    /// Set when the session halted; names the failing question.
    pub failed_question: Option<String>,
    pub error: Option<AppError>,
}

impl InterviewOutcome {
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }
}

pub struct InterviewEngine {
    llm: LlmClient,
    retry: RetryPolicy,
    settings: GenerationSettings,
}

impl InterviewEngine {
    pub fn new(llm: LlmClient, retry: RetryPolicy, settings: GenerationSettings) -> Self {
        Self {
            llm,
            retry,
            settings,
        }
    }

    /// Runs the whole battery for one (persona, model) pair, emitting each
    /// record to `writer` as soon as its answer arrives.
    pub async fn run_interview(
        &self,
        persona: &Persona,
        model: &str,
        questions: &[Question],
        pacer: &Pacer,
        writer: &mut dyn InteractionWriter,
    ) -> InterviewOutcome {
        let requested = self.settings.requested_params();
        let mut session = InterviewSession::new(persona, model, questions);
        let mut interactions = Vec::with_capacity(questions.len());
        session.start();

        info!(
            "Interviewing persona {} with {} ({} questions)",
            persona.id,
            model,
            questions.len()
        );

        while let Some(question) = session.ask_next() {
            let context = format!("persona {} / {} / {}", persona.id, model, question.id);
            let llm = &self.llm;
            let messages = session.history().messages();
            let requested = &requested;

            let answer = self
                .retry
                .run(&context, || async move {
                    let _call = pacer.wait().await;
                    llm.complete(messages, model, requested).await
                })
                .await;
            let answered = answer
                .and_then(|answer| session.record_answer(answer))
                .and_then(|interaction| {
                    writer.append(&interaction)?;
                    Ok(interaction)
                });

            match answered {
                Ok(interaction) => {
                    debug!(
                        "{}: answered {} ({}/{})",
                        context,
                        interaction.question_id,
                        interaction.sequence + 1,
                        questions.len()
                    );
                    interactions.push(interaction);
                }
                Err(e) => {
                    error!(
                        "Interview halted: persona={}, model={}, question={}: {}",
                        persona.id, model, question.id, e
                    );
                    session.halt();
                    return InterviewOutcome {
                        persona_id: persona.id.clone(),
                        model: model.to_string(),
                        state: session.state(),
                        interactions,
                        failed_question: Some(question.id),
                        error: Some(e),
                    };
                }
            }
        }

        info!(
            "Interview complete: persona {} with {} ({} records)",
            persona.id,
            model,
            interactions.len()
        );
        InterviewOutcome {
            persona_id: persona.id.clone(),
            model: model.to_string(),
            state: session.state(),
            interactions,
            failed_question: None,
            error: None,
        }
    }
}
