//! Email pipeline orchestrator.
//!
//! Each attempt runs analyze → sentiment → draft → justify → review and
//! starts again from the raw email. Justifiers see the email together with
//! the snippets the analyzer retrieved. Review feedback is not carried into
//! the next attempt. The run ends on the first approved draft, on an
//! external failure, or when the attempt budget is spent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::agent::{AgentOutput, AgentRole, EmailAgent};
use crate::config::PipelineConfig;
use crate::error::{AgentError, Result};
use crate::llm::LlmProvider;
use crate::pipeline::types::{
    MAX_ATTEMPTS_MESSAGE, PipelineOutcome, PipelineRun, ResponseBundle, ReviewVerdict, Stage, Tone,
};
use crate::retrieval::{CorpusKind, ReferenceCorpora, RetrievalHit, RetrievalResult};

/// An agent failure pinned to the stage it happened in.
struct StageFailure {
    stage: Stage,
    source: AgentError,
}

fn at(stage: Stage) -> impl FnOnce(AgentError) -> StageFailure {
    move |source| StageFailure { stage, source }
}

/// How one attempt ended short of an error.
enum AttemptResult {
    Approved(Box<ResponseBundle>),
    NeedsRevision { draft: String, verdict: ReviewVerdict },
}

/// Analyzer, drafters, reviewer and the informational agents, wired to
/// shared corpora.
pub struct EmailPipeline {
    config: PipelineConfig,
    agents: HashMap<AgentRole, EmailAgent>,
}

/// Builder for [`EmailPipeline`].
pub struct EmailPipelineBuilder {
    llm: Arc<dyn LlmProvider>,
    corpora: Arc<ReferenceCorpora>,
    config: PipelineConfig,
    overrides: HashMap<AgentRole, Arc<dyn LlmProvider>>,
}

impl EmailPipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a different generation provider for one role.
    pub fn provider_for(mut self, role: AgentRole, llm: Arc<dyn LlmProvider>) -> Self {
        self.overrides.insert(role, llm);
        self
    }

    pub fn build(self) -> Result<EmailPipeline> {
        self.config.validate()?;

        let mut agents = HashMap::with_capacity(AgentRole::ALL.len());
        for role in AgentRole::ALL {
            let llm = self
                .overrides
                .get(&role)
                .cloned()
                .unwrap_or_else(|| Arc::clone(&self.llm));
            let agent = EmailAgent::for_role(role, llm, &self.corpora)
                .with_retrieval(self.config.retrieval)
                .with_generation(self.config.generation);
            agents.insert(role, agent);
        }

        info!(
            max_attempts = self.config.max_attempts,
            top_k = self.config.retrieval.top_k,
            threshold = self.config.retrieval.threshold,
            "Email pipeline ready"
        );

        Ok(EmailPipeline {
            config: self.config,
            agents,
        })
    }
}

impl EmailPipeline {
    pub fn builder(llm: Arc<dyn LlmProvider>, corpora: Arc<ReferenceCorpora>) -> EmailPipelineBuilder {
        EmailPipelineBuilder {
            llm,
            corpora,
            config: PipelineConfig::default(),
            overrides: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline for one email.
    ///
    /// Never returns an error: external failures become
    /// [`PipelineOutcome::Error`] and an exhausted budget becomes
    /// [`PipelineOutcome::Failed`].
    pub async fn process_email(&self, content: &str, tone: Tone) -> PipelineOutcome {
        let mut run = PipelineRun::new(self.config.max_attempts);
        let span = info_span!("pipeline", run_id = %run.run_id, tone = %tone);

        async {
            info!(chars = content.len(), "Processing email");

            while run.begin_attempt() {
                debug!(attempt = run.attempt, "Starting attempt");

                match self.attempt(content, tone, &run).await {
                    Ok(AttemptResult::Approved(bundle)) => {
                        info!(attempt = run.attempt, "Draft approved");
                        return PipelineOutcome::Success(*bundle);
                    }
                    Ok(AttemptResult::NeedsRevision { draft, verdict }) => {
                        warn!(
                            attempt = run.attempt,
                            max_attempts = run.max_attempts,
                            "Draft needs revision"
                        );
                        run.record_review(draft, verdict);
                    }
                    Err(failure) => {
                        error!(
                            attempt = run.attempt,
                            stage = %failure.stage,
                            error = %failure.source,
                            "Pipeline stage failed"
                        );
                        return PipelineOutcome::Error {
                            stage: failure.stage,
                            attempt: run.attempt,
                            message: failure.source.to_string(),
                        };
                    }
                }
            }

            warn!(attempts = run.attempt, "Revision budget exhausted");
            let last_review = match run.latest_verdict.take() {
                Some(ReviewVerdict::NeedsRevision { feedback }) => Some(feedback),
                _ => None,
            };
            PipelineOutcome::Failed {
                message: MAX_ATTEMPTS_MESSAGE.to_string(),
                attempts: run.attempt,
                last_review,
            }
        }
        .instrument(span)
        .await
    }

    /// Process emails one after another, one outcome per email in order.
    ///
    /// A failed or errored email does not stop the batch.
    pub async fn process_batch<S: AsRef<str>>(&self, emails: &[S], tone: Tone) -> Vec<PipelineOutcome> {
        let count = emails.len();
        info!(count, "Processing email batch");

        let mut outcomes = Vec::with_capacity(count);
        for email in emails {
            outcomes.push(self.process_email(email.as_ref(), tone).await);
        }

        let approved = outcomes.iter().filter(|o| o.is_success()).count();
        info!(approved, total = count, "Batch processing complete");
        outcomes
    }

    fn agent(&self, role: AgentRole) -> std::result::Result<&EmailAgent, AgentError> {
        self.agents
            .get(&role)
            .ok_or_else(|| AgentError::UnknownRole(role.to_string()))
    }

    async fn attempt(
        &self,
        content: &str,
        tone: Tone,
        run: &PipelineRun,
    ) -> std::result::Result<AttemptResult, StageFailure> {
        let AgentOutput {
            text: analysis,
            policies,
            examples,
        } = self.run_agent(AgentRole::Analyzer, Stage::Analyze, content).await?;
        let (retrieved_policies, policy_hits) = render(policies, CorpusKind::Policies);
        let (retrieved_examples, example_hits) = render(examples, CorpusKind::Examples);

        let sentiment = if self.config.stages.sentiment {
            Some(self.run_agent(AgentRole::Sentiment, Stage::Sentiment, content).await?.text)
        } else {
            None
        };

        let drafter = match tone {
            Tone::Professional => AgentRole::Drafter,
            Tone::Casual => AgentRole::CasualDrafter,
        };
        let draft = self.run_agent(drafter, Stage::Draft, &analysis).await?.text;

        let (policy_justification, example_justification) = if self.config.stages.justifications {
            let policy_input = format!("Email: {content}\nPolicies: {retrieved_policies}");
            let policy = self
                .run_agent(AgentRole::PolicyJustifier, Stage::Justify, &policy_input)
                .await?;
            let example_input = format!("Email: {content}\nExamples: {retrieved_examples}");
            let example = self
                .run_agent(AgentRole::ExampleJustifier, Stage::Justify, &example_input)
                .await?;
            (Some(policy.text), Some(example.text))
        } else {
            (None, None)
        };

        let review = self.run_agent(AgentRole::Reviewer, Stage::Review, &draft).await?.text;

        let verdict = ReviewVerdict::classify(&review);
        if !verdict.is_approved() {
            return Ok(AttemptResult::NeedsRevision { draft, verdict });
        }

        Ok(AttemptResult::Approved(Box::new(ResponseBundle {
            run_id: run.run_id,
            attempts: run.attempt,
            tone,
            analysis,
            final_draft: draft,
            review,
            retrieved_policies,
            retrieved_examples,
            policy_hits,
            example_hits,
            policy_justification,
            example_justification,
            sentiment,
            completed_at: Utc::now(),
        })))
    }

    async fn run_agent(
        &self,
        role: AgentRole,
        stage: Stage,
        content: &str,
    ) -> std::result::Result<AgentOutput, StageFailure> {
        let agent = self.agent(role).map_err(at(stage))?;
        agent.run(content).await.map_err(at(stage))
    }
}

fn render(result: Option<RetrievalResult>, kind: CorpusKind) -> (String, Vec<RetrievalHit>) {
    match result {
        Some(result) => (result.to_prompt_text(), result.hits().to_vec()),
        None => (kind.sentinel().to_string(), Vec::new()),
    }
}
