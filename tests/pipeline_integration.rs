//! End-to-end pipeline runs against scripted providers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use reply_assist::agent::AgentRole;
use reply_assist::config::PipelineConfig;
use reply_assist::embeddings::{EmbeddingProvider, HashingEmbedder};
use reply_assist::error::{EmbeddingError, LlmError};
use reply_assist::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use reply_assist::pipeline::{EmailPipeline, MAX_ATTEMPTS_MESSAGE, PipelineOutcome, Stage, Tone};
use reply_assist::retrieval::ReferenceCorpora;

const EMAIL: &str = "Can I get a copy of my lab results from last week?";

/// Replies from a script, then repeats `fallback`. Records every prompt.
struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn always(reply: &str) -> Arc<Self> {
        Self::scripted(Vec::new(), reply)
    }

    fn scripted(script: Vec<Result<&str, &str>>, fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            fallback: fallback.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(reason: &str) -> Arc<Self> {
        Self::scripted(vec![Err(reason)], "unreachable")
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));

        match next {
            Ok(content) => Ok(CompletionResponse {
                content,
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Stop,
            }),
            Err(reason) => Err(LlmError::RequestFailed {
                provider: "scripted".into(),
                reason,
            }),
        }
    }
}

/// Hashing embedder that refuses texts containing "OUTAGE".
struct OutageEmbedder(HashingEmbedder);

#[async_trait]
impl EmbeddingProvider for OutageEmbedder {
    fn name(&self) -> &str {
        "outage"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains("OUTAGE") {
            return Err(EmbeddingError::RequestFailed {
                provider: "outage".into(),
                reason: "service unavailable".into(),
            });
        }
        self.0.embed(text).await
    }
}

async fn corpora() -> Arc<ReferenceCorpora> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(512));
    Arc::new(ReferenceCorpora::builtin(embedder).await.unwrap())
}

struct Harness {
    analyzer: Arc<ScriptedLlm>,
    drafter: Arc<ScriptedLlm>,
    casual_drafter: Arc<ScriptedLlm>,
    reviewer: Arc<ScriptedLlm>,
    rest: Arc<ScriptedLlm>,
    pipeline: EmailPipeline,
}

async fn harness(reviewer: Arc<ScriptedLlm>, drafter: Arc<ScriptedLlm>) -> Harness {
    let analyzer = ScriptedLlm::always("ANALYSIS: patient wants lab results");
    let casual_drafter = ScriptedLlm::always("Hey! Sure thing.");
    let rest = ScriptedLlm::always("informational");

    let pipeline = EmailPipeline::builder(rest.clone(), corpora().await)
        .provider_for(AgentRole::Analyzer, analyzer.clone())
        .provider_for(AgentRole::Drafter, drafter.clone())
        .provider_for(AgentRole::CasualDrafter, casual_drafter.clone())
        .provider_for(AgentRole::Reviewer, reviewer.clone())
        .build()
        .unwrap();

    Harness {
        analyzer,
        drafter,
        casual_drafter,
        reviewer,
        rest,
        pipeline,
    }
}

#[tokio::test]
async fn approved_review_succeeds_after_one_attempt() {
    let h = harness(
        ScriptedLlm::always("APPROVED"),
        ScriptedLlm::always("Dear patient, ..."),
    )
    .await;

    let outcome = h.pipeline.process_email(EMAIL, Tone::Professional).await;

    let bundle = outcome.bundle().expect("success");
    assert_eq!(bundle.attempts, 1);
    assert_eq!(bundle.analysis, "ANALYSIS: patient wants lab results");
    assert_eq!(bundle.final_draft, "Dear patient, ...");
    assert_eq!(bundle.review, "APPROVED");
    assert_eq!(bundle.sentiment.as_deref(), Some("informational"));
    assert_eq!(bundle.policy_justification.as_deref(), Some("informational"));
    assert_eq!(bundle.example_justification.as_deref(), Some("informational"));
    assert_eq!(h.analyzer.calls(), 1);
    assert_eq!(h.reviewer.calls(), 1);
    // sentiment + two justifiers
    assert_eq!(h.rest.calls(), 3);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["final_draft"], "Dear patient, ...");
}

#[tokio::test]
async fn never_approved_fails_after_three_attempts() {
    let h = harness(
        ScriptedLlm::always("NEEDS_REVISION: missing next steps"),
        ScriptedLlm::always("draft"),
    )
    .await;

    let outcome = h.pipeline.process_email(EMAIL, Tone::Professional).await;

    match outcome {
        PipelineOutcome::Failed {
            message, attempts, ..
        } => {
            assert_eq!(message, "maximum revision attempts reached");
            assert_eq!(message, MAX_ATTEMPTS_MESSAGE);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(h.analyzer.calls(), 3);
    assert_eq!(h.drafter.calls(), 3);
    assert_eq!(h.reviewer.calls(), 3);
}

#[tokio::test]
async fn drafter_receives_analysis_not_email() {
    let h = harness(ScriptedLlm::always("APPROVED"), ScriptedLlm::always("draft")).await;

    h.pipeline.process_email(EMAIL, Tone::Professional).await;

    let prompts = h.drafter.prompts();
    assert_eq!(prompts.len(), 1);
    let (_, content) = prompts[0]
        .rsplit_once("Based on this analysis: ")
        .expect("drafter prompt carries its content last");
    assert_eq!(content, "ANALYSIS: patient wants lab results");
    assert!(!prompts[0].contains(EMAIL));

    // The reviewer sees the draft.
    assert!(h.reviewer.prompts()[0].ends_with("Evaluate this draft response: draft"));
}

#[tokio::test]
async fn every_attempt_restarts_from_raw_email() {
    let reviewer = ScriptedLlm::scripted(
        vec![Ok("NEEDS_REVISION: warmer tone please")],
        "APPROVED",
    );
    let h = harness(reviewer, ScriptedLlm::always("draft")).await;

    let outcome = h.pipeline.process_email(EMAIL, Tone::Professional).await;

    assert_eq!(outcome.bundle().expect("success").attempts, 2);
    let prompts = h.analyzer.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
    assert!(prompts[1].ends_with(&format!("Email: {EMAIL}")));
    assert!(!prompts[1].contains("warmer tone"));
}

#[tokio::test]
async fn sentiment_reads_the_raw_email() {
    let sentiment = ScriptedLlm::always("neutral");
    let pipeline = EmailPipeline::builder(ScriptedLlm::always("APPROVED"), corpora().await)
        .provider_for(AgentRole::Analyzer, ScriptedLlm::always("ANALYSIS: lab results"))
        .provider_for(AgentRole::Sentiment, sentiment.clone())
        .build()
        .unwrap();

    let outcome = pipeline.process_email(EMAIL, Tone::Professional).await;

    assert_eq!(outcome.bundle().expect("success").sentiment.as_deref(), Some("neutral"));
    let prompts = sentiment.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with(&format!("Email: {EMAIL}")));
    assert!(!prompts[0].contains("ANALYSIS"));
}

#[tokio::test]
async fn justifiers_see_email_with_retrieved_snippets() {
    let email = "Running low on my blood pressure medication. Need a refill.";
    let policy_justifier = ScriptedLlm::always("policy reasons");
    let example_justifier = ScriptedLlm::always("example reasons");
    let pipeline = EmailPipeline::builder(ScriptedLlm::always("APPROVED"), corpora().await)
        .provider_for(AgentRole::PolicyJustifier, policy_justifier.clone())
        .provider_for(AgentRole::ExampleJustifier, example_justifier.clone())
        .build()
        .unwrap();

    let outcome = pipeline.process_email(email, Tone::Professional).await;
    let bundle = outcome.bundle().expect("success");
    assert_eq!(bundle.retrieved_policies, "No relevant policy found.");
    assert!(bundle.retrieved_examples.contains("Running low on my meds"));
    assert_eq!(bundle.policy_justification.as_deref(), Some("policy reasons"));
    assert_eq!(bundle.example_justification.as_deref(), Some("example reasons"));

    let prompts = policy_justifier.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&format!(
        "Email content: Email: {email}\nPolicies: No relevant policy found.\nSelected policies: "
    )));

    let prompts = example_justifier.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&format!(
        "Email content: Email: {email}\nExamples: {}\nSelected examples: ",
        bundle.retrieved_examples
    )));
}

#[tokio::test]
async fn casual_tone_uses_casual_drafter() {
    let h = harness(ScriptedLlm::always("APPROVED"), ScriptedLlm::always("draft")).await;

    let outcome = h.pipeline.process_email(EMAIL, Tone::Casual).await;

    let bundle = outcome.bundle().expect("success");
    assert_eq!(bundle.final_draft, "Hey! Sure thing.");
    assert_eq!(bundle.tone, Tone::Casual);
    assert_eq!(h.casual_drafter.calls(), 1);
    assert_eq!(h.drafter.calls(), 0);
}

#[tokio::test]
async fn generation_failure_is_structured_and_not_retried() {
    let h = harness(
        ScriptedLlm::always("APPROVED"),
        ScriptedLlm::failing("quota exceeded"),
    )
    .await;

    let outcome = h.pipeline.process_email(EMAIL, Tone::Professional).await;

    match outcome {
        PipelineOutcome::Error {
            stage,
            attempt,
            message,
        } => {
            assert_eq!(stage, Stage::Draft);
            assert_eq!(attempt, 1);
            assert!(message.contains("drafter"));
            assert!(message.contains("quota exceeded"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(h.analyzer.calls(), 1);
    assert_eq!(h.drafter.calls(), 1);
    assert_eq!(h.reviewer.calls(), 0);
}

#[tokio::test]
async fn embedding_failure_stops_at_analysis() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OutageEmbedder(HashingEmbedder::new(512)));
    let corpora = Arc::new(ReferenceCorpora::builtin(embedder).await.unwrap());
    let llm = ScriptedLlm::always("APPROVED");
    let pipeline = EmailPipeline::builder(llm.clone(), corpora).build().unwrap();

    let outcome = pipeline
        .process_email("OUTAGE while booking", Tone::Professional)
        .await;

    match outcome {
        PipelineOutcome::Error { stage, message, .. } => {
            assert_eq!(stage, Stage::Analyze);
            assert!(message.contains("retrieval failed"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn batch_keeps_input_order_past_failures() {
    let reviewer = ScriptedLlm::scripted(
        vec![
            Ok("APPROVED"),
            Ok("NEEDS_REVISION"),
            Ok("NEEDS_REVISION"),
            Ok("NEEDS_REVISION"),
        ],
        "APPROVED",
    );
    let h = harness(reviewer, ScriptedLlm::always("draft")).await;

    let emails = ["first", "second", "third"];
    let outcomes = h.pipeline.process_batch(&emails, Tone::Professional).await;

    let statuses: Vec<&str> = outcomes.iter().map(PipelineOutcome::status).collect();
    assert_eq!(statuses, vec!["success", "failed", "success"]);
}

#[tokio::test]
async fn single_attempt_budget() {
    let llm = ScriptedLlm::always("NEEDS_REVISION");
    let config = PipelineConfig {
        max_attempts: 1,
        ..Default::default()
    };
    let pipeline = EmailPipeline::builder(llm.clone(), corpora().await)
        .config(config)
        .build()
        .unwrap();

    let outcome = pipeline.process_email(EMAIL, Tone::Professional).await;
    assert!(matches!(outcome, PipelineOutcome::Failed { attempts: 1, .. }));
}
