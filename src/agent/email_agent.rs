//! A single role-bound generation step.

use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use super::role::{AgentRole, PromptContext};
use crate::config::{GenerationConfig, RetrievalConfig};
use crate::error::AgentError;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::retrieval::{CorpusKind, ReferenceCorpora, RetrievalResult, SimilarityIndex};

/// Everything an agent produced for one input.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    /// Raw model output, untouched.
    pub text: String,
    pub policies: Option<RetrievalResult>,
    pub examples: Option<RetrievalResult>,
}

/// Role + generation handle + the corpora its template reads.
pub struct EmailAgent {
    role: AgentRole,
    llm: Arc<dyn LlmProvider>,
    policies: Option<Arc<SimilarityIndex>>,
    examples: Option<Arc<SimilarityIndex>>,
    retrieval: RetrievalConfig,
    generation: GenerationConfig,
}

impl EmailAgent {
    /// Create an agent from explicit corpus handles.
    ///
    /// Rejects a role whose template reads a corpus that was not supplied.
    /// Handles the role does not read are dropped.
    pub fn new(
        role: AgentRole,
        llm: Arc<dyn LlmProvider>,
        policies: Option<Arc<SimilarityIndex>>,
        examples: Option<Arc<SimilarityIndex>>,
    ) -> Result<Self, AgentError> {
        let require = |index: Option<Arc<SimilarityIndex>>, wanted: bool, kind: CorpusKind| {
            match (wanted, index) {
                (false, _) => Ok(None),
                (true, Some(index)) => Ok(Some(index)),
                (true, None) => Err(AgentError::MissingCorpus {
                    role: role.to_string(),
                    corpus: kind.name().to_string(),
                }),
            }
        };

        Ok(Self::assemble(
            role,
            llm,
            require(policies, role.uses_policies(), CorpusKind::Policies)?,
            require(examples, role.uses_examples(), CorpusKind::Examples)?,
        ))
    }

    /// Create an agent wired to exactly the corpora its role reads.
    pub fn for_role(
        role: AgentRole,
        llm: Arc<dyn LlmProvider>,
        corpora: &ReferenceCorpora,
    ) -> Self {
        let policies = role
            .uses_policies()
            .then(|| Arc::clone(corpora.policies()));
        let examples = role
            .uses_examples()
            .then(|| Arc::clone(corpora.examples()));
        Self::assemble(role, llm, policies, examples)
    }

    fn assemble(
        role: AgentRole,
        llm: Arc<dyn LlmProvider>,
        policies: Option<Arc<SimilarityIndex>>,
        examples: Option<Arc<SimilarityIndex>>,
    ) -> Self {
        Self {
            role,
            llm,
            policies,
            examples,
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    fn index(&self, kind: CorpusKind) -> Option<&Arc<SimilarityIndex>> {
        match kind {
            CorpusKind::Policies => self.policies.as_ref(),
            CorpusKind::Examples => self.examples.as_ref(),
        }
    }

    /// Run the role on `content` and return the model's text verbatim.
    pub async fn process(&self, content: &str) -> Result<String, AgentError> {
        self.run(content).await.map(|output| output.text)
    }

    /// Like [`EmailAgent::process`], also returning what was retrieved.
    ///
    /// One retrieval per corpus the role reads, then one completion call.
    /// Failures are not retried.
    pub async fn run(&self, content: &str) -> Result<AgentOutput, AgentError> {
        let span = info_span!("agent", role = %self.role);
        async {
            let policies = self.retrieve(CorpusKind::Policies, content).await?;
            let examples = self.retrieve(CorpusKind::Examples, content).await?;

            let context = PromptContext {
                policies: policies.as_ref().map(RetrievalResult::to_prompt_text),
                examples: examples.as_ref().map(RetrievalResult::to_prompt_text),
            };
            let prompt = self.role.build_prompt(content, &context);

            let mut request =
                CompletionRequest::prompt(prompt).with_max_tokens(self.generation.max_tokens);
            if let Some(temperature) = self.generation.temperature {
                request = request.with_temperature(temperature);
            }

            let response =
                self.llm
                    .complete(request)
                    .await
                    .map_err(|source| AgentError::Generation {
                        role: self.role.to_string(),
                        source,
                    })?;

            debug!(
                model = self.llm.model_name(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                "Agent completed"
            );

            Ok(AgentOutput {
                text: response.content,
                policies,
                examples,
            })
        }
        .instrument(span)
        .await
    }

    async fn retrieve(
        &self,
        kind: CorpusKind,
        content: &str,
    ) -> Result<Option<RetrievalResult>, AgentError> {
        let wanted = match kind {
            CorpusKind::Policies => self.role.uses_policies(),
            CorpusKind::Examples => self.role.uses_examples(),
        };
        if !wanted {
            return Ok(None);
        }

        let index = self.index(kind).ok_or_else(|| AgentError::MissingCorpus {
            role: self.role.to_string(),
            corpus: kind.name().to_string(),
        })?;

        let result = index
            .retrieve(content, self.retrieval.top_k, self.retrieval.threshold)
            .await
            .map_err(|source| AgentError::Retrieval {
                role: self.role.to_string(),
                source,
            })?;
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::embeddings::{EmbeddingProvider, HashingEmbedder};
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, FinishReason, Role};
    use crate::retrieval::{EXAMPLE_SENTINEL, POLICY_SENTINEL};

    /// Records every request and answers with a fixed reply.
    struct RecordingLlm {
        reply: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl RecordingLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.messages[0].content.clone())
                .collect()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            Ok(CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 10,
                output_tokens: 5,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "failing".into(),
                reason: "quota exceeded".into(),
            })
        }
    }

    async fn corpora() -> ReferenceCorpora {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(512));
        ReferenceCorpora::build(
            [("refill", "Prescription refills require 48-hour notice.")],
            [("refund", "The product I received is damaged. I want my money back.")],
            embedder,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn returns_model_text_verbatim() {
        let llm = RecordingLlm::new("  Raw output, NOT trimmed \n");
        let agent = EmailAgent::for_role(AgentRole::Sentiment, llm.clone(), &corpora().await);
        let text = agent.process("I am upset").await.unwrap();
        assert_eq!(text, "  Raw output, NOT trimmed \n");
    }

    #[tokio::test]
    async fn single_user_prompt_with_token_cap() {
        let llm = RecordingLlm::new("ok");
        let agent = EmailAgent::for_role(AgentRole::Analyzer, llm.clone(), &corpora().await)
            .with_generation(GenerationConfig {
                max_tokens: 99,
                temperature: Some(0.2),
            });
        agent.process("hello").await.unwrap();

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::User);
        assert_eq!(requests[0].max_tokens, Some(99));
        assert_eq!(requests[0].temperature, Some(0.2));
    }

    #[tokio::test]
    async fn relevant_snippets_interpolated() {
        let llm = RecordingLlm::new("ok");
        let agent = EmailAgent::for_role(AgentRole::Analyzer, llm.clone(), &corpora().await);
        let output = agent
            .run("My order arrived broken and I want a refund")
            .await
            .unwrap();

        let examples = output.examples.unwrap();
        assert_eq!(examples.labels(), vec!["refund"]);
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("I want my money back"));
        assert!(prompt.contains(POLICY_SENTINEL));
    }

    #[tokio::test]
    async fn unused_corpora_not_queried() {
        let llm = RecordingLlm::new("ok");
        let corpora = corpora().await;

        let output = EmailAgent::for_role(AgentRole::Sentiment, llm.clone(), &corpora)
            .run("refund please")
            .await
            .unwrap();
        assert!(output.policies.is_none());
        assert!(output.examples.is_none());

        let output = EmailAgent::for_role(AgentRole::CasualDrafter, llm.clone(), &corpora)
            .run("refund please")
            .await
            .unwrap();
        assert!(output.policies.is_none());
        assert!(output.examples.is_some());
    }

    #[tokio::test]
    async fn sentinel_when_nothing_relevant() {
        let llm = RecordingLlm::new("ok");
        let agent = EmailAgent::for_role(AgentRole::ExampleJustifier, llm.clone(), &corpora().await);
        agent.process("zebra quantum violin").await.unwrap();
        assert!(llm.prompts()[0].contains(EXAMPLE_SENTINEL));
    }

    #[tokio::test]
    async fn missing_corpus_rejected_at_construction() {
        let llm = RecordingLlm::new("ok");
        let corpora = corpora().await;

        let result = EmailAgent::new(
            AgentRole::Reviewer,
            llm.clone(),
            None,
            Some(Arc::clone(corpora.examples())),
        );
        assert!(matches!(
            result,
            Err(AgentError::MissingCorpus { ref role, ref corpus }) if role == "reviewer" && corpus == "policies"
        ));

        let result = EmailAgent::new(AgentRole::ExampleJustifier, llm.clone(), None, None);
        assert!(matches!(
            result,
            Err(AgentError::MissingCorpus { ref corpus, .. }) if corpus == "examples"
        ));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn explicit_constructor_accepts_what_the_role_needs() {
        let llm = RecordingLlm::new("ok");
        let corpora = corpora().await;

        let agent = EmailAgent::new(AgentRole::Sentiment, llm.clone(), None, None).unwrap();
        assert_eq!(agent.process("hi").await.unwrap(), "ok");

        // Extra handles are ignored, so the casual drafter never touches policies.
        let agent = EmailAgent::new(
            AgentRole::CasualDrafter,
            llm.clone(),
            Some(Arc::clone(corpora.policies())),
            Some(Arc::clone(corpora.examples())),
        )
        .unwrap();
        let output = agent.run("refund please").await.unwrap();
        assert!(output.policies.is_none());
        assert!(output.examples.is_some());
    }

    #[tokio::test]
    async fn generation_failure_tagged_with_role() {
        let agent = EmailAgent::for_role(AgentRole::Drafter, Arc::new(FailingLlm), &corpora().await);
        let err = agent.process("analysis").await.unwrap_err();
        match err {
            AgentError::Generation { role, source } => {
                assert_eq!(role, "drafter");
                assert!(source.to_string().contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
