//! AiGateway - the single entry point for model calls.
//!
//! Three request shapes:
//! - structured: JSON constrained by a [`Schema`], validated, then typed
//! - streaming: mentor replies as a [`FragmentStream`]
//! - binary: speech and images as decoded [`MediaPayload`]s
//!
//! Calls are independent and never retried.

use base64::Engine;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

use compass_model::{
    ChatMessage, ChatRole, LearningPath, MindMapNode, PathBlueprint, PracticeQuestion,
    ProjectIdea, SimplifiedMaterial, StudentProfile, StudyNotes,
};

use crate::backend::traits::{
    Content, ContentRequest, ContentResponse, ContentRole, GenerativeBackend, ImageInput,
    OutputMode, Part,
};
use crate::config::GatewayConfig;
use crate::contracts::{self, ExamEnvelope, IdeasEnvelope};
use crate::error::GenerationError;
use crate::prompt::PromptAssembler;
use crate::schema::Schema;
use crate::stream::FragmentStream;

/// Aspect ratios the image model accepts.
pub const ASPECT_RATIOS: [&str; 8] = ["1:1", "16:9", "9:16", "4:3", "3:4", "2:3", "3:2", "21:9"];

/// Decoded binary output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaPayload {
    /// `data:` URL for embedding in a page.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Gateway over a generative backend.
#[derive(Clone)]
pub struct AiGateway {
    backend: Arc<dyn GenerativeBackend>,
    config: GatewayConfig,
}

impl AiGateway {
    pub fn new(backend: Arc<dyn GenerativeBackend>, config: GatewayConfig) -> Self {
        Self { backend, config }
    }

    /// Gateway over the Gemini API described by `config`.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GenerationError> {
        let backend = config.build_backend()?;
        info!(base_url = %config.base_url, "AI gateway ready");
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    /// Request JSON constrained by `schema` and build `T` from it.
    ///
    /// Empty text, invalid JSON, a schema violation or a value `T` cannot be
    /// built from are all [`GenerationError::MalformedResponse`].
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        model: &str,
        instruction: impl Into<String>,
        schema: &Schema,
    ) -> Result<T, GenerationError> {
        let request = ContentRequest::user(model, instruction).with_json_schema(schema.to_wire());

        let response = self.backend.generate(request).await.map_err(|e| {
            warn!(model, error = %e, "Structured generation failed");
            GenerationError::from(e)
        })?;

        parse_structured(&response.text, schema)
    }

    /// Generate a roadmap for `subject` and turn it into a fresh path.
    ///
    /// The first milestone is `current`, the rest `locked`; the stage is a
    /// snapshot of the profile's stage.
    pub async fn generate_learning_path(
        &self,
        subject: &str,
        profile: &StudentProfile,
    ) -> Result<LearningPath, GenerationError> {
        let mut blueprint: PathBlueprint = self
            .generate_structured(
                &self.config.models.structured,
                PromptAssembler::learning_path(subject, profile),
                &contracts::learning_path(),
            )
            .await?;
        blueprint.validate()?;
        if blueprint.subject.trim().is_empty() {
            blueprint.subject = subject.to_string();
        }

        let path = LearningPath::from_blueprint(LearningPath::new_id(), blueprint, profile.stage);
        info!(
            path_id = %path.id,
            subject = %path.subject,
            milestones = path.milestones.len(),
            "Learning path generated"
        );
        Ok(path)
    }

    pub async fn generate_mind_map(&self, topic: &str) -> Result<MindMapNode, GenerationError> {
        let map: MindMapNode = self
            .generate_structured(
                &self.config.models.structured,
                PromptAssembler::mind_map(topic),
                &contracts::mind_map(),
            )
            .await?;
        debug!(topic, nodes = map.node_count(), "Mind map generated");
        Ok(map)
    }

    /// Multiple-choice exam. A `correctAnswer` outside its options is
    /// malformed.
    pub async fn generate_practice_exam(
        &self,
        topic: &str,
    ) -> Result<Vec<PracticeQuestion>, GenerationError> {
        let exam: ExamEnvelope = self
            .generate_structured(
                &self.config.models.structured,
                PromptAssembler::practice_exam(topic),
                &contracts::practice_exam(),
            )
            .await?;

        if let Some((i, q)) = exam
            .questions
            .iter()
            .enumerate()
            .find(|(_, q)| !q.is_well_formed())
        {
            return Err(GenerationError::MalformedResponse(format!(
                "question {i}: correctAnswer {} is out of range for {} options",
                q.correct_answer,
                q.options.len()
            )));
        }

        debug!(topic, questions = exam.questions.len(), "Practice exam generated");
        Ok(exam.questions)
    }

    pub async fn generate_notes(
        &self,
        topic: &str,
        profile: &StudentProfile,
    ) -> Result<StudyNotes, GenerationError> {
        self.generate_structured(
            &self.config.models.structured,
            PromptAssembler::notes(topic, profile),
            &contracts::study_notes(),
        )
        .await
    }

    pub async fn simplify_material(
        &self,
        topic: &str,
        profile: &StudentProfile,
    ) -> Result<SimplifiedMaterial, GenerationError> {
        self.generate_structured(
            &self.config.models.structured,
            PromptAssembler::simplified_material(topic, profile),
            &contracts::simplified_material(),
        )
        .await
    }

    pub async fn generate_project_ideas(
        &self,
        profile: &StudentProfile,
        subject: &str,
    ) -> Result<Vec<ProjectIdea>, GenerationError> {
        let ideas: IdeasEnvelope = self
            .generate_structured(
                &self.config.models.structured,
                PromptAssembler::project_ideas(profile, subject),
                &contracts::project_ideas(),
            )
            .await?;
        Ok(ideas.ideas)
    }

    /// Stream the mentor's reply to `message`.
    ///
    /// `history` is the conversation so far, oldest first. Leading model
    /// turns (the greeting) are not sent, since a conversation must open
    /// with the student. Deep reasoning switches to the reasoning model with
    /// a thinking budget.
    pub async fn mentor_reply(
        &self,
        profile: &StudentProfile,
        history: &[ChatMessage],
        message: &str,
        image: Option<ImageInput>,
        deep_reasoning: bool,
    ) -> Result<FragmentStream, GenerationError> {
        let models = &self.config.models;
        let model = if deep_reasoning {
            &models.reasoning
        } else {
            &models.chat
        };

        let mut request = ContentRequest {
            model: model.clone(),
            system_instruction: Some(PromptAssembler::mentor_system(profile)),
            ..Default::default()
        };

        for turn in history.iter().skip_while(|m| m.role == ChatRole::Model) {
            let role = match turn.role {
                ChatRole::User => ContentRole::User,
                ChatRole::Model => ContentRole::Model,
            };
            request.contents.push(Content {
                role,
                parts: vec![Part::Text(turn.content.clone())],
            });
        }

        let mut turn = Content::user_text(message);
        if let Some(image) = image {
            turn = turn.with_image(image);
        }
        request.contents.push(turn);

        if deep_reasoning {
            request.thinking_budget = Some(self.config.thinking_budget);
        }

        info!(
            model = %request.model,
            turns = request.contents.len(),
            deep_reasoning,
            "Mentor reply requested"
        );
        self.backend.generate_stream(request).await.map_err(|e| {
            warn!(error = %e, "Mentor stream failed to start");
            GenerationError::from(e)
        })
    }

    /// Speak `text` in the configured voice.
    pub async fn synthesize_speech(&self, text: &str) -> Result<MediaPayload, GenerationError> {
        if text.trim().is_empty() {
            return Err(GenerationError::Failed("Nothing to synthesize".to_string()));
        }

        let request = ContentRequest::user(&self.config.models.speech, PromptAssembler::speech(text))
            .with_output(OutputMode::Audio {
                voice: self.config.voice.clone(),
            });

        let response = self.backend.generate(request).await?;
        let payload = decode_media(response)?;
        info!(mime_type = %payload.mime_type, bytes = payload.bytes.len(), "Speech synthesized");
        Ok(payload)
    }

    /// Illustrate `prompt` at one of [`ASPECT_RATIOS`].
    pub async fn generate_vision_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
    ) -> Result<MediaPayload, GenerationError> {
        if !ASPECT_RATIOS.contains(&aspect_ratio) {
            return Err(GenerationError::Failed(format!(
                "Unsupported aspect ratio {aspect_ratio}"
            )));
        }
        if prompt.trim().is_empty() {
            return Err(GenerationError::Failed("Image prompt is empty".to_string()));
        }

        let request =
            ContentRequest::user(&self.config.models.image, PromptAssembler::vision_image(prompt))
                .with_output(OutputMode::Image {
                    aspect_ratio: Some(aspect_ratio.to_string()),
                });

        let response = self.backend.generate(request).await?;
        let payload = decode_media(response)?;
        info!(
            aspect_ratio,
            mime_type = %payload.mime_type,
            bytes = payload.bytes.len(),
            "Image generated"
        );
        Ok(payload)
    }
}

impl std::fmt::Debug for AiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGateway")
            .field("backend", &self.backend.id())
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

/// Parse, validate and type a structured reply.
fn parse_structured<T: DeserializeOwned>(text: &str, schema: &Schema) -> Result<T, GenerationError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(GenerationError::malformed("empty response"));
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| GenerationError::malformed(format!("invalid JSON: {e}")))?;
    schema.validate(&value)?;
    serde_json::from_value(value)
        .map_err(|e| GenerationError::malformed(format!("unexpected shape: {e}")))
}

/// Models occasionally wrap JSON in a markdown fence despite the MIME type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Decode the first inline payload exactly once.
fn decode_media(response: ContentResponse) -> Result<MediaPayload, GenerationError> {
    let inline = response
        .inline_data
        .into_iter()
        .find(|p| !p.data.is_empty())
        .ok_or_else(|| GenerationError::malformed("response carried no media payload"))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(inline.data.trim())
        .map_err(|e| GenerationError::malformed(format!("invalid base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(GenerationError::malformed("media payload is empty"));
    }

    Ok(MediaPayload {
        mime_type: inline.mime_type,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::BackendError;
    use crate::backend::MockBackend;
    use compass_model::{MilestoneStatus, SkillLevel, StudentStage};
    use futures::StreamExt;
    use serde::Deserialize;
    use serde_json::json;

    fn profile() -> StudentProfile {
        StudentProfile {
            user_id: "user_q1w2e3r4t".to_string(),
            name: "Linus Pauling".to_string(),
            email: "linus.pauling@compass.ai".to_string(),
            stage: StudentStage::Junior,
            skill_level: SkillLevel::Beginner,
            primary_goal: "Data engineer".to_string(),
        }
    }

    fn gateway(backend: MockBackend) -> (AiGateway, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (
            AiGateway::new(backend.clone(), GatewayConfig::new("test-key")),
            backend,
        )
    }

    fn roadmap(count: usize) -> serde_json::Value {
        let milestones: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "id": format!("m{i}"),
                    "title": format!("Step {i}"),
                    "description": "Do the thing",
                    "practicalActions": ["Practice"]
                })
            })
            .collect();
        json!({"subject": "SQL", "goal": "Data engineer", "milestones": milestones})
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        a: String,
        b: i64,
    }

    fn pair_schema() -> Schema {
        Schema::object()
            .required("a", Schema::string())
            .required("b", Schema::integer())
    }

    #[tokio::test]
    async fn test_structured_missing_field_is_malformed() {
        let (gw, _) = gateway(MockBackend::default().then_json(json!({"a": "x"})));
        let err = gw
            .generate_structured::<Pair>("m", "give me a pair", &pair_schema())
            .await
            .unwrap_err();
        match err {
            GenerationError::MalformedResponse(msg) => assert!(msg.contains("\"b\""), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_structured_success_and_request_shape() {
        let (gw, backend) = gateway(MockBackend::default().then_text(
            "```json\n{\"a\": \"x\", \"b\": 2}\n```",
        ));
        let pair: Pair = gw
            .generate_structured("model-x", "give me a pair", &pair_schema())
            .await
            .unwrap();
        assert_eq!(pair, Pair { a: "x".to_string(), b: 2 });

        let request = backend.last_request().unwrap();
        assert_eq!(request.model, "model-x");
        match request.output {
            OutputMode::Json { schema: Some(schema) } => assert_eq!(schema["type"], "OBJECT"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_structured_empty_and_invalid() {
        let (gw, _) = gateway(MockBackend::default().then_text("  ").then_text("{oops"));
        for _ in 0..2 {
            assert!(matches!(
                gw.generate_structured::<Pair>("m", "x", &pair_schema()).await,
                Err(GenerationError::MalformedResponse(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_learning_path_statuses() {
        let (gw, backend) = gateway(MockBackend::default().then_json(roadmap(5)));
        let path = gw.generate_learning_path("SQL", &profile()).await.unwrap();

        assert!(path.id.starts_with("path_"));
        assert_eq!(path.stage, StudentStage::Junior);
        let statuses: Vec<_> = path.milestones.iter().map(|m| m.status).collect();
        assert_eq!(statuses[0], MilestoneStatus::Current);
        assert!(statuses[1..].iter().all(|s| *s == MilestoneStatus::Locked));
        assert_eq!(
            backend.last_request().unwrap().model,
            GatewayConfig::default().models.structured
        );
    }

    #[tokio::test]
    async fn test_learning_path_duplicate_ids_rejected() {
        let mut reply = roadmap(3);
        reply["milestones"][2]["id"] = json!("m0");
        let (gw, _) = gateway(MockBackend::default().then_json(reply));
        assert!(matches!(
            gw.generate_learning_path("SQL", &profile()).await,
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_exam_answer_out_of_range() {
        let (gw, _) = gateway(MockBackend::default().then_json(json!({"questions": [{
            "question": "Pick one", "options": ["a", "b"], "correctAnswer": 2,
            "explanation": "none"
        }]})));
        match gw.generate_practice_exam("Joins").await.unwrap_err() {
            GenerationError::MalformedResponse(msg) => assert!(msg.contains("out of range")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_category() {
        let (gw, _) = gateway(MockBackend::default().then_error(BackendError::RateLimited {
            retry_after_ms: Some(3000),
        }));
        let err = gw.generate_mind_map("Indexes").await.unwrap_err();
        assert_eq!(err.category(), crate::error::FailureCategory::RateLimited);
    }

    #[tokio::test]
    async fn test_mentor_reply_request() {
        let (gw, backend) = gateway(MockBackend::default().then_fragments(["Start ", "with joins."]));
        let history = vec![
            ChatMessage::model("Hi Linus!"),
            ChatMessage::user("What first?"),
            ChatMessage::model("SELECT basics."),
        ];

        let mut stream = gw
            .mentor_reply(
                &profile(),
                &history,
                "And then?",
                Some(ImageInput::new("image/png", vec![9])),
                true,
            )
            .await
            .unwrap();
        while let Some(fragment) = stream.next().await {
            fragment.unwrap();
        }
        assert_eq!(stream.accumulated(), "Start with joins.");

        let request = backend.last_request().unwrap();
        assert_eq!(request.model, GatewayConfig::default().models.reasoning);
        assert_eq!(request.thinking_budget, Some(32_768));
        // greeting skipped, two history turns plus the new message
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role, ContentRole::User);
        assert!(matches!(request.contents[2].parts[1], Part::Image(_)));
        assert!(request
            .system_instruction
            .unwrap()
            .starts_with("You are Lumina"));
    }

    #[tokio::test]
    async fn test_chat_mode_has_no_thinking_budget() {
        let (gw, backend) = gateway(MockBackend::default());
        gw.mentor_reply(&profile(), &[], "Hello", None, false)
            .await
            .unwrap();
        let request = backend.last_request().unwrap();
        assert_eq!(request.model, GatewayConfig::default().models.chat);
        assert_eq!(request.thinking_budget, None);
    }

    #[tokio::test]
    async fn test_speech_decodes_payload() {
        let (gw, backend) = gateway(MockBackend::default().then_inline("audio/pcm", "AQIDBA=="));
        let audio = gw.synthesize_speech("Well done").await.unwrap();
        assert_eq!(audio.bytes, vec![1, 2, 3, 4]);
        assert_eq!(audio.mime_type, "audio/pcm");
        assert!(matches!(
            backend.last_request().unwrap().output,
            OutputMode::Audio { ref voice } if voice == "Kore"
        ));
    }

    #[tokio::test]
    async fn test_missing_or_bad_payload_is_failure() {
        let (gw, _) = gateway(
            MockBackend::default()
                .then_text("no audio here")
                .then_inline("audio/pcm", "")
                .then_inline("audio/pcm", "***"),
        );
        for _ in 0..3 {
            assert!(matches!(
                gw.synthesize_speech("hi").await,
                Err(GenerationError::MalformedResponse(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_image_aspect_ratio() {
        let (gw, backend) = gateway(MockBackend::default().then_inline("image/png", "iVBORw0K"));
        assert!(gw.generate_vision_image("A cell", "5:4").await.is_err());
        assert_eq!(backend.call_count(), 0);

        let image = gw.generate_vision_image("A cell", "21:9").await.unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert!(image.to_data_url().starts_with("data:image/png;base64,"));
    }
}
