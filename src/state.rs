//! Application state: model collaborators, the distractor bank, prompts and
//! pipeline settings.
//!
//! Everything here is immutable after startup and shared read-only across
//! requests. Per-request history (the seen set) lives in `logic.rs`.
//!
//! Model policy: OpenAI when OPENAI_API_KEY is set, otherwise the offline
//! `LocalModel`.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::{load_app_config_from_env, PipelineSettings, Prompts};
use crate::distractors::DistractorBank;
use crate::error::ConfigError;
use crate::model::{LocalModel, QuestionModel, Summarizer};
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn QuestionModel>,
    pub summarizer: Arc<dyn Summarizer>,
    pub bank: Arc<DistractorBank>,
    pub prompts: Prompts,
    pub settings: PipelineSettings,
}

impl AppState {
    /// Build state from env: load config, load the distractor bank, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load TOML config if provided (prompts + pipeline settings).
        let cfg = load_app_config_from_env().unwrap_or_default();

        let bank_path = std::env::var("DISTRACTOR_BANK_PATH")
            .ok()
            .or_else(|| cfg.distractor_bank_path.clone());
        let bank = DistractorBank::load(bank_path.as_deref())?
            .with_topic_match(cfg.pipeline.topic_match);
        info!(
            target: "learnease_backend",
            topics = bank.topic_count(),
            topic_match = ?cfg.pipeline.topic_match,
            answer_similarity = ?cfg.pipeline.answer_similarity,
            "Distractor bank ready"
        );
        let bank = Arc::new(bank);

        // Build optional OpenAI client (if API key present).
        let (model, summarizer): (Arc<dyn QuestionModel>, Arc<dyn Summarizer>) = match OpenAI::from_env() {
            Some(oa) => {
                info!(target: "learnease_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
                let oa = Arc::new(oa);
                let model: Arc<dyn QuestionModel> = oa.clone();
                let summarizer: Arc<dyn Summarizer> = oa;
                (model, summarizer)
            }
            None => {
                warn!(target: "learnease_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local model.");
                let local = Arc::new(LocalModel::new(bank.clone()));
                let model: Arc<dyn QuestionModel> = local.clone();
                let summarizer: Arc<dyn Summarizer> = local;
                (model, summarizer)
            }
        };

        Ok(Self::with_parts(model, summarizer, bank, cfg.prompts, cfg.pipeline))
    }

    pub fn with_parts(
        model: Arc<dyn QuestionModel>,
        summarizer: Arc<dyn Summarizer>,
        bank: Arc<DistractorBank>,
        prompts: Prompts,
        settings: PipelineSettings,
    ) -> Self {
        Self { model, summarizer, bank, prompts, settings }
    }
}
