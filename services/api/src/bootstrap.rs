//! Wiring shared by the `api` and `tutor` binaries.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use mastery_core::{
    Catalog, CheckpointPolicy, Tutor,
    gatherer::WebContentGatherer,
    llm_client::{OpenAICompatibleClient, TutorBackend},
    search::{BraveSearch, SearchProvider},
};
use std::{path::Path, sync::Arc};
use tracing::info;

use crate::config::Config;
use crate::prompts::{ensure_required, load_prompts};

/// Builds the tutor: chat backend, web search, and the checkpoint policy.
pub fn build_tutor(config: &Config) -> anyhow::Result<Tutor> {
    let prompts = load_prompts(&config.prompts_path)?;
    ensure_required(&prompts)?;

    info!(provider = ?config.provider, model = %config.chat_model, "Using chat provider.");
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.llm_api_key)
        .with_api_base(config.provider.api_base());
    let backend: Arc<dyn TutorBackend> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
        prompts,
    ));

    let search: Arc<dyn SearchProvider> = Arc::new(BraveSearch::new(&config.brave_api_key));
    let gatherer = WebContentGatherer::new(search, backend.clone())
        .with_query_suffix(&config.search_query_suffix);

    Ok(
        Tutor::new(Arc::new(gatherer), backend).with_policy(CheckpointPolicy {
            max_remediation_rounds: config.max_remediation_rounds,
            ..Default::default()
        }),
    )
}

/// Loads the catalog at `path`, or the built-in one when no path is given.
pub fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    match path {
        Some(path) => Catalog::from_json_file(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => Ok(Catalog::builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use std::path::PathBuf;
    use tracing::Level;

    fn config(prompts_path: PathBuf) -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            provider: Provider::Groq,
            llm_api_key: "gsk_test".to_string(),
            chat_model: "llama-3.1-8b-instant".to_string(),
            brave_api_key: "brave".to_string(),
            search_query_suffix: "tutorial".to_string(),
            log_level: Level::INFO,
            prompts_path,
            catalog_path: None,
            max_remediation_rounds: None,
        }
    }

    #[test]
    fn test_build_tutor_applies_policy() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../prompts");
        let tutor = build_tutor(&config(dir)).unwrap();
        assert_eq!(tutor.policy().max_remediation_rounds, None);
        assert_eq!(tutor.policy().max_reentries, 2);
    }

    #[test]
    fn test_build_tutor_requires_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_tutor(&config(dir.path().to_path_buf()))
            .err()
            .expect("missing templates must fail");
        assert!(err.to_string().contains("Missing prompt templates"));
    }

    #[test]
    fn test_load_catalog_defaults_to_builtin() {
        assert_eq!(load_catalog(None).unwrap(), Catalog::builtin());
        assert!(load_catalog(Some(Path::new("/no/catalog.json"))).is_err());
    }
}
