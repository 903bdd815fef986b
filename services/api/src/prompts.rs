//! Prompt template loading.

use anyhow::{Context, bail};
use mastery_core::llm_client::REQUIRED_PROMPTS;
use std::{collections::HashMap, fs, path::Path};

/// Loads every `*.md` file in `prompts_path`, keyed by file stem.
pub fn load_prompts(prompts_path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path).with_context(|| {
        format!(
            "Failed to read prompts directory {}",
            prompts_path.display()
        )
    })?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

/// Fails when any template the tutor backend renders is absent.
pub fn ensure_required(prompts: &HashMap<String, String>) -> anyhow::Result<()> {
    let missing: Vec<&str> = REQUIRED_PROMPTS
        .iter()
        .copied()
        .filter(|key| !prompts.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        bail!("Missing prompt templates: {}", missing.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_prompts_keys_by_stem_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("grade_answers.md"), "Grade {answers}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = load_prompts(dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts["grade_answers"], "Grade {answers}");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let err = load_prompts(Path::new("/no/such/prompts")).unwrap_err();
        assert!(err.to_string().contains("/no/such/prompts"));
    }

    #[test]
    fn test_ensure_required_names_missing_templates() {
        let mut prompts: HashMap<String, String> = REQUIRED_PROMPTS
            .iter()
            .map(|key| (key.to_string(), String::new()))
            .collect();
        assert!(ensure_required(&prompts).is_ok());

        prompts.remove("feynman_explanation");
        let err = ensure_required(&prompts).unwrap_err();
        assert!(err.to_string().contains("feynman_explanation"));
    }

    #[test]
    fn test_repository_prompts_are_complete() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../prompts");
        let prompts = load_prompts(&dir).unwrap();
        ensure_required(&prompts).unwrap();
    }
}
