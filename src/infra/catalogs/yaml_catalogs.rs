use crate::core::chatter::ResponseCatalog;
use crate::core::games::{FishingCatalog, QuizCatalog};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

// Bundled copies of the stock catalogs, compiled in so a fresh install
// works with no config directory at all.
const BUNDLED_FISHING: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/fishing.yaml"));
const BUNDLED_QUIZ: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/quiz.yaml"));
const BUNDLED_RESPONSES: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/responses.yaml"));

/// Read a catalog from the config directory, falling back to the bundled
/// copy when the file is absent. A file that exists but fails to parse is
/// an error, not a fallback.
fn load_or_bundled<T: DeserializeOwned>(
    config_dir: &Path,
    file_name: &str,
    bundled: &str,
) -> anyhow::Result<T> {
    let path = config_dir.join(file_name);
    if path.exists() {
        let text = std::fs::read_to_string(&path)?;
        let value = serde_yaml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        info!(path = %path.display(), "loaded catalog");
        Ok(value)
    } else {
        info!(file = file_name, "catalog file not found, using bundled version");
        Ok(serde_yaml::from_str(bundled)?)
    }
}

pub fn load_fishing_catalog(config_dir: &Path) -> anyhow::Result<FishingCatalog> {
    load_or_bundled(config_dir, "fishing.yaml", BUNDLED_FISHING)
}

pub fn load_quiz_catalog(config_dir: &Path) -> anyhow::Result<QuizCatalog> {
    load_or_bundled(config_dir, "quiz.yaml", BUNDLED_QUIZ)
}

pub fn load_response_catalog(config_dir: &Path) -> anyhow::Result<ResponseCatalog> {
    load_or_bundled(config_dir, "responses.yaml", BUNDLED_RESPONSES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalogs_parse() {
        let empty = tempfile::tempdir().unwrap();

        let fishing = load_fishing_catalog(empty.path()).unwrap();
        assert!(!fishing.catches.is_empty());
        assert!(fishing.catches.iter().all(|c| c.weight > 0));

        let quiz = load_quiz_catalog(empty.path()).unwrap();
        assert!(!quiz.questions.is_empty());
        for q in &quiz.questions {
            assert!(q.answer < q.choices.len());
            assert!(q.prize > 0);
        }

        let responses = load_response_catalog(empty.path()).unwrap();
        assert!(!responses.rules.is_empty());
        for rule in &responses.rules {
            assert!(!rule.keywords.is_empty());
            assert!(!rule.responses.is_empty());
            assert!((0.0..=1.0).contains(&rule.chance));
        }
    }

    #[test]
    fn file_on_disk_overrides_the_bundled_copy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fishing.yaml"),
            "catches:\n  - name: Test Carp\n    min_value: 1\n    max_value: 2\n    weight: 10\n",
        )
        .unwrap();

        let catalog = load_fishing_catalog(dir.path()).unwrap();
        assert_eq!(catalog.catches.len(), 1);
        assert_eq!(catalog.catches[0].name, "Test Carp");
        // Optional fields pick up their serde defaults
        assert_eq!(catalog.catches[0].emoji, "🐟");
    }

    #[test]
    fn malformed_file_is_an_error_not_a_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quiz.yaml"), "questions: [not: valid").unwrap();
        assert!(load_quiz_catalog(dir.path()).is_err());
    }
}
