//! Pipeline orchestration.
//!
//! Feature source → classifier → aggregation store, strictly in sequence for
//! one request. Errors from any stage propagate unchanged; nothing is retried
//! and nothing is appended when an earlier stage fails.

use crate::classifier::{observations, Classifier, LinearModel, LoadClass, Observation};
use crate::config::Config;
use crate::core::features::FeatureVector;
use crate::core::source::{build_source, FeatureSource, SourceInput};
use crate::error::Result;
use crate::store::FeatureStore;
use serde::Serialize;

/// Result of running one input through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Features as stored (after any relabelling)
    pub features: FeatureVector,
    pub prediction: Option<LoadClass>,
    pub observations: Vec<Observation>,
    /// Whether the record was appended to the store
    pub stored: bool,
}

/// Source, optional classifier and optional store wired together.
pub struct Pipeline {
    source: Box<dyn FeatureSource>,
    classifier: Option<Box<dyn Classifier>>,
    store: Option<FeatureStore>,
}

impl Pipeline {
    /// Pipeline with only a feature source.
    pub fn new(source: Box<dyn FeatureSource>) -> Self {
        Self {
            source,
            classifier: None,
            store: None,
        }
    }

    /// Build the pipeline described by `config`.
    ///
    /// Loads the model when one is configured; a bad model file is fatal.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut pipeline = Self::new(build_source(config))
            .with_store(FeatureStore::open(config.summary_path()));
        if let Some(ref model_path) = config.model_path {
            pipeline = pipeline.with_classifier(Box::new(LinearModel::load(model_path)?));
        }
        Ok(pipeline)
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_store(mut self, store: FeatureStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Stop appending results.
    pub fn without_store(mut self) -> Self {
        self.store = None;
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn store(&self) -> Option<&FeatureStore> {
        self.store.as_ref()
    }

    /// Produce, classify and store features for one input.
    ///
    /// Text input carries no supervised label of its own once a classifier
    /// is present: the stored label becomes the predicted class.
    pub fn run(&mut self, input: &SourceInput) -> Result<Outcome> {
        let mut features = self.source.produce(input)?;

        let prediction = match self.classifier {
            Some(ref classifier) => Some(classifier.classify(&features.record())?),
            None => None,
        };

        if let (SourceInput::Text { .. }, Some(class)) = (input, prediction) {
            features.label = class.label().to_string();
        }

        let stored = match self.store {
            Some(ref store) => {
                store.append(&features)?;
                true
            }
            None => false,
        };

        tracing::debug!(
            "Pipeline run via {} source: label={}, prediction={:?}",
            self.source.name(),
            features.label,
            prediction
        );

        Ok(Outcome {
            observations: observations(&features),
            features,
            prediction,
            stored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::FeatureRecord;
    use crate::core::session::Session;
    use crate::error::PipelineError;
    use tempfile::tempdir;

    /// Source that always returns the same vector.
    struct FixedSource(FeatureVector);

    impl FeatureSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn produce(&mut self, _input: &SourceInput) -> Result<FeatureVector> {
            Ok(self.0.clone())
        }
    }

    struct ConstClassifier(LoadClass);

    impl Classifier for ConstClassifier {
        fn classify(&self, _record: &FeatureRecord) -> Result<LoadClass> {
            Ok(self.0)
        }
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn classify(&self, _record: &FeatureRecord) -> Result<LoadClass> {
            Err(PipelineError::Capability("model unavailable".to_string()))
        }
    }

    fn fixed() -> FeatureVector {
        FeatureVector {
            avg_dwell: 0.2,
            avg_flight: 0.18,
            speed: 2.0,
            pauses: 3,
            errors: 2,
            label: "low".to_string(),
        }
    }

    #[test]
    fn test_text_is_relabelled_with_prediction() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::open(dir.path().join("summary.csv"));
        let mut pipeline = Pipeline::new(Box::new(FixedSource(fixed())))
            .with_classifier(Box::new(ConstClassifier(LoadClass::High)))
            .with_store(store.clone());

        let outcome = pipeline.run(&SourceInput::text("abc", "low")).unwrap();
        assert_eq!(outcome.prediction, Some(LoadClass::High));
        assert_eq!(outcome.features.label, "high");
        assert!(outcome.stored);
        assert_eq!(outcome.observations.len(), 3);
        assert_eq!(store.read_all().unwrap()[0].label, "high");
    }

    #[test]
    fn test_session_keeps_supervised_label() {
        let mut pipeline = Pipeline::new(Box::new(FixedSource(fixed())))
            .with_classifier(Box::new(ConstClassifier(LoadClass::High)));

        let session = Session::from_events("low", Vec::new());
        let outcome = pipeline.run(&SourceInput::Session(session)).unwrap();
        assert_eq!(outcome.features.label, "low");
        assert_eq!(outcome.prediction, Some(LoadClass::High));
        assert!(!outcome.stored);
    }

    #[test]
    fn test_classifier_failure_stops_before_store() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::open(dir.path().join("summary.csv"));
        let mut pipeline = Pipeline::new(Box::new(FixedSource(fixed())))
            .with_classifier(Box::new(BrokenClassifier))
            .with_store(store.clone());

        let err = pipeline.run(&SourceInput::text("abc", "low")).unwrap_err();
        assert!(matches!(err, PipelineError::Capability(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_without_classifier_keeps_given_label() {
        let mut pipeline = Pipeline::new(Box::new(FixedSource(fixed())));
        let outcome = pipeline.run(&SourceInput::text("abc", "low")).unwrap();
        assert_eq!(outcome.prediction, None);
        assert_eq!(outcome.features.label, "low");
    }

    #[test]
    fn test_from_config_with_bad_model() {
        let dir = tempdir().unwrap();
        let config = Config {
            data_path: dir.path().to_path_buf(),
            model_path: Some(dir.path().join("missing-model.json")),
            ..Config::default()
        };
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(PipelineError::Capability(_))
        ));
    }
}
