//! Recognition and resolution services
//!
//! A service applies one module to a set of documents: it registers the
//! module, skips units the module already processed, makes one batch
//! capability call and persists the output one unit per transaction.

mod recognition;
mod resolution;

pub use recognition::{RecognitionReport, RecognitionService};
pub use resolution::{ResolutionReport, ResolutionService};

use crate::errors::{AppError, Result};
use crate::metrics::CapabilityTimer;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run one capability call under the optional timeout, recording latency.
/// Errors from the capability are returned unchanged.
pub(crate) async fn call_capability<T, F>(
    module: &str,
    operation: &'static str,
    timeout: Option<Duration>,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timer = CapabilityTimer::start(module, operation);

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::CapabilityTimeout {
                module: module.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
        },
        None => call.await,
    };

    timer.finish(result.is_ok());

    if let Err(ref e) = result {
        warn!(module = module, operation = operation, error = %e, "Capability call failed");
    }

    result
}

/// Error for capability output that does not line up with its input
pub(crate) fn contract_error(module: &str, message: String) -> AppError {
    AppError::CapabilityContract {
        module: module.to_string(),
        message,
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    //! Scripted capabilities that record what they were asked

    use crate::errors::{AppError, Result};
    use crate::modules::{
        FeatureKey, FitOptions, ModuleConfig, ModuleIdentity, Recognizer, Resolver, Span,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Recognizer answering from a text -> spans table
    pub struct ScriptedRecognizer {
        identity: ModuleIdentity,
        answers: HashMap<String, Option<Vec<Span>>>,
        pub calls: Mutex<Vec<Vec<String>>>,
        pub fitted: Mutex<Vec<(Vec<String>, Vec<Vec<Span>>)>>,
        pub trainable: bool,
        pub delay: Option<Duration>,
        pub fail: bool,
    }

    impl ScriptedRecognizer {
        pub fn new(name: &str, answers: &[(&str, Option<Vec<(i32, i32)>>)]) -> Self {
            Self {
                identity: ModuleIdentity::new(name, ModuleConfig::new().with("test", true)),
                answers: answers
                    .iter()
                    .map(|(text, spans)| {
                        let spans = spans
                            .as_ref()
                            .map(|s| s.iter().copied().map(Span::from).collect());
                        (text.to_string(), spans)
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
                fitted: Mutex::new(Vec::new()),
                trainable: false,
                delay: None,
                fail: false,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Recognizer for ScriptedRecognizer {
        fn identity(&self) -> &ModuleIdentity {
            &self.identity
        }

        async fn predict(&self, texts: &[String]) -> Result<Vec<Option<Vec<Span>>>> {
            self.calls.lock().unwrap().push(texts.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AppError::CapabilityFailed {
                    module: self.name().to_string(),
                    message: "model crashed".into(),
                });
            }
            Ok(texts
                .iter()
                .map(|t| self.answers.get(t).cloned().flatten())
                .collect())
        }

        fn supports_training(&self) -> bool {
            self.trainable
        }

        async fn fit(
            &self,
            texts: &[String],
            references: &[Vec<Span>],
            _options: &FitOptions,
        ) -> Result<()> {
            if !self.trainable {
                return Err(AppError::TrainingUnsupported {
                    module: self.name().to_string(),
                });
            }
            self.fitted
                .lock()
                .unwrap()
                .push((texts.to_vec(), references.to_vec()));
            Ok(())
        }
    }

    /// Resolver answering from a (text, span) -> key table
    pub struct ScriptedResolver {
        identity: ModuleIdentity,
        answers: HashMap<(String, Span), FeatureKey>,
        pub calls: Mutex<Vec<(Vec<String>, Vec<Vec<Span>>)>>,
        pub fitted: Mutex<Vec<(Vec<String>, Vec<Vec<Span>>, Vec<Vec<FeatureKey>>)>>,
        pub trainable: bool,
        pub truncate: bool,
    }

    impl ScriptedResolver {
        pub fn new(name: &str, answers: &[(&str, (i32, i32), &str, &str)]) -> Self {
            Self {
                identity: ModuleIdentity::new(name, ModuleConfig::new().with("test", true)),
                answers: answers
                    .iter()
                    .map(|(text, span, gazetteer, id)| {
                        (
                            (text.to_string(), Span::from(*span)),
                            FeatureKey::new(*gazetteer, *id),
                        )
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
                fitted: Mutex::new(Vec::new()),
                trainable: false,
                truncate: false,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Resolver for ScriptedResolver {
        fn identity(&self) -> &ModuleIdentity {
            &self.identity
        }

        async fn predict(
            &self,
            texts: &[String],
            references: &[Vec<Span>],
        ) -> Result<Vec<Vec<Option<FeatureKey>>>> {
            self.calls
                .lock()
                .unwrap()
                .push((texts.to_vec(), references.to_vec()));

            let mut output: Vec<Vec<Option<FeatureKey>>> = texts
                .iter()
                .zip(references)
                .map(|(text, spans)| {
                    spans
                        .iter()
                        .map(|span| self.answers.get(&(text.clone(), *span)).cloned())
                        .collect()
                })
                .collect();

            if self.truncate {
                output.pop();
            }
            Ok(output)
        }

        fn supports_training(&self) -> bool {
            self.trainable
        }

        async fn fit(
            &self,
            texts: &[String],
            references: &[Vec<Span>],
            referents: &[Vec<FeatureKey>],
            _options: &FitOptions,
        ) -> Result<()> {
            self.fitted.lock().unwrap().push((
                texts.to_vec(),
                references.to_vec(),
                referents.to_vec(),
            ));
            Ok(())
        }
    }
}
