use super::{DirectiveParser, LineDirectiveSplit, ParseContext, UniqueSetting};
use crate::inject::{BenchmarkInjector, EXECUTED, EXECUTED_WITH_WARNING, FAILED, THROWN};
use crate::jvm::java_to_descriptor;
use crate::validate::Validator;
use crate::ConfigError;

const ENABLED: &str = "benchmark-enabled";
const ANNOTATION_CLASS: &str = "benchmark-annotation-class";
const RECEIVER_CLASS: &str = "benchmark-receiver-class";

/// Benchmark settings, with classes as java names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub enabled: bool,
    pub annotation: Option<String>,
    pub receiver: Option<String>,
}

pub(super) struct Parser {
    enabled: UniqueSetting,
    annotation: UniqueSetting,
    receiver: UniqueSetting,
}

impl Default for Parser {
    fn default() -> Parser {
        Parser {
            enabled: UniqueSetting::new(ENABLED),
            annotation: UniqueSetting::new(ANNOTATION_CLASS),
            receiver: UniqueSetting::new(RECEIVER_CLASS),
        }
    }
}

impl DirectiveParser for Parser {
    fn parse(
        &mut self,
        split: &LineDirectiveSplit,
        ctx: &ParseContext,
    ) -> Result<bool, ConfigError> {
        let setting = match split.directive {
            ENABLED => &mut self.enabled,
            ANNOTATION_CLASS => &mut self.annotation,
            RECEIVER_CLASS => &mut self.receiver,
            _ => return Ok(false),
        };
        setting.set(ctx, split.single_value(ctx)?)?;
        Ok(true)
    }
}

impl Parser {
    pub(super) fn finish(self, ctx: &ParseContext) -> Result<BenchmarkConfig, ConfigError> {
        if !self.enabled.is_enabled(ctx)? {
            return Ok(BenchmarkConfig {
                enabled: false,
                annotation: self.annotation.optional(),
                receiver: None,
            });
        }
        Ok(BenchmarkConfig {
            enabled: true,
            annotation: Some(self.annotation.value(ctx)?.to_owned()),
            receiver: Some(self.receiver.value(ctx)?.to_owned()),
        })
    }
}

impl BenchmarkConfig {
    pub(super) fn injector(
        &self,
        validator: &Validator,
    ) -> Result<Option<BenchmarkInjector>, ConfigError> {
        let annotation = match &self.annotation {
            Some(annotation) => annotation,
            None => return Ok(None),
        };

        let receiver = match (&self.receiver, self.enabled) {
            (Some(receiver), true) => {
                let class = validator.check_class_exists_and_is_public(receiver)?;
                for (name, descriptor) in [EXECUTED, EXECUTED_WITH_WARNING, FAILED, THROWN] {
                    validator.check_method_is_public_static(class, name, descriptor)?;
                }
                Some(class.name.clone())
            }
            _ => None,
        };
        validator.load_annotation(annotation)?;

        Ok(Some(BenchmarkInjector::new(java_to_descriptor(annotation), receiver)))
    }
}
