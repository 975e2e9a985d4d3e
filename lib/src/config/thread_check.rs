use super::{DirectiveParser, LineDirectiveSplit, ParseContext, UniqueSetting};
use crate::inject::{ThreadCheckInjector, UI_VIOLATION, VIOLATION_DESCRIPTOR, WORKER_VIOLATION};
use crate::validate::Validator;
use crate::ConfigError;

const ENABLED: &str = "thread-check-enabled";
const UI_ANNOTATION_CLASS: &str = "thread-check-ui-annotation-class";
const WORKER_ANNOTATION_CLASS: &str = "thread-check-worker-annotation-class";
const ANY_ANNOTATION_CLASS: &str = "thread-check-any-annotation-class";
const VIOLATION_HANDLER_CLASS: &str = "thread-check-violation-handler-class";

/// Thread check settings, with classes as java names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadCheckConfig {
    pub enabled: bool,
    pub ui_annotation: Option<String>,
    pub worker_annotation: Option<String>,
    pub any_annotation: Option<String>,
    pub handler: Option<String>,
}

pub(super) struct Parser {
    enabled: UniqueSetting,
    ui_annotation: UniqueSetting,
    worker_annotation: UniqueSetting,
    any_annotation: UniqueSetting,
    handler: UniqueSetting,
}

impl Default for Parser {
    fn default() -> Parser {
        Parser {
            enabled: UniqueSetting::new(ENABLED),
            ui_annotation: UniqueSetting::new(UI_ANNOTATION_CLASS),
            worker_annotation: UniqueSetting::new(WORKER_ANNOTATION_CLASS),
            any_annotation: UniqueSetting::new(ANY_ANNOTATION_CLASS),
            handler: UniqueSetting::new(VIOLATION_HANDLER_CLASS),
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
            UI_ANNOTATION_CLASS => &mut self.ui_annotation,
            WORKER_ANNOTATION_CLASS => &mut self.worker_annotation,
            ANY_ANNOTATION_CLASS => &mut self.any_annotation,
            VIOLATION_HANDLER_CLASS => &mut self.handler,
            _ => return Ok(false),
        };
        setting.set(ctx, split.single_value(ctx)?)?;
        Ok(true)
    }
}

impl Parser {
    pub(super) fn finish(self, ctx: &ParseContext) -> Result<ThreadCheckConfig, ConfigError> {
        if self.enabled.is_enabled(ctx)? {
            return Ok(ThreadCheckConfig {
                enabled: true,
                ui_annotation: Some(self.ui_annotation.value(ctx)?.to_owned()),
                worker_annotation: Some(self.worker_annotation.value(ctx)?.to_owned()),
                any_annotation: Some(self.any_annotation.value(ctx)?.to_owned()),
                handler: Some(self.handler.value(ctx)?.to_owned()),
            });
        }

        Ok(ThreadCheckConfig {
            enabled: false,
            ui_annotation: self.ui_annotation.optional(),
            worker_annotation: self.worker_annotation.optional(),
            any_annotation: self.any_annotation.optional(),
            handler: self.handler.optional(),
        })
    }
}

impl ThreadCheckConfig {
    pub(super) fn injector(
        &self,
        validator: &Validator,
    ) -> Result<Option<ThreadCheckInjector>, ConfigError> {
        let annotations = [&self.ui_annotation, &self.worker_annotation, &self.any_annotation];
        if !self.enabled && annotations.iter().all(|annotation| annotation.is_none()) {
            return Ok(None);
        }

        let handler = match (&self.handler, self.enabled) {
            (Some(handler), true) => {
                let class = validator.check_class_exists_and_is_public(handler)?;
                for name in [UI_VIOLATION, WORKER_VIOLATION] {
                    validator.check_method_is_public_static(class, name, VIOLATION_DESCRIPTOR)?;
                }
                Some(class.name.clone())
            }
            _ => None,
        };
        for annotation in annotations.into_iter().flatten() {
            validator.load_annotation(annotation)?;
        }

        Ok(Some(ThreadCheckInjector {
            handler,
            ui_annotation: self.ui_annotation.clone(),
            worker_annotation: self.worker_annotation.clone(),
            any_annotation: self.any_annotation.clone(),
            ignored_packages: vec![],
        }))
    }
}
