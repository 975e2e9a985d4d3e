use super::{DirectiveParser, LineDirectiveSplit, ParseContext, UniqueSetting};
use crate::inject::{CallLoggerInjector, DESCRIPTION, LOG_CALL};
use crate::jvm::java_to_descriptor;
use crate::validate::Validator;
use crate::ConfigError;

const ENABLED: &str = "call-logging-enabled";
const LOG_CALL_ANNOTATION: &str = "log-call";
const CALL_LOGGER: &str = "call-logger";

/// Call logging settings, with classes as java names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLoggerConfig {
    pub enabled: bool,
    pub annotation: Option<String>,
    pub logger: Option<String>,
}

pub(super) struct Parser {
    enabled: UniqueSetting,
    annotation: UniqueSetting,
    logger: UniqueSetting,
}

impl Default for Parser {
    fn default() -> Parser {
        Parser {
            enabled: UniqueSetting::new(ENABLED),
            annotation: UniqueSetting::new(LOG_CALL_ANNOTATION),
            logger: UniqueSetting::new(CALL_LOGGER),
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
            LOG_CALL_ANNOTATION => &mut self.annotation,
            CALL_LOGGER => &mut self.logger,
            _ => return Ok(false),
        };
        setting.set(ctx, split.single_value(ctx)?)?;
        Ok(true)
    }
}

impl Parser {
    pub(super) fn finish(self, ctx: &ParseContext) -> Result<CallLoggerConfig, ConfigError> {
        if !self.enabled.is_enabled(ctx)? {
            return Ok(CallLoggerConfig {
                enabled: false,
                annotation: self.annotation.optional(),
                logger: None,
            });
        }
        Ok(CallLoggerConfig {
            enabled: true,
            annotation: Some(self.annotation.value(ctx)?.to_owned()),
            logger: Some(self.logger.value(ctx)?.to_owned()),
        })
    }
}

impl CallLoggerConfig {
    pub(super) fn injector(
        &self,
        validator: &Validator,
    ) -> Result<Option<CallLoggerInjector>, ConfigError> {
        let annotation = match &self.annotation {
            Some(annotation) => annotation,
            None => return Ok(None),
        };

        let logger = match (&self.logger, self.enabled) {
            (Some(logger), true) => {
                let class = validator.check_class_exists_and_is_public(logger)?;
                validator.check_method_is_public_static(class, LOG_CALL.0, LOG_CALL.1)?;
                Some(class.name.clone())
            }
            _ => None,
        };
        let header = validator.load_annotation(annotation)?;
        validator.check_annotation_declares(header, DESCRIPTION)?;

        Ok(Some(CallLoggerInjector {
            annotation: java_to_descriptor(annotation),
            logger,
            ignored_packages: vec![],
        }))
    }
}

#[cfg(test)]
mod test {
    use crate::config::Configuration;

    #[test]
    fn settings() {
        let config = Configuration::parse(
            "conf",
            "call-logging-enabled true\nlog-call a.Logged\ncall-logger a.Logger\n",
        )
        .unwrap()
        .call_logger;
        assert!(config.enabled);
        assert_eq!(config.annotation.as_deref(), Some("a.Logged"));
        assert_eq!(config.logger.as_deref(), Some("a.Logger"));

        assert_eq!(
            Configuration::parse("conf", "call-logging-enabled true\ncall-logger a.Logger\n")
                .unwrap_err()
                .to_string(),
            "conf: Setting 'log-call' not defined"
        );
    }
}
