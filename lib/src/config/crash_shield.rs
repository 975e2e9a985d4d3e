use super::{DirectiveParser, LineDirectiveSplit, ParseContext, UniqueSetting};
use crate::inject::{
    default_safe_classes, CrashShieldInjector, HANDLE_THROWABLE, IS_OBJECT_CRASHING, METHOD_FINISHED,
};
use crate::jvm::{java_to_descriptor, java_to_internal};
use crate::validate::Validator;
use crate::ConfigError;

const ENABLED: &str = "exception-handling-enabled";
const ENABLE_ANNOTATION_CLASS: &str = "auto-handle-exceptions";
const DISABLE_ANNOTATION_CLASS: &str = "no-auto-handle-exceptions";
const EXCEPTION_HANDLER_CLASS: &str = "auto-exception-handler";
const SHOULD_PROCESS_CONSTRUCTOR: &str = "should-process-constructor";
const SHOULD_PROCESS_VIEWS: &str = "should-process-views";
const SAFE_CLASS: &str = "crash-shield-safe-class";
const IGNORED_PACKAGE: &str = "crash-shield-ignored-package";

/// Crash shield settings, with classes as java names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashShieldConfig {
    pub enabled: bool,
    pub enable_annotation: Option<String>,
    pub disable_annotation: Option<String>,
    pub handler: Option<String>,
    pub process_constructors: bool,
    pub process_views: bool,

    /// Framework classes and their safe replacements, empty for the built-in ones
    pub safe_classes: Vec<(String, String)>,
    pub ignored_packages: Vec<String>,
}

pub(super) struct Parser {
    enabled: UniqueSetting,
    enable_annotation: UniqueSetting,
    disable_annotation: UniqueSetting,
    handler: UniqueSetting,
    process_constructors: UniqueSetting,
    process_views: UniqueSetting,
    safe_classes: Vec<(String, String)>,
    ignored_packages: Vec<String>,
}

impl Default for Parser {
    fn default() -> Parser {
        Parser {
            enabled: UniqueSetting::new(ENABLED),
            enable_annotation: UniqueSetting::new(ENABLE_ANNOTATION_CLASS),
            disable_annotation: UniqueSetting::new(DISABLE_ANNOTATION_CLASS),
            handler: UniqueSetting::new(EXCEPTION_HANDLER_CLASS),
            process_constructors: UniqueSetting::new(SHOULD_PROCESS_CONSTRUCTOR),
            process_views: UniqueSetting::new(SHOULD_PROCESS_VIEWS),
            safe_classes: vec![],
            ignored_packages: vec![],
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
            ENABLE_ANNOTATION_CLASS => &mut self.enable_annotation,
            DISABLE_ANNOTATION_CLASS => &mut self.disable_annotation,
            EXCEPTION_HANDLER_CLASS => &mut self.handler,
            SHOULD_PROCESS_CONSTRUCTOR => &mut self.process_constructors,
            SHOULD_PROCESS_VIEWS => &mut self.process_views,
            SAFE_CLASS => {
                let values = split.values(ctx, 2)?;
                self.safe_classes
                    .push((values[0].to_owned(), values[1].to_owned()));
                return Ok(true);
            }
            IGNORED_PACKAGE => {
                self.ignored_packages.push(split.single_value(ctx)?.to_owned());
                return Ok(true);
            }
            _ => return Ok(false),
        };
        setting.set(ctx, split.single_value(ctx)?)?;
        Ok(true)
    }
}

impl Parser {
    pub(super) fn finish(self, ctx: &ParseContext) -> Result<CrashShieldConfig, ConfigError> {
        if !self.enabled.is_enabled(ctx)? {
            return Ok(CrashShieldConfig {
                enabled: false,
                enable_annotation: self.enable_annotation.optional(),
                disable_annotation: self.disable_annotation.optional(),
                ignored_packages: self.ignored_packages,
                ..CrashShieldConfig::default()
            });
        }

        Ok(CrashShieldConfig {
            enabled: true,
            enable_annotation: Some(self.enable_annotation.value(ctx)?.to_owned()),
            disable_annotation: Some(self.disable_annotation.value(ctx)?.to_owned()),
            handler: Some(self.handler.value(ctx)?.to_owned()),
            process_constructors: self.process_constructors.as_bool(ctx)?,
            process_views: self.process_views.as_bool(ctx)?,
            safe_classes: self.safe_classes,
            ignored_packages: self.ignored_packages,
        })
    }
}

impl CrashShieldConfig {
    pub(super) fn injector(
        &self,
        validator: &Validator,
    ) -> Result<Option<CrashShieldInjector>, ConfigError> {
        let handler = match (&self.handler, self.enabled) {
            (Some(handler), true) => {
                let class = validator.check_class_exists_and_is_public(handler)?;
                for (name, descriptor) in [HANDLE_THROWABLE, METHOD_FINISHED, IS_OBJECT_CRASHING] {
                    validator.check_method_is_public_static(class, name, descriptor)?;
                }
                Some(class.name.clone())
            }
            _ => None,
        };
        if handler.is_none() && self.enable_annotation.is_none() && self.disable_annotation.is_none() {
            return Ok(None);
        }

        let annotation = |java_name: &Option<String>| -> Result<Option<String>, ConfigError> {
            match java_name {
                Some(java_name) => {
                    validator.load_annotation(java_name)?;
                    Ok(Some(java_to_descriptor(java_name)))
                }
                None => Ok(None),
            }
        };
        let enable_annotation = annotation(&self.enable_annotation)?;
        let disable_annotation = annotation(&self.disable_annotation)?;

        let safe_classes = if self.safe_classes.is_empty() {
            default_safe_classes()
        } else {
            self.safe_classes
                .iter()
                .map(|(from, to)| (java_to_internal(from), java_to_internal(to)))
                .collect()
        };

        Ok(Some(CrashShieldInjector {
            handler,
            enable_annotation,
            disable_annotation,
            process_constructors: self.process_constructors,
            process_views: self.process_views,
            safe_classes,
            ignored_packages: self.ignored_packages.clone(),
        }))
    }
}

#[cfg(test)]
mod test {
    use crate::config::Configuration;

    #[test]
    fn enabled() {
        let config = Configuration::parse(
            "conf",
            "exception-handling-enabled true\n\
             auto-handle-exceptions a.On\n\
             no-auto-handle-exceptions a.Off\n\
             auto-exception-handler a.Handler\n\
             should-process-constructor true\n\
             should-process-views false\n\
             crash-shield-safe-class android.view.View a.SafeView\n\
             crash-shield-ignored-package a.reporting\n",
        )
        .unwrap()
        .crash_shield;

        assert!(config.enabled);
        assert_eq!(config.handler.as_deref(), Some("a.Handler"));
        assert_eq!(config.enable_annotation.as_deref(), Some("a.On"));
        assert!(config.process_constructors);
        assert!(!config.process_views);
        assert_eq!(
            config.safe_classes,
            vec![(String::from("android.view.View"), String::from("a.SafeView"))]
        );
        assert_eq!(config.ignored_packages, vec!["a.reporting"]);
    }

    #[test]
    fn disabled() {
        let config = Configuration::parse(
            "conf",
            "exception-handling-enabled false\nno-auto-handle-exceptions a.Off\n",
        )
        .unwrap()
        .crash_shield;
        assert!(!config.enabled);
        assert_eq!(config.disable_annotation.as_deref(), Some("a.Off"));
        assert_eq!(config.handler, None);

        assert_eq!(
            Configuration::parse("conf", "exception-handling-enabled true\nauto-handle-exceptions a.On\n")
                .unwrap_err()
                .to_string(),
            "conf: Setting 'no-auto-handle-exceptions' not defined"
        );
        assert_eq!(
            Configuration::parse("conf", "crash-shield-safe-class a.View\n")
                .unwrap_err()
                .to_string(),
            "conf:1: directive 'crash-shield-safe-class' should have 2 values"
        );
    }
}
