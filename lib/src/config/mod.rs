//! Line-directive configuration files
//!
//! A configuration file is a list of `directive value` lines. Blank lines and lines starting with
//! `#` are ignored. Every line is offered to the parser of each policy in turn, and the first one
//! that recognizes the directive consumes it:
//!
//! ```text
//! # crash shield
//! exception-handling-enabled true
//! auto-handle-exceptions com.example.AutoHandle
//! no-auto-handle-exceptions com.example.DontHandle
//! auto-exception-handler com.example.Handler
//! should-process-constructor true
//! should-process-views false
//! ```
//!
//! Parsing only checks the shape of the file. The classes it names are checked against the
//! classpath when the injectors are made (see [`Configuration::injectors`]).

mod benchmark;
mod call_logger;
mod crash_shield;
mod thread_check;

pub use benchmark::BenchmarkConfig;
pub use call_logger::CallLoggerConfig;
pub use crash_shield::CrashShieldConfig;
pub use thread_check::ThreadCheckConfig;

use crate::classpath::Classpath;
use crate::inject::Injector;
use crate::validate::Validator;
use crate::ConfigError;
use log::debug;
use std::path::Path;

/// Position in the configuration file, for error messages
#[derive(Debug, Clone)]
pub struct ParseContext {
    path: String,
    line: usize,
}

impl ParseContext {
    pub fn new(path: impl Into<String>) -> ParseContext {
        ParseContext {
            path: path.into(),
            line: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn line(&self) -> usize {
        self.line
    }

    fn next_line(&mut self) {
        self.line += 1;
    }
}

/// A non-empty line, split on the first run of whitespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDirectiveSplit<'a> {
    pub directive: &'a str,
    pub contents: &'a str,
}

impl<'a> LineDirectiveSplit<'a> {
    pub fn split(line: &'a str) -> LineDirectiveSplit<'a> {
        let line = line.trim();
        match line.find(char::is_whitespace) {
            Some(end) => LineDirectiveSplit {
                directive: &line[..end],
                contents: line[end..].trim_start(),
            },
            None => LineDirectiveSplit {
                directive: line,
                contents: "",
            },
        }
    }

    /// Contents as one value, which must be non-empty and contain no whitespace
    pub fn single_value(&self, ctx: &ParseContext) -> Result<&'a str, ConfigError> {
        if self.contents.is_empty() || self.contents.contains(char::is_whitespace) {
            return Err(ConfigError::NotSingleValue {
                path: ctx.path.clone(),
                line: ctx.line,
                directive: self.directive.to_owned(),
            });
        }
        Ok(self.contents)
    }

    /// Contents as exactly `expected` whitespace-separated values
    pub fn values(&self, ctx: &ParseContext, expected: usize) -> Result<Vec<&'a str>, ConfigError> {
        let values: Vec<&str> = self.contents.split_whitespace().collect();
        if values.len() != expected {
            return Err(ConfigError::WrongValueCount {
                path: ctx.path.clone(),
                line: ctx.line,
                directive: self.directive.to_owned(),
                expected,
            });
        }
        Ok(values)
    }
}

/// Setting which may be given at most once
#[derive(Debug, Clone)]
pub struct UniqueSetting {
    name: &'static str,
    value: Option<String>,
}

impl UniqueSetting {
    pub const fn new(name: &'static str) -> UniqueSetting {
        UniqueSetting { name, value: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set(&mut self, ctx: &ParseContext, value: &str) -> Result<(), ConfigError> {
        if let Some(previous) = &self.value {
            return Err(ConfigError::AlreadyDefined {
                path: ctx.path.clone(),
                line: ctx.line,
                directive: self.name.to_owned(),
                previous: previous.clone(),
            });
        }
        self.value = Some(value.to_owned());
        Ok(())
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Value of a setting that is required
    pub fn value(&self, ctx: &ParseContext) -> Result<&str, ConfigError> {
        self.value.as_deref().ok_or_else(|| ConfigError::NotDefined {
            path: ctx.path.clone(),
            directive: self.name.to_owned(),
        })
    }

    /// Value of a setting that may be left out
    pub fn optional(&self) -> Option<String> {
        self.value.clone()
    }

    pub fn as_bool(&self, ctx: &ParseContext) -> Result<bool, ConfigError> {
        match self.value(ctx)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ConfigError::NotBoolean(other.to_owned())),
        }
    }

    /// Boolean that counts as `false` when left out
    pub fn is_enabled(&self, ctx: &ParseContext) -> Result<bool, ConfigError> {
        if self.is_set() {
            self.as_bool(ctx)
        } else {
            Ok(false)
        }
    }
}

/// Parser for the directives of one policy
pub trait DirectiveParser {
    /// Consume the line if the directive belongs to this policy, returning whether it did
    fn parse(
        &mut self,
        split: &LineDirectiveSplit,
        ctx: &ParseContext,
    ) -> Result<bool, ConfigError>;
}

/// Settings of every policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub crash_shield: CrashShieldConfig,
    pub benchmark: BenchmarkConfig,
    pub thread_check: ThreadCheckConfig,
    pub call_logger: CallLoggerConfig,
}

impl Configuration {
    /// Read and parse a configuration file
    pub fn parse_file(path: &Path) -> Result<Configuration, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let description = match path.canonicalize() {
            Ok(canonical) => canonical.display().to_string(),
            Err(_) => path.display().to_string(),
        };
        Configuration::parse(&description, &text)
    }

    /// Parse configuration text, using `path` in error messages
    pub fn parse(path: &str, text: &str) -> Result<Configuration, ConfigError> {
        let mut crash_shield = crash_shield::Parser::default();
        let mut benchmark = benchmark::Parser::default();
        let mut thread_check = thread_check::Parser::default();
        let mut call_logger = call_logger::Parser::default();

        let mut ctx = ParseContext::new(path);
        for line in text.lines() {
            ctx.next_line();
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let split = LineDirectiveSplit::split(line);
            let parsers: [&mut dyn DirectiveParser; 4] = [
                &mut crash_shield,
                &mut benchmark,
                &mut thread_check,
                &mut call_logger,
            ];
            let mut consumed = false;
            for parser in parsers {
                if parser.parse(&split, &ctx)? {
                    consumed = true;
                    break;
                }
            }
            if !consumed {
                return Err(ConfigError::UnknownDirective {
                    path: ctx.path.clone(),
                    line: ctx.line,
                    directive: split.directive.to_owned(),
                });
            }
        }

        Ok(Configuration {
            crash_shield: crash_shield.finish(&ctx)?,
            benchmark: benchmark.finish(&ctx)?,
            thread_check: thread_check.finish(&ctx)?,
            call_logger: call_logger.finish(&ctx)?,
        })
    }

    /// Validate the configured classes against the classpath and make the injectors
    ///
    /// Injectors come out in the order they have to run in. Policies that are disabled and name
    /// no annotation have no injector at all.
    pub fn injectors(&self, classpath: &Classpath) -> Result<Vec<Box<dyn Injector>>, ConfigError> {
        let validator = Validator::new(classpath);
        let mut injectors: Vec<Box<dyn Injector>> = vec![];
        if let Some(injector) = self.crash_shield.injector(&validator)? {
            injectors.push(Box::new(injector));
        }
        if let Some(injector) = self.benchmark.injector(&validator)? {
            injectors.push(Box::new(injector));
        }
        if let Some(injector) = self.thread_check.injector(&validator)? {
            injectors.push(Box::new(injector));
        }
        if let Some(injector) = self.call_logger.injector(&validator)? {
            injectors.push(Box::new(injector));
        }
        debug!("Configured {} injectors", injectors.len());
        Ok(injectors)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splitting() {
        assert_eq!(
            LineDirectiveSplit::split("benchmark-enabled \t true"),
            LineDirectiveSplit {
                directive: "benchmark-enabled",
                contents: "true"
            }
        );
        assert_eq!(
            LineDirectiveSplit::split("  benchmark-enabled  "),
            LineDirectiveSplit {
                directive: "benchmark-enabled",
                contents: ""
            }
        );

        let ctx = ParseContext::new("conf");
        let split = LineDirectiveSplit::split("crash-shield-safe-class a.B  a.SafeB");
        assert_eq!(split.values(&ctx, 2).unwrap(), vec!["a.B", "a.SafeB"]);
        assert_eq!(
            split.single_value(&ctx).unwrap_err().to_string(),
            "conf:0: directive 'crash-shield-safe-class' should have a single value"
        );
    }

    #[test]
    fn settings() {
        let ctx = ParseContext::new("conf");
        let mut setting = UniqueSetting::new("benchmark-enabled");
        assert!(!setting.is_enabled(&ctx).unwrap(), "unset flags are off");
        assert_eq!(
            setting.value(&ctx).unwrap_err().to_string(),
            "conf: Setting 'benchmark-enabled' not defined"
        );

        setting.set(&ctx, "yes").unwrap();
        assert_eq!(
            setting.as_bool(&ctx).unwrap_err().to_string(),
            "'yes' is not 'true' or 'false'"
        );
        assert_eq!(
            setting.set(&ctx, "true").unwrap_err().to_string(),
            "conf:0: Setting 'benchmark-enabled' already defined (previous value 'yes')"
        );
    }

    #[test]
    fn empty_configuration() {
        let config = Configuration::parse("conf", "\n# nothing here\n   \n").unwrap();
        assert_eq!(config, Configuration::default());
        assert!(
            config.injectors(&Classpath::new(vec![])).unwrap().is_empty(),
            "nothing is configured, so nothing runs"
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            Configuration::parse("conf", "# header\nbenchmark-enabled false\nfrobnicate 3\n")
                .unwrap_err()
                .to_string(),
            "conf:3: Unknown directive: 'frobnicate'"
        );
        assert_eq!(
            Configuration::parse("conf", "benchmark-annotation-class a.B a.C\n")
                .unwrap_err()
                .to_string(),
            "conf:1: directive 'benchmark-annotation-class' should have a single value"
        );
        assert_eq!(
            Configuration::parse("conf", "log-call a.B\nlog-call a.C\n")
                .unwrap_err()
                .to_string(),
            "conf:2: Setting 'log-call' already defined (previous value 'a.B')"
        );
        assert_eq!(
            Configuration::parse("conf", "thread-check-enabled true\n")
                .unwrap_err()
                .to_string(),
            "conf: Setting 'thread-check-ui-annotation-class' not defined",
            "enabled policies need all of their classes"
        );
        assert_eq!(
            Configuration::parse("conf", "call-logging-enabled maybe\n")
                .unwrap_err()
                .to_string(),
            "'maybe' is not 'true' or 'false'"
        );
    }
}
