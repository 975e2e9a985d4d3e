//! Batch driver
//!
//! Processing a batch happens in two passes. The first one folds every class found on the
//! classpath and in the inputs into the [`Model`], so that the second pass, which runs the
//! injectors class by class, can answer hierarchy questions about any of them.
//!
//! ```no_run
//! use classweave::process::AnnotationProcessorBuilder;
//!
//! let mut processor = AnnotationProcessorBuilder::new()
//!     .configuration_file("injection.conf")
//!     .add_input_output_map("build/classes", "build/instrumented")
//!     .add_classpath_element("libs/android.jar")
//!     .build()?;
//! processor.process()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod class_file;
mod files;

pub use class_file::{is_class_file, ClassFileProcessor};
pub use files::FilePair;

use crate::classpath::Classpath;
use crate::config::Configuration;
use crate::inject::Injector;
use crate::model::Model;
use crate::{ConfigError, ProcessError};
use log::{error, info};
use std::path::PathBuf;

enum ConfigurationSource {
    File(PathBuf),
    Parsed(Configuration),
}

/// Collects the inputs of an [`AnnotationProcessor`]
#[derive(Default)]
pub struct AnnotationProcessorBuilder {
    configuration: Option<ConfigurationSource>,
    files: Vec<FilePair>,
    classpath: Vec<PathBuf>,
}

impl AnnotationProcessorBuilder {
    pub fn new() -> AnnotationProcessorBuilder {
        AnnotationProcessorBuilder::default()
    }

    pub fn configuration_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.configuration = Some(ConfigurationSource::File(path.into()));
        self
    }

    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(ConfigurationSource::Parsed(configuration));
        self
    }

    /// Transform a file (or directory) in place
    pub fn add_file_to_transform(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.add_input_output_map(path.clone(), path)
    }

    pub fn add_input_output_map(
        mut self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        self.files.push(FilePair::new(input, output));
        self
    }

    pub fn add_classpath_element(mut self, element: impl Into<PathBuf>) -> Self {
        self.classpath.push(element.into());
        self
    }

    pub fn add_classpath_elements<P: Into<PathBuf>>(
        mut self,
        elements: impl IntoIterator<Item = P>,
    ) -> Self {
        self.classpath.extend(elements.into_iter().map(Into::into));
        self
    }

    /// Parse the configuration and check every class it names
    ///
    /// Without a configuration, every policy is off and files are only copied.
    pub fn build(self) -> Result<AnnotationProcessor, ConfigError> {
        let configuration = match self.configuration {
            Some(ConfigurationSource::File(path)) => Configuration::parse_file(&path)?,
            Some(ConfigurationSource::Parsed(configuration)) => configuration,
            None => Configuration::default(),
        };

        let mut files = vec![];
        for pair in &self.files {
            files.extend(pair.expand()?);
        }

        let classpath = Classpath::new(self.classpath);
        let injectors = configuration.injectors(&classpath)?;
        Ok(AnnotationProcessor {
            files,
            classpath,
            injectors,
            model: Model::new(),
        })
    }
}

/// A batch of files to transform, with validated injectors
pub struct AnnotationProcessor {
    files: Vec<FilePair>,
    classpath: Classpath,
    injectors: Vec<Box<dyn Injector>>,
    model: Model,
}

impl AnnotationProcessor {
    /// Regular files to transform, directories already expanded
    pub fn files(&self) -> &[FilePair] {
        &self.files
    }

    /// Every class seen so far
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Populate the model, then transform every file
    ///
    /// A file that fails doesn't stop the batch. Failures are collected and reported together
    /// once every file has been through.
    pub fn process(&mut self) -> Result<(), ProcessError> {
        info!(
            "Reading classes from {} classpath elements and {} inputs",
            self.classpath.elements().len(),
            self.files.len()
        );
        for element in self.classpath.elements() {
            files::populate_model(&mut self.model, element)?;
        }
        for pair in &self.files {
            files::populate_model(&mut self.model, &pair.input)?;
        }
        info!("Model has {} classes", self.model.len());

        let processor = ClassFileProcessor {
            injectors: &self.injectors,
            model: &self.model,
            classpath: &self.classpath,
        };
        info!("Transforming {} files with {} injectors", self.files.len(), self.injectors.len());
        let mut errors = vec![];
        for pair in &self.files {
            if let Err(err) = files::process_file(pair, &processor) {
                error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProcessError::Batch(errors))
        }
    }
}
