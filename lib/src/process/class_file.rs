use crate::classpath::{BatchHierarchy, Classpath};
use crate::inject::Injector;
use crate::jvm::class_file::ClassFile;
use crate::jvm::ClassNode;
use crate::model::Model;
use crate::ProcessError;
use log::debug;

/// Is this a class file, judging by its name and first bytes?
pub fn is_class_file(name: &str, bytes: &[u8]) -> bool {
    name.ends_with(".class") && bytes.starts_with(&ClassFile::MAGIC)
}

/// Register the class in the model
pub fn update_model(model: &mut Model, bytes: &[u8]) -> Result<(), ProcessError> {
    let class = ClassNode::parse(bytes)?;
    model.update(&class);
    Ok(())
}

/// Runs every injector on one class at a time
pub struct ClassFileProcessor<'a> {
    pub injectors: &'a [Box<dyn Injector>],
    pub model: &'a Model,
    pub classpath: &'a Classpath,
}

impl<'a> ClassFileProcessor<'a> {
    /// Transform the bytes of one class file
    ///
    /// Frames of edited methods are recomputed against the batch's classes first, then the
    /// classpath.
    pub fn process(&self, bytes: &[u8]) -> Result<Vec<u8>, ProcessError> {
        let mut class = ClassNode::parse(bytes)?;
        debug!("Transforming {}", class.name);
        for injector in self.injectors {
            injector.process(&mut class, self.model)?;
        }

        let hierarchy = BatchHierarchy {
            model: self.model,
            classpath: self.classpath,
        };
        Ok(class.to_bytes(&hierarchy)?)
    }
}
