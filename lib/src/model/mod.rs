//! Registry of every class seen in a batch
//!
//! Injectors use the model to answer questions that span the class hierarchy: does a method, or
//! any method it overrides, carry some annotation? With which property values? The registry is
//! filled completely before any class is rewritten, and read-only afterwards.
//!
//! Closures are computed on demand. A name that was never registered is a leaf of the closure, so
//! the walk stops at the edge of what the batch and its classpath contain.

mod errors;
mod facts;

pub use errors::*;
pub use facts::*;

use crate::jvm::{descriptor_to_internal, ClassNode, ElementValue};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

#[derive(Debug, Default)]
pub struct Model {
    classes: HashMap<String, ClassFact>,
}

impl Model {
    pub fn new() -> Model {
        Model::default()
    }

    /// Register a class, unless one with the same name is already known
    ///
    /// The first registration wins, so folding the same classpath entry in twice is harmless.
    pub fn update(&mut self, class: &ClassNode) {
        if !self.classes.contains_key(&class.name) {
            self.classes
                .insert(class.name.clone(), ClassFact::from_class(class));
        }
    }

    pub fn knows_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Registered facts about a class
    pub fn class(&self, class: &str) -> Option<&ClassFact> {
        self.classes.get(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn super_class_of(&self, class: &str) -> Result<Option<&str>, ModelError> {
        Ok(self.known(class)?.super_name.as_deref())
    }

    pub fn interfaces_of(&self, class: &str) -> Result<&[String], ModelError> {
        Ok(&self.known(class)?.interfaces)
    }

    /// Descriptors of the annotations on a class
    pub fn annotations_of_class(&self, class: &str) -> Result<BTreeSet<&str>, ModelError> {
        Ok(self
            .known(class)?
            .annotations
            .iter()
            .map(|annotation| annotation.descriptor.as_str())
            .collect())
    }

    pub fn has_method(&self, class: &str, method: &MethodSig) -> Result<bool, ModelError> {
        Ok(self.known(class)?.find_method(method).is_some())
    }

    /// Descriptors of the annotations on a method
    pub fn annotations_of_method(
        &self,
        class: &str,
        method: &MethodSig,
    ) -> Result<BTreeSet<&str>, ModelError> {
        Ok(self
            .known_method(class, method)?
            .annotations
            .iter()
            .map(|annotation| annotation.descriptor.as_str())
            .collect())
    }

    /// Property given explicitly on an annotation of a class
    ///
    /// The class must carry the annotation. The property is `None` when it is left to its
    /// default.
    pub fn annotation_property_of_class(
        &self,
        class: &str,
        annotation: &str,
        property: &str,
    ) -> Result<Option<&ElementValue>, ModelError> {
        let fact = self.known(class)?;
        let found = fact
            .find_annotation(annotation)
            .ok_or_else(|| ModelError::MissingClassAnnotation {
                class: class.to_owned(),
                annotation: annotation.to_owned(),
            })?;
        Ok(found.values.get(property))
    }

    /// Property given explicitly on an annotation of a method
    pub fn annotation_property_of_method(
        &self,
        class: &str,
        method: &MethodSig,
        annotation: &str,
        property: &str,
    ) -> Result<Option<&ElementValue>, ModelError> {
        let fact = self.known_method(class, method)?;
        let found = fact
            .find_annotation(annotation)
            .ok_or_else(|| ModelError::MissingMethodAnnotation {
                name: method.name.to_owned(),
                descriptor: method.descriptor.to_owned(),
                access: method.access_flags.bits(),
                annotation: annotation.to_owned(),
            })?;
        Ok(found.values.get(property))
    }

    /// Is the descriptor that of a registered annotation interface?
    pub fn knows_annotation(&self, annotation: &str) -> bool {
        descriptor_to_internal(annotation)
            .and_then(|name| self.classes.get(name))
            .map_or(false, ClassFact::is_annotation)
    }

    /// Properties of an annotation interface, mapped to their return descriptors
    pub fn annotation_properties(
        &self,
        annotation: &str,
    ) -> Result<BTreeMap<&str, &str>, ModelError> {
        Ok(self
            .known_annotation(annotation)?
            .methods
            .iter()
            .map(|method| (method.name.as_str(), method.return_descriptor()))
            .collect())
    }

    /// Declared default value of an annotation property
    pub fn annotation_default_value(
        &self,
        annotation: &str,
        property: &str,
    ) -> Result<Option<&ElementValue>, ModelError> {
        Ok(self
            .known_annotation(annotation)?
            .methods
            .iter()
            .filter(|method| method.name == property)
            .find_map(|method| method.default_value.as_ref()))
    }

    /// The class along with every superclass and superinterface the model knows about
    ///
    /// Names that aren't registered are still part of the closure, but their supertypes aren't.
    pub fn hierarchical_closure(&self, class: &str) -> BTreeSet<String> {
        let mut done = BTreeSet::new();
        let mut pending = VecDeque::new();
        pending.push_back(class.to_owned());

        while let Some(current) = pending.pop_front() {
            if done.contains(&current) {
                continue;
            }
            if let Some(fact) = self.classes.get(&current) {
                pending.extend(fact.super_name.iter().cloned());
                pending.extend(fact.interfaces.iter().cloned());
            }
            done.insert(current);
        }

        done
    }

    /// Members of the closure that declare the method (or one in the same override slot)
    pub fn hierarchical_method_closure(&self, class: &str, method: &MethodSig) -> BTreeSet<String> {
        self.hierarchical_closure(class)
            .into_iter()
            .filter(|name| self.declared_method(name, method).is_some())
            .collect()
    }

    /// Members of the closure annotated with `annotation`
    pub fn closure_with_annotation_filter(&self, class: &str, annotation: &str) -> BTreeSet<String> {
        self.hierarchical_closure(class)
            .into_iter()
            .filter(|name| {
                self.classes
                    .get(name)
                    .map_or(false, |fact| fact.find_annotation(annotation).is_some())
            })
            .collect()
    }

    /// Members of the closure whose version of the method is annotated with `annotation`
    pub fn method_closure_with_annotation_filter(
        &self,
        class: &str,
        method: &MethodSig,
        annotation: &str,
    ) -> BTreeSet<String> {
        self.hierarchical_method_closure(class, method)
            .into_iter()
            .filter(|name| {
                self.declared_method(name, method)
                    .map_or(false, |fact| fact.find_annotation(annotation).is_some())
            })
            .collect()
    }

    /// Like [`Self::closure_with_annotation_filter`], along with the value each class gives the
    /// property (classes that leave the property to its default are left out)
    pub fn closure_with_annotation_filter_and_value(
        &self,
        class: &str,
        annotation: &str,
        property: &str,
    ) -> Result<BTreeMap<String, ElementValue>, ModelError> {
        let mut values = BTreeMap::new();
        for name in self.closure_with_annotation_filter(class, annotation) {
            if let Some(value) = self.annotation_property_of_class(&name, annotation, property)? {
                values.insert(name.clone(), value.clone());
            }
        }
        Ok(values)
    }

    /// Like [`Self::method_closure_with_annotation_filter`], along with the value each class's
    /// version of the method gives the property
    pub fn method_closure_with_annotation_filter_and_value(
        &self,
        class: &str,
        method: &MethodSig,
        annotation: &str,
        property: &str,
    ) -> Result<BTreeMap<String, ElementValue>, ModelError> {
        let mut values = BTreeMap::new();
        for name in self.method_closure_with_annotation_filter(class, method, annotation) {
            if let Some(value) =
                self.annotation_property_of_method(&name, method, annotation, property)?
            {
                values.insert(name.clone(), value.clone());
            }
        }
        Ok(values)
    }

    fn known(&self, class: &str) -> Result<&ClassFact, ModelError> {
        self.classes
            .get(class)
            .ok_or_else(|| ModelError::UnknownClass(class.to_owned()))
    }

    fn known_method(&self, class: &str, method: &MethodSig) -> Result<&MethodFact, ModelError> {
        self.known(class)?
            .find_method(method)
            .ok_or_else(|| ModelError::UnknownMethod {
                class: class.to_owned(),
                name: method.name.to_owned(),
                descriptor: method.descriptor.to_owned(),
                access: method.access_flags.bits(),
            })
    }

    fn known_annotation(&self, annotation: &str) -> Result<&ClassFact, ModelError> {
        let name = descriptor_to_internal(annotation).unwrap_or(annotation);
        let fact = self.known(name)?;
        if fact.is_annotation() {
            Ok(fact)
        } else {
            Err(ModelError::NotAnAnnotation(annotation.to_owned()))
        }
    }

    fn declared_method(&self, class: &str, method: &MethodSig) -> Option<&MethodFact> {
        self.classes.get(class)?.find_method(method)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::{AnnotationNode, ClassAccessFlags, MethodAccessFlags, MethodNode, OBJECT};

    /// Bare class with the given supertypes
    pub(crate) fn class(name: &str, super_name: Option<&str>, interfaces: &[&str]) -> ClassNode {
        let mut class = ClassNode::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            name,
            super_name.map(String::from),
        );
        class.interfaces = interfaces.iter().map(|i| i.to_string()).collect();
        class
    }

    pub(crate) fn interface(name: &str, interfaces: &[&str]) -> ClassNode {
        let mut interface = class(name, Some(OBJECT), interfaces);
        interface.access_flags =
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        interface
    }

    pub(crate) fn annotated(descriptor: &str, values: &[(&str, ElementValue)]) -> AnnotationNode {
        let mut annotation = AnnotationNode::new(descriptor);
        annotation.values = values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        annotation
    }

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn first_registration_wins() {
        let mut model = Model::new();
        model.update(&class("a/A", Some(OBJECT), &[]));
        model.update(&class("a/A", Some("a/Other"), &["a/I"]));

        assert!(model.knows_class("a/A"));
        assert!(!model.knows_class("a/B"));
        assert_eq!(model.super_class_of("a/A"), Ok(Some(OBJECT)));
        assert!(
            model.interfaces_of("a/A").unwrap().is_empty(),
            "second registration should be ignored"
        );
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn unknown_classes() {
        let model = Model::new();
        assert_eq!(
            model.super_class_of("a/A").unwrap_err().to_string(),
            "Class 'a/A' is not known to the model"
        );
        assert_eq!(model.hierarchical_closure("a/A"), names(&["a/A"]));
    }

    #[test]
    fn diamond_closure() {
        let mut model = Model::new();
        model.update(&interface("a/A", &[]));
        model.update(&interface("a/B", &["a/A"]));
        model.update(&interface("a/C", &["a/A"]));
        model.update(&class("a/D", Some(OBJECT), &["a/B", "a/C"]));
        model.update(&class(OBJECT, None, &[]));

        assert_eq!(
            model.hierarchical_closure("a/D"),
            names(&["a/D", "a/B", "a/C", "a/A", OBJECT])
        );
        assert_eq!(model.hierarchical_closure("a/B"), names(&["a/B", "a/A", OBJECT]));
    }

    #[test]
    fn override_matching() {
        let mut model = Model::new();

        let mut base = class("a/Base", Some(OBJECT), &[]);
        base.methods
            .push(MethodNode::new(MethodAccessFlags::PRIVATE, "hidden", "()V"));
        base.methods
            .push(MethodNode::new(MethodAccessFlags::empty(), "widened", "()V"));
        model.update(&base);

        let mut sub = class("a/Sub", Some("a/Base"), &[]);
        sub.methods
            .push(MethodNode::new(MethodAccessFlags::PUBLIC, "hidden", "()V"));
        sub.methods
            .push(MethodNode::new(MethodAccessFlags::PUBLIC, "widened", "()V"));
        model.update(&sub);

        let hidden = MethodSig::new("hidden", "()V", MethodAccessFlags::PUBLIC);
        assert_eq!(
            model.hierarchical_method_closure("a/Sub", &hidden),
            names(&["a/Sub"]),
            "private methods are never overridden"
        );

        let widened = MethodSig::new("widened", "()V", MethodAccessFlags::PUBLIC);
        assert_eq!(
            model.hierarchical_method_closure("a/Sub", &widened),
            names(&["a/Base", "a/Sub"]),
            "widening visibility still overrides"
        );

        let statik = MethodSig::new("widened", "()V", MethodAccessFlags::STATIC);
        assert!(!model.has_method("a/Sub", &statik).unwrap());
        assert_eq!(
            model.annotations_of_method("a/Sub", &statik).unwrap_err().to_string(),
            "Class 'a/Sub' does not contain method widened()V with access 8"
        );
    }

    #[test]
    fn annotation_properties_and_values() {
        let mut model = Model::new();

        let mut marker = interface("a/Marker", &["java/lang/annotation/Annotation"]);
        marker.access_flags |= ClassAccessFlags::ANNOTATION;
        let mut limit = MethodNode::new(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            "limit",
            "()I",
        );
        limit.annotation_default = Some(ElementValue::Int(b'I', -1));
        marker.methods.push(limit);
        marker.methods.push(MethodNode::new(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            "name",
            "()Ljava/lang/String;",
        ));
        model.update(&marker);

        let mut base = interface("a/Base", &[]);
        base.invisible_annotations
            .push(annotated("La/Marker;", &[("limit", ElementValue::Int(b'I', 3))]));
        model.update(&base);

        let mut sub = class("a/Sub", Some(OBJECT), &["a/Base"]);
        sub.visible_annotations.push(annotated("La/Marker;", &[]));
        model.update(&sub);

        assert!(model.knows_annotation("La/Marker;"));
        assert!(!model.knows_annotation("La/Base;"));
        assert!(!model.knows_annotation("La/Unknown;"));
        assert_eq!(
            model.annotation_properties("La/Marker;").unwrap(),
            vec![("limit", "I"), ("name", "Ljava/lang/String;")]
                .into_iter()
                .collect::<BTreeMap<_, _>>()
        );
        assert_eq!(
            model.annotation_default_value("La/Marker;", "limit"),
            Ok(Some(&ElementValue::Int(b'I', -1)))
        );
        assert_eq!(model.annotation_default_value("La/Marker;", "name"), Ok(None));
        assert_eq!(
            model.annotation_properties("La/Base;").unwrap_err().to_string(),
            "Class La/Base; is not an annotation"
        );

        assert_eq!(
            model.closure_with_annotation_filter("a/Sub", "La/Marker;"),
            names(&["a/Base", "a/Sub"])
        );
        let values = model
            .closure_with_annotation_filter_and_value("a/Sub", "La/Marker;", "limit")
            .unwrap();
        assert_eq!(
            values.into_iter().collect::<Vec<_>>(),
            vec![(String::from("a/Base"), ElementValue::Int(b'I', 3))],
            "classes relying on the default are left out"
        );
        assert_eq!(
            model
                .annotation_property_of_class("a/Sub", "La/Other;", "limit")
                .unwrap_err()
                .to_string(),
            "Class 'a/Sub' does not have annotation with descriptor 'La/Other;'"
        );
    }

    #[test]
    fn method_annotation_closures() {
        let mut model = Model::new();
        let sig = MethodSig::new("run", "()V", MethodAccessFlags::PUBLIC);

        let mut base = interface("a/Base", &[]);
        let mut run = MethodNode::new(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            "run",
            "()V",
        );
        run.invisible_annotations
            .push(annotated("La/Timed;", &[("warn", ElementValue::Int(b'I', 10))]));
        base.methods.push(run);
        model.update(&base);

        let mut sub = class("a/Sub", Some(OBJECT), &["a/Base"]);
        let mut run = MethodNode::new(MethodAccessFlags::PUBLIC, "run", "()V");
        run.invisible_annotations.push(annotated("La/Timed;", &[]));
        sub.methods.push(run);
        model.update(&sub);

        assert_eq!(
            model.annotations_of_method("a/Base", &sig).unwrap(),
            vec!["La/Timed;"].into_iter().collect::<BTreeSet<_>>()
        );
        assert_eq!(
            model.method_closure_with_annotation_filter("a/Sub", &sig, "La/Timed;"),
            names(&["a/Base", "a/Sub"])
        );
        let values = model
            .method_closure_with_annotation_filter_and_value("a/Sub", &sig, "La/Timed;", "warn")
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("a/Base"), Some(&ElementValue::Int(b'I', 10)));
        assert_eq!(
            model
                .annotation_property_of_method("a/Sub", &sig, "La/Other;", "warn")
                .unwrap_err()
                .to_string(),
            "Method 'run()V' (access 1) does not have annotation with descriptor 'La/Other;'"
        );
    }
}
