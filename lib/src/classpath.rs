//! Resolution of classes that are not part of the batch being transformed
//!
//! A [`Classpath`] is an ordered list of directories and jar files. Classes are loaded lazily by
//! internal name, reduced to a [`ClassHeader`], and cached for the lifetime of the classpath: the
//! cache only ever grows, so handing out plain references into it is fine.
//!
//! Assignability and common superclasses are computed over anything that can describe the shape
//! of a class, so the same walk serves both the classpath alone and the classpath extended with
//! the classes of the batch (see [`BatchHierarchy`]).

use crate::jvm::{
    AnnotationNode, ClassAccessFlags, ClassHierarchy, ClassNode, Error, MethodAccessFlags, ANNOTATION,
    CLASS, OBJECT, STRING, THROWABLE,
};
use crate::model::Model;
use elsa::FrozenMap;
use log::debug;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

/// What validation and hierarchy walks need to know about a class
#[derive(Debug, Clone)]
pub struct ClassHeader {
    pub access_flags: ClassAccessFlags,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodHeader>,

    /// Visible annotations first
    pub annotations: Vec<AnnotationNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHeader {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
}

impl ClassHeader {
    pub fn from_class(class: &ClassNode) -> ClassHeader {
        ClassHeader {
            access_flags: class.access_flags,
            name: class.name.clone(),
            super_name: class.super_name.clone(),
            interfaces: class.interfaces.clone(),
            methods: class
                .methods
                .iter()
                .map(|method| MethodHeader {
                    access_flags: method.access_flags,
                    name: method.name.clone(),
                    descriptor: method.descriptor.clone(),
                })
                .collect(),
            annotations: class.annotations().cloned().collect(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_public(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::PUBLIC)
    }

    pub fn find_annotation(&self, descriptor: &str) -> Option<&AnnotationNode> {
        self.annotations
            .iter()
            .find(|annotation| annotation.descriptor == descriptor)
    }

    /// Header of one of the `java.lang` types that are always known
    fn builtin(name: &str) -> Option<ClassHeader> {
        let (super_name, interfaces, access_flags): (Option<&str>, &[&str], ClassAccessFlags) =
            match name {
                OBJECT => (None, &[], ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER),
                THROWABLE | STRING | CLASS | "java/lang/Number" | "java/lang/Enum" => {
                    (Some(OBJECT), &[], ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER)
                }
                "java/lang/Exception" | "java/lang/Error" => {
                    (Some(THROWABLE), &[], ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER)
                }
                "java/lang/RuntimeException" => (
                    Some("java/lang/Exception"),
                    &[],
                    ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
                ),
                ANNOTATION | "java/lang/Runnable" => (
                    Some(OBJECT),
                    &[],
                    ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
                ),
                _ => return None,
            };
        Some(ClassHeader {
            access_flags,
            name: name.to_owned(),
            super_name: super_name.map(str::to_owned),
            interfaces: interfaces.iter().map(|interface| interface.to_string()).collect(),
            methods: vec![],
            annotations: vec![],
        })
    }
}

/// Ordered directories and jars, searched first to last
pub struct Classpath {
    elements: Vec<PathBuf>,

    /// Open archives, by position in `elements`
    archives: RefCell<HashMap<usize, ZipArchive<File>>>,
    cache: FrozenMap<String, Box<ClassHeader>>,
}

impl Classpath {
    pub fn new(elements: Vec<PathBuf>) -> Classpath {
        Classpath {
            elements,
            archives: RefCell::new(HashMap::new()),
            cache: FrozenMap::new(),
        }
    }

    pub fn elements(&self) -> &[PathBuf] {
        &self.elements
    }

    /// Find a class by internal name
    ///
    /// The first element that contains the class wins. Classes that are nowhere on the classpath
    /// fall back to the handful of `java.lang` types that are always known.
    pub fn load(&self, name: &str) -> Result<&ClassHeader, Error> {
        if let Some(header) = self.cache.get(name) {
            return Ok(header);
        }

        let file_name = format!("{}.class", name);
        for (index, element) in self.elements.iter().enumerate() {
            let bytes = if element.is_dir() {
                read_from_directory(element, &file_name)?
            } else if element.is_file() {
                self.read_from_archive(index, element, &file_name)?
            } else {
                None
            };
            if let Some(bytes) = bytes {
                debug!("Loaded {} from {}", name, element.display());
                let header = ClassHeader::from_class(&ClassNode::parse(&bytes)?);
                return Ok(self.cache.insert(name.to_owned(), Box::new(header)));
            }
        }

        match ClassHeader::builtin(name) {
            Some(header) => Ok(self.cache.insert(name.to_owned(), Box::new(header))),
            None => Err(Error::TypeNotFound(name.to_owned())),
        }
    }

    fn read_from_archive(
        &self,
        index: usize,
        path: &Path,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, Error> {
        let mut archives = self.archives.borrow_mut();
        if !archives.contains_key(&index) {
            let archive = ZipArchive::new(File::open(path)?).map_err(zip_error)?;
            archives.insert(index, archive);
        }
        let archive = match archives.get_mut(&index) {
            Some(archive) => archive,
            None => return Ok(None),
        };

        let mut entry = match archive.by_name(file_name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(zip_error(err)),
        };
        let mut bytes = vec![];
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }
}

fn read_from_directory(directory: &Path, file_name: &str) -> Result<Option<Vec<u8>>, Error> {
    let path = directory.join(file_name);
    if path.is_file() {
        Ok(Some(std::fs::read(path)?))
    } else {
        Ok(None)
    }
}

fn zip_error(err: ZipError) -> Error {
    Error::IoError(io::Error::new(io::ErrorKind::Other, err))
}

/// Superclass and interfaces of a class, wherever it was found
struct ClassShape<'a> {
    super_name: Option<&'a str>,
    interfaces: &'a [String],
    is_interface: bool,
}

trait ShapeSource {
    fn shape(&self, name: &str) -> Result<ClassShape<'_>, Error>;

    /// Can a value of type `sub_type` be assigned to `super_type`?
    fn is_assignable(&self, sub_type: &str, super_type: &str) -> Result<bool, Error> {
        if sub_type == super_type || super_type == OBJECT {
            return Ok(true);
        }

        let mut to_visit: Vec<String> = vec![sub_type.to_owned()];
        let mut dont_revisit: HashSet<String> = HashSet::new();
        dont_revisit.insert(sub_type.to_owned());

        while let Some(class) = to_visit.pop() {
            if class == super_type {
                return Ok(true);
            }
            let shape = self.shape(&class)?;
            let supers = shape.super_name.into_iter().chain(shape.interfaces.iter().map(String::as_str));
            for next in supers {
                if dont_revisit.insert(next.to_owned()) {
                    to_visit.push(next.to_owned());
                }
            }
        }

        Ok(false)
    }

    fn resolve_common_super_class(&self, class1: &str, class2: &str) -> Result<String, Error> {
        if self.is_assignable(class2, class1)? {
            return Ok(class1.to_owned());
        }
        if self.is_assignable(class1, class2)? {
            return Ok(class2.to_owned());
        }
        if self.shape(class1)?.is_interface || self.shape(class2)?.is_interface {
            return Ok(OBJECT.to_owned());
        }

        let mut current = class1.to_owned();
        loop {
            current = match self.shape(&current)?.super_name {
                Some(super_name) => super_name.to_owned(),
                None => return Ok(OBJECT.to_owned()),
            };
            if self.is_assignable(class2, &current)? {
                return Ok(current);
            }
        }
    }
}

impl ShapeSource for Classpath {
    fn shape(&self, name: &str) -> Result<ClassShape<'_>, Error> {
        let header = self.load(name)?;
        Ok(ClassShape {
            super_name: header.super_name.as_deref(),
            interfaces: &header.interfaces,
            is_interface: header.is_interface(),
        })
    }
}

impl ClassHierarchy for Classpath {
    fn common_super_class(&self, class1: &str, class2: &str) -> Result<String, Error> {
        self.resolve_common_super_class(class1, class2)
    }
}

/// Hierarchy of the classes in a batch, backed by the classpath for everything else
///
/// Classes being transformed are usually not on the classpath, but every one of them is in the
/// model by the time anything is written out.
pub struct BatchHierarchy<'a> {
    pub model: &'a Model,
    pub classpath: &'a Classpath,
}

impl<'a> ShapeSource for BatchHierarchy<'a> {
    fn shape(&self, name: &str) -> Result<ClassShape<'_>, Error> {
        match self.model.class(name) {
            Some(class) => Ok(ClassShape {
                super_name: class.super_name.as_deref(),
                interfaces: &class.interfaces,
                is_interface: class.is_interface(),
            }),
            None => self.classpath.shape(name),
        }
    }
}

impl<'a> ClassHierarchy for BatchHierarchy<'a> {
    fn common_super_class(&self, class1: &str, class2: &str) -> Result<String, Error> {
        self.resolve_common_super_class(class1, class2)
    }
}
