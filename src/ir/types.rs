// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The class hierarchy and its subtype query.
//!
//! The element manager needs exactly one question answered about types:
//! whether an allocated object's class is a subtype of the throwable
//! supertype. The hierarchy is single inheritance, so the query walks the
//! superclass chain.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::ir::TypeId;
use crate::util::index_vec::{Idx, IndexVec};

// Well known class names treated in special ways.
pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const EXCEPTION: &str = "java.lang.Exception";
pub const ERROR: &str = "java.lang.Error";
pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";

lazy_static! {
    /// Classes every analyzed program is assumed to declare. Each entry names
    /// the class and its superclass; entries must precede their subclasses.
    static ref BOOTSTRAP_CLASSES: Vec<(&'static str, Option<&'static str>)> = vec![
        (OBJECT, None),
        (STRING, Some(OBJECT)),
        (THROWABLE, Some(OBJECT)),
        (EXCEPTION, Some(THROWABLE)),
        (ERROR, Some(THROWABLE)),
        (RUNTIME_EXCEPTION, Some(EXCEPTION)),
    ];
}

/// A class type and its position in the hierarchy.
#[derive(Clone, Debug)]
pub struct ClassType {
    pub name: Box<str>,
    pub superclass: Option<TypeId>,
}

/// The single-inheritance class hierarchy of the analyzed program.
pub struct ClassHierarchy {
    classes: IndexVec<TypeId, ClassType>,
    name_map: HashMap<Box<str>, TypeId>,
    object: TypeId,
    throwable: TypeId,
}

impl ClassHierarchy {
    pub fn new() -> ClassHierarchy {
        let mut hierarchy = ClassHierarchy {
            classes: IndexVec::new(),
            name_map: HashMap::new(),
            object: TypeId::from_u32(0),
            throwable: TypeId::from_u32(0),
        };
        for &(name, superclass) in BOOTSTRAP_CLASSES.iter() {
            let super_id = superclass.map(|s| hierarchy.name_map[s]);
            hierarchy.add_class(name, super_id);
        }
        hierarchy.object = hierarchy.name_map[OBJECT];
        hierarchy.throwable = hierarchy.name_map[THROWABLE];
        hierarchy
    }

    /// Registers a class. Registering the same name twice is a loader bug.
    pub fn add_class(&mut self, name: &str, superclass: Option<TypeId>) -> TypeId {
        assert!(
            !self.name_map.contains_key(name),
            "class {} registered twice",
            name
        );
        if let Some(superclass) = superclass {
            assert!(
                superclass.index() < self.classes.len(),
                "superclass {:?} of {} is not registered",
                superclass,
                name
            );
        }
        let id = self.classes.push(ClassType {
            name: name.into(),
            superclass,
        });
        self.name_map.insert(name.into(), id);
        id
    }

    pub fn get_class(&self, name: &str) -> Option<TypeId> {
        self.name_map.get(name).copied()
    }

    pub fn class(&self, id: TypeId) -> &ClassType {
        &self.classes[id]
    }

    /// The root of the hierarchy.
    #[inline]
    pub fn object(&self) -> TypeId {
        self.object
    }

    /// The well known throwable supertype.
    #[inline]
    pub fn throwable(&self) -> TypeId {
        self.throwable
    }

    /// Returns true if `sub` is `sup` or a transitive subclass of `sup`.
    pub fn is_subtype(&self, sup: TypeId, sub: TypeId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.classes[id].superclass;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bootstrap_classes_are_registered() {
        let hierarchy = ClassHierarchy::new();
        assert!(hierarchy.get_class(OBJECT).is_some());
        assert!(hierarchy.get_class(THROWABLE).is_some());
        assert_eq!(hierarchy.get_class(OBJECT), Some(hierarchy.object()));
        assert_eq!(hierarchy.get_class(THROWABLE), Some(hierarchy.throwable()));
    }

    #[test]
    fn subtype_walks_superclass_chain() {
        let mut hierarchy = ClassHierarchy::new();
        let throwable = hierarchy.throwable();
        let exception = hierarchy.get_class(EXCEPTION).unwrap();
        let io_exception = hierarchy.add_class("java.io.IOException", Some(exception));

        assert!(hierarchy.is_subtype(throwable, io_exception));
        assert!(hierarchy.is_subtype(hierarchy.object(), io_exception));
        assert!(hierarchy.is_subtype(throwable, throwable));
        assert!(!hierarchy.is_subtype(io_exception, throwable));

        let string = hierarchy.get_class(STRING).unwrap();
        assert!(!hierarchy.is_subtype(throwable, string));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_class_is_rejected() {
        let mut hierarchy = ClassHierarchy::new();
        let object = hierarchy.object();
        hierarchy.add_class("A", Some(object));
        hierarchy.add_class("A", Some(object));
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unknown_superclass_is_rejected() {
        let mut hierarchy = ClassHierarchy::new();
        hierarchy.add_class("B", Some(TypeId::from_u32(1000)));
    }
}
