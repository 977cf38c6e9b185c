// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The program representation consumed by the analysis core.
//!
//! Every base entity is registered once by the program loader and is referred
//! to afterwards through a dense id. The ids are the stable, comparable keys
//! the element manager interns against; the structs carry the payload the
//! analysis needs (declaring class, static type, allocating method).

use crate::util::index_vec::newtype_index;

pub mod analysis_context;
pub mod call_site;
pub mod types;

newtype_index!(
    /// The unique identifier for each class type.
    pub struct TypeId => "TypeId"
);

newtype_index!(
    /// The unique identifier for each method.
    pub struct MethodId => "MethodId"
);

newtype_index!(
    /// The unique identifier for each local variable.
    pub struct VarId => "VarId"
);

newtype_index!(
    /// The unique identifier for each field declaration.
    pub struct FieldId => "FieldId"
);

newtype_index!(
    /// The unique identifier for each call-site statement.
    pub struct InvokeId => "InvokeId"
);

newtype_index!(
    /// The unique identifier for each heap allocation site.
    pub struct ObjId => "ObjId"
);

/// A method declared by a class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub class: TypeId,
    pub name: Box<str>,
    pub is_static: bool,
}

/// A local variable or parameter of a method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Variable {
    pub method: MethodId,
    pub name: Box<str>,
}

/// A field declaration. Static fields are class-level and are analyzed
/// context insensitively.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub class: TypeId,
    pub name: Box<str>,
    pub ty: TypeId,
    pub is_static: bool,
}

/// An abstract heap object, identified by its allocation site.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Obj {
    /// The static type the allocation site instantiates.
    pub ty: TypeId,
    /// The method containing the allocation site.
    pub allocated_in: MethodId,
}
