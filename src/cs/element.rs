// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The context-sensitive counterparts of the base program entities.
//!
//! Every wrapper pairs a base entity with the [`ContextId`] it was observed
//! under and, where the propagation engine stores per-entity results in flat
//! arrays, a dense index assigned at creation. Wrappers are interned by
//! [`CSManager`](crate::cs::manager::CSManager), so equality of two wrappers
//! coincides with identity for all wrappers ever produced in one run.

use std::rc::Rc;

use crate::cs::context::ContextId;
use crate::ir::{FieldId, InvokeId, MethodId, ObjId, VarId};
use crate::util::index_vec::newtype_index;

newtype_index!(
    /// The index of a pointer in the flat pointer array.
    ///
    /// All four pointer kinds share this index space.
    pub struct PointerId => "PointerId"
);

newtype_index!(
    /// The index of a context-sensitive object.
    pub struct CSObjId => "CSObjId"
);

newtype_index!(
    /// The index of a context-sensitive method.
    pub struct CSMethodId => "CSMethodId"
);

/// A variable observed under a context.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSVar {
    pub var: VarId,
    pub cid: ContextId,
    pub index: PointerId,
}

impl CSVar {
    pub fn new(var: VarId, cid: ContextId, index: PointerId) -> Self {
        CSVar { var, cid, index }
    }
}

/// A static field. Static fields are class-level and carry no context.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StaticField {
    pub field: FieldId,
    pub index: PointerId,
}

impl StaticField {
    pub fn new(field: FieldId, index: PointerId) -> Self {
        StaticField { field, index }
    }
}

/// An instance field of a context-sensitive object.
///
/// The base object already encodes the relevant heap sensitivity, so the
/// key is (base, field) rather than (object, field, context).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct InstanceField {
    pub base: Rc<CSObj>,
    pub field: FieldId,
    pub index: PointerId,
}

impl InstanceField {
    pub fn new(base: Rc<CSObj>, field: FieldId, index: PointerId) -> Self {
        InstanceField { base, field, index }
    }
}

/// The single abstract slot standing for all indices of a context-sensitive
/// array object.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayIndex {
    pub array: Rc<CSObj>,
    pub index: PointerId,
}

impl ArrayIndex {
    pub fn new(array: Rc<CSObj>, index: PointerId) -> Self {
        ArrayIndex { array, index }
    }
}

/// A heap object abstracted under a heap context.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSObj {
    pub obj: ObjId,
    pub cid: ContextId,
    pub index: CSObjId,
}

impl CSObj {
    pub fn new(obj: ObjId, cid: ContextId, index: CSObjId) -> Self {
        CSObj { obj, cid, index }
    }
}

/// A method invocation instance under a context.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSMethod {
    pub method: MethodId,
    pub cid: ContextId,
    pub index: CSMethodId,
}

impl CSMethod {
    pub fn new(method: MethodId, cid: ContextId, index: CSMethodId) -> Self {
        CSMethod { method, cid, index }
    }
}

/// A call-site statement observed under a context.
///
/// Call sites are only ever looked up by key, so they carry no index.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSCallSite {
    pub invoke: InvokeId,
    pub cid: ContextId,
}

impl CSCallSite {
    pub fn new(invoke: InvokeId, cid: ContextId) -> Self {
        CSCallSite { invoke, cid }
    }
}

/// The closed family of pointer kinds sharing the [`PointerId`] space.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Pointer {
    Var(Rc<CSVar>),
    StaticField(Rc<StaticField>),
    InstanceField(Rc<InstanceField>),
    ArrayIndex(Rc<ArrayIndex>),
}

impl Pointer {
    /// The index of this pointer in the shared pointer index space.
    pub fn index(&self) -> PointerId {
        match self {
            Pointer::Var(v) => v.index,
            Pointer::StaticField(f) => f.index,
            Pointer::InstanceField(f) => f.index,
            Pointer::ArrayIndex(a) => a.index,
        }
    }
}
