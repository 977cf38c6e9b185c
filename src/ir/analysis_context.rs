// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;
use std::collections::HashMap;

use crate::ir::call_site::{DispatchKind, Invoke};
use crate::ir::types::ClassHierarchy;
use crate::ir::{Field, FieldId, InvokeId, Method, MethodId, Obj, ObjId, TypeId, Variable, VarId};
use crate::util::index_vec::IndexVec;
use crate::util::options::AnalysisOptions;

/// Global information of one analysis run.
///
/// One `AnalysisContext` is created per run and handed to the element
/// manager and the context strategy; independent runs never share state.
pub struct AnalysisContext {
    /// Options of the analysis.
    pub analysis_options: AnalysisOptions,

    /// The class hierarchy of the analyzed program.
    pub types: ClassHierarchy,

    methods: IndexVec<MethodId, Method>,
    vars: IndexVec<VarId, Variable>,
    fields: IndexVec<FieldId, Field>,
    invokes: IndexVec<InvokeId, Invoke>,
    objs: IndexVec<ObjId, Obj>,

    /// Record the next call-site ordinal for each method.
    invoke_indexer: HashMap<MethodId, usize>,
}

impl AnalysisContext {
    pub fn new(analysis_options: AnalysisOptions) -> Self {
        info!("Initializing AnalysisContext");
        Self {
            analysis_options,
            types: ClassHierarchy::new(),
            methods: IndexVec::new(),
            vars: IndexVec::new(),
            fields: IndexVec::new(),
            invokes: IndexVec::new(),
            objs: IndexVec::new(),
            invoke_indexer: HashMap::new(),
        }
    }

    pub fn new_method(&mut self, class: TypeId, name: &str, is_static: bool) -> MethodId {
        self.methods.push(Method {
            class,
            name: name.into(),
            is_static,
        })
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id]
    }

    pub fn new_var(&mut self, method: MethodId, name: &str) -> VarId {
        self.vars.push(Variable {
            method,
            name: name.into(),
        })
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id]
    }

    pub fn new_field(
        &mut self,
        class: TypeId,
        name: &str,
        ty: TypeId,
        is_static: bool,
    ) -> FieldId {
        self.fields.push(Field {
            class,
            name: name.into(),
            ty,
            is_static,
        })
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id]
    }

    /// Registers a call-site statement in `caller`'s body. Ordinals are
    /// assigned per caller, in registration order.
    pub fn new_invoke(&mut self, caller: MethodId, kind: DispatchKind) -> InvokeId {
        let ordinal = self.invoke_indexer.entry(caller).or_insert(0);
        let invoke = Invoke::new(caller, *ordinal, kind);
        *ordinal += 1;
        self.invokes.push(invoke)
    }

    pub fn invoke(&self, id: InvokeId) -> &Invoke {
        &self.invokes[id]
    }

    pub fn new_obj(&mut self, ty: TypeId, allocated_in: MethodId) -> ObjId {
        self.objs.push(Obj { ty, allocated_in })
    }

    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id]
    }

    /// Finds a method by name; used to locate the entry point.
    pub fn find_method_by_name(&self, name: &str) -> Option<MethodId> {
        self.methods
            .iter_enumerated()
            .find(|(_, m)| &*m.name == name)
            .map(|(id, _)| id)
    }

    /// The entry method named by the options, if registered.
    pub fn entry_point(&self) -> Option<MethodId> {
        if self.analysis_options.entry_func.is_empty() {
            return None;
        }
        let entry = self.find_method_by_name(&self.analysis_options.entry_func);
        if entry.is_none() {
            error!("Entry point not found");
        }
        entry
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }
}
