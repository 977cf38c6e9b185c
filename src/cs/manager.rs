// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Manages the context-sensitive elements by maintaining the base entities
//! and their context-sensitive counterparts in interning tables.

use log::*;
use std::collections::HashMap;
use std::rc::Rc;

use crate::cs::context::ContextId;
use crate::cs::element::{
    ArrayIndex, CSCallSite, CSMethod, CSMethodId, CSObj, CSObjId, CSVar, InstanceField, Pointer,
    PointerId, StaticField,
};
use crate::cs::Indexer;
use crate::ir::analysis_context::AnalysisContext;
use crate::ir::{FieldId, InvokeId, MethodId, ObjId, VarId};
use crate::util::index_vec::{Idx, IndexVec};
use crate::util::slot_vec::SlotVec;

/// Number of indexes reserved for throwable objects.
///
/// Throwable objects are allocated at a very large number of program and
/// context combinations but contribute little precision. Packing them into a
/// small fixed prefix of the object index space keeps the general range free
/// of that noise.
pub const THROWABLE_BUDGET: usize = 2048;

/// Initial capacity of the object store.
const OBJ_STORE_INIT_CAPACITY: usize = 65536;

/// The facade over all interning tables of one analysis run.
///
/// Every `get_*` operation is idempotent: the first call for a key creates
/// the canonical wrapper and assigns its index, every later call returns the
/// same wrapper.
pub struct CSManager {
    pointers: PointerManager,
    objs: CSObjManager,
    methods: CSMethodManager,
    call_sites: HashMap<(InvokeId, ContextId), Rc<CSCallSite>>,
}

impl CSManager {
    pub fn new() -> CSManager {
        CSManager {
            pointers: PointerManager::new(),
            objs: CSObjManager::new(),
            methods: CSMethodManager::new(),
            call_sites: HashMap::new(),
        }
    }

    pub fn get_cs_var(&mut self, cid: ContextId, var: VarId) -> Rc<CSVar> {
        self.pointers.get_cs_var(cid, var)
    }

    pub fn get_static_field(&mut self, field: FieldId) -> Rc<StaticField> {
        self.pointers.get_static_field(field)
    }

    pub fn get_instance_field(&mut self, base: &Rc<CSObj>, field: FieldId) -> Rc<InstanceField> {
        self.pointers.get_instance_field(base, field)
    }

    pub fn get_array_index(&mut self, array: &Rc<CSObj>) -> Rc<ArrayIndex> {
        self.pointers.get_array_index(array)
    }

    /// All base variables ever observed, context erased.
    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.pointers.vars.keys().copied()
    }

    pub fn cs_vars(&self) -> impl Iterator<Item = &Rc<CSVar>> + '_ {
        self.pointers.vars.values().flat_map(|by_ctx| by_ctx.values())
    }

    /// All context-sensitive variants of `var`.
    pub fn cs_vars_of(&self, var: VarId) -> impl Iterator<Item = &Rc<CSVar>> + '_ {
        self.pointers
            .vars
            .get(&var)
            .into_iter()
            .flat_map(|by_ctx| by_ctx.values())
    }

    pub fn static_fields(&self) -> impl Iterator<Item = &Rc<StaticField>> + '_ {
        self.pointers.static_fields.values()
    }

    pub fn instance_fields(&self) -> impl Iterator<Item = &Rc<InstanceField>> + '_ {
        self.pointers.instance_fields.values()
    }

    pub fn array_indexes(&self) -> impl Iterator<Item = &Rc<ArrayIndex>> + '_ {
        self.pointers.array_indexes.values()
    }

    /// Number of pointers created so far, over all four kinds.
    pub fn num_pointers(&self) -> usize {
        self.pointers.pointers.len()
    }

    pub fn get_cs_obj(
        &mut self,
        acx: &AnalysisContext,
        heap_cid: ContextId,
        obj: ObjId,
    ) -> Rc<CSObj> {
        self.objs.get_cs_obj(acx, heap_cid, obj)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Rc<CSObj>> + '_ {
        self.objs.objs.values()
    }

    pub fn num_objects(&self) -> usize {
        self.objs.objs.len()
    }

    pub fn get_cs_method(&mut self, cid: ContextId, method: MethodId) -> Rc<CSMethod> {
        self.methods.get_cs_method(cid, method)
    }

    pub fn cs_methods(&self) -> impl Iterator<Item = &Rc<CSMethod>> + '_ {
        self.methods.methods.iter()
    }

    pub fn num_cs_methods(&self) -> usize {
        self.methods.methods.len()
    }

    pub fn get_cs_call_site(&mut self, cid: ContextId, invoke: InvokeId) -> Rc<CSCallSite> {
        self.call_sites
            .entry((invoke, cid))
            .or_insert_with(|| Rc::new(CSCallSite::new(invoke, cid)))
            .clone()
    }

    pub fn cs_call_sites(&self) -> impl Iterator<Item = &Rc<CSCallSite>> + '_ {
        self.call_sites.values()
    }

    pub fn num_cs_call_sites(&self) -> usize {
        self.call_sites.len()
    }

    pub fn pointer_indexer(&self) -> &PointerManager {
        &self.pointers
    }

    pub fn object_indexer(&self) -> &CSObjManager {
        &self.objs
    }

    pub fn method_indexer(&self) -> &CSMethodManager {
        &self.methods
    }
}

impl Default for CSManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Interns the four pointer kinds.
///
/// One counter is shared by all kinds so the propagation engine can store
/// points-to sets for every pointer in a single flat array.
pub struct PointerManager {
    vars: HashMap<VarId, HashMap<ContextId, Rc<CSVar>>>,
    static_fields: HashMap<FieldId, Rc<StaticField>>,
    instance_fields: HashMap<(CSObjId, FieldId), Rc<InstanceField>>,
    array_indexes: HashMap<CSObjId, Rc<ArrayIndex>>,
    /// Pointers of all kinds, in index order.
    pointers: IndexVec<PointerId, Pointer>,
}

impl PointerManager {
    fn new() -> PointerManager {
        PointerManager {
            vars: HashMap::new(),
            static_fields: HashMap::new(),
            instance_fields: HashMap::new(),
            array_indexes: HashMap::new(),
            pointers: IndexVec::new(),
        }
    }

    fn get_cs_var(&mut self, cid: ContextId, var: VarId) -> Rc<CSVar> {
        if let Some(cs_var) = self.vars.get(&var).and_then(|by_ctx| by_ctx.get(&cid)) {
            return cs_var.clone();
        }
        let index = self.pointers.next_index();
        let cs_var = Rc::new(CSVar::new(var, cid, index));
        self.pointers.push(Pointer::Var(cs_var.clone()));
        self.vars
            .entry(var)
            .or_default()
            .insert(cid, cs_var.clone());
        cs_var
    }

    fn get_static_field(&mut self, field: FieldId) -> Rc<StaticField> {
        if let Some(sfield) = self.static_fields.get(&field) {
            return sfield.clone();
        }
        let index = self.pointers.next_index();
        let sfield = Rc::new(StaticField::new(field, index));
        self.pointers.push(Pointer::StaticField(sfield.clone()));
        self.static_fields.insert(field, sfield.clone());
        sfield
    }

    fn get_instance_field(&mut self, base: &Rc<CSObj>, field: FieldId) -> Rc<InstanceField> {
        if let Some(ifield) = self.instance_fields.get(&(base.index, field)) {
            return ifield.clone();
        }
        let index = self.pointers.next_index();
        let ifield = Rc::new(InstanceField::new(base.clone(), field, index));
        self.pointers.push(Pointer::InstanceField(ifield.clone()));
        self.instance_fields
            .insert((base.index, field), ifield.clone());
        ifield
    }

    fn get_array_index(&mut self, array: &Rc<CSObj>) -> Rc<ArrayIndex> {
        if let Some(aindex) = self.array_indexes.get(&array.index) {
            return aindex.clone();
        }
        let index = self.pointers.next_index();
        let aindex = Rc::new(ArrayIndex::new(array.clone(), index));
        self.pointers.push(Pointer::ArrayIndex(aindex.clone()));
        self.array_indexes.insert(array.index, aindex.clone());
        aindex
    }
}

impl Indexer<Pointer> for PointerManager {
    type Id = PointerId;

    fn index_of(&self, entity: &Pointer) -> PointerId {
        entity.index()
    }

    fn entity_at(&self, id: PointerId) -> Option<Pointer> {
        self.pointers.get(id).cloned()
    }
}

/// Interns context-sensitive objects.
///
/// The index space is partitioned: objects whose static type is a subtype of
/// the throwable supertype draw indexes from a reserved low range until the
/// budget is exhausted; everything else draws from a counter that starts past
/// the budget, so the two ranges never collide.
pub struct CSObjManager {
    objs: HashMap<(ObjId, ContextId), Rc<CSObj>>,
    /// Maps index to CSObj. The reserved range leaves empty slots, so a slot
    /// store (instead of an append-only list) is used.
    store: SlotVec<CSObjId, Rc<CSObj>>,
    /// Counter for indexes reserved for throwable objects.
    throwable_counter: usize,
    /// Counter for all other objects.
    counter: usize,
}

impl CSObjManager {
    fn new() -> CSObjManager {
        CSObjManager {
            objs: HashMap::new(),
            store: SlotVec::with_capacity(OBJ_STORE_INIT_CAPACITY),
            throwable_counter: 0,
            counter: THROWABLE_BUDGET,
        }
    }

    fn get_cs_obj(&mut self, acx: &AnalysisContext, heap_cid: ContextId, obj: ObjId) -> Rc<CSObj> {
        if let Some(cs_obj) = self.objs.get(&(obj, heap_cid)) {
            return cs_obj.clone();
        }
        let index = self.next_obj_index(acx, obj);
        let cs_obj = Rc::new(CSObj::new(obj, heap_cid, index));
        let old_capacity = self.store.capacity();
        self.store.insert(index, cs_obj.clone());
        if self.store.capacity() != old_capacity {
            debug!(
                "Object store grown from {} to {} slots",
                old_capacity,
                self.store.capacity()
            );
        }
        self.objs.insert((obj, heap_cid), cs_obj.clone());
        cs_obj
    }

    fn next_obj_index(&mut self, acx: &AnalysisContext, obj: ObjId) -> CSObjId {
        let obj_ty = acx.obj(obj).ty;
        if acx.types.is_subtype(acx.types.throwable(), obj_ty)
            && self.throwable_counter < THROWABLE_BUDGET
        {
            let index = self.throwable_counter;
            self.throwable_counter += 1;
            CSObjId::new(index)
        } else {
            let index = self.counter;
            self.counter += 1;
            CSObjId::new(index)
        }
    }

    fn store_capacity(&self) -> usize {
        self.store.capacity()
    }
}

impl Indexer<Rc<CSObj>> for CSObjManager {
    type Id = CSObjId;

    fn index_of(&self, entity: &Rc<CSObj>) -> CSObjId {
        entity.index
    }

    fn entity_at(&self, id: CSObjId) -> Option<Rc<CSObj>> {
        self.store.get(id).cloned()
    }
}

/// Interns context-sensitive methods.
///
/// Methods are far fewer than allocation events, so a single counter and an
/// append-only list suffice.
pub struct CSMethodManager {
    method_map: HashMap<(MethodId, ContextId), Rc<CSMethod>>,
    methods: IndexVec<CSMethodId, Rc<CSMethod>>,
}

impl CSMethodManager {
    fn new() -> CSMethodManager {
        CSMethodManager {
            method_map: HashMap::new(),
            methods: IndexVec::new(),
        }
    }

    fn get_cs_method(&mut self, cid: ContextId, method: MethodId) -> Rc<CSMethod> {
        if let Some(cs_method) = self.method_map.get(&(method, cid)) {
            return cs_method.clone();
        }
        let index = self.methods.next_index();
        let cs_method = Rc::new(CSMethod::new(method, cid, index));
        self.methods.push(cs_method.clone());
        self.method_map.insert((method, cid), cs_method.clone());
        cs_method
    }
}

impl Indexer<Rc<CSMethod>> for CSMethodManager {
    type Id = CSMethodId;

    fn index_of(&self, entity: &Rc<CSMethod>) -> CSMethodId {
        entity.index
    }

    fn entity_at(&self, id: CSMethodId) -> Option<Rc<CSMethod>> {
        self.methods.get(id).cloned()
    }
}
