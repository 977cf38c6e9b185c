// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context selection strategies.
//!
//! A strategy decides, for every call edge, the context under which the
//! callee executes, and for every allocation, the heap context under which
//! the new object is abstracted. Strategies are pure functions of their
//! arguments; the only state they carry is the cache interning the contexts
//! they produce.

use std::rc::Rc;

use crate::cs::context::{Context, ContextCache, ContextElement, ContextId, EMPTY_CONTEXT_ID};
use crate::cs::element::{CSCallSite, CSMethod, CSObj};
use crate::ir::{InvokeId, MethodId, ObjId};

pub trait ContextStrategy {
    type E: ContextElement;

    fn context_cache(&self) -> &ContextCache<Self::E>;

    fn context_cache_mut(&mut self) -> &mut ContextCache<Self::E>;

    /// Selects the callee context for a statically bound call. The receiver
    /// plays no role in dispatch, so none is given.
    fn select_context(
        &mut self,
        callsite: &Rc<CSCallSite>,
        callee: MethodId,
    ) -> Rc<Context<Self::E>>;

    /// Selects the callee context for a virtually dispatched call on `recv`.
    fn select_context_with_receiver(
        &mut self,
        callsite: &Rc<CSCallSite>,
        recv: &Rc<CSObj>,
        callee: MethodId,
    ) -> Rc<Context<Self::E>>;

    /// Selects the heap context for `obj`, allocated while executing
    /// `method`. Policies without heap sensitivity keep the default.
    fn select_heap_context(&mut self, _method: &Rc<CSMethod>, _obj: ObjId) -> Rc<Context<Self::E>> {
        self.empty_context()
    }

    /// The distinguished empty context, used for analysis entry points.
    fn empty_context(&self) -> Rc<Context<Self::E>> {
        self.get_context_by_id(EMPTY_CONTEXT_ID)
    }

    fn get_empty_context_id(&self) -> ContextId {
        EMPTY_CONTEXT_ID
    }

    fn get_context_id(&mut self, context: &Rc<Context<Self::E>>) -> ContextId {
        self.context_cache_mut().get_context_id(context)
    }

    fn get_context_by_id(&self, cid: ContextId) -> Rc<Context<Self::E>> {
        match self.context_cache().get_context(cid) {
            Some(context) => context,
            None => panic!("{:?} was never issued by this strategy", cid),
        }
    }
}

/// 1-call-site-sensitivity with no heap context.
///
/// The callee context is exactly the call-site statement of the caller's
/// context-sensitive call site; the caller's own context is discarded, so
/// contexts never grow beyond one element. All objects allocated at one site
/// are merged into a single heap abstraction.
pub struct OneCallSiteSensitive {
    cache: ContextCache<InvokeId>,
}

impl OneCallSiteSensitive {
    pub fn new() -> Self {
        OneCallSiteSensitive {
            cache: ContextCache::new(),
        }
    }
}

impl Default for OneCallSiteSensitive {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStrategy for OneCallSiteSensitive {
    type E = InvokeId;

    fn context_cache(&self) -> &ContextCache<InvokeId> {
        &self.cache
    }

    fn context_cache_mut(&mut self) -> &mut ContextCache<InvokeId> {
        &mut self.cache
    }

    fn select_context(
        &mut self,
        callsite: &Rc<CSCallSite>,
        _callee: MethodId,
    ) -> Rc<Context<InvokeId>> {
        Context::from_elem(callsite.invoke)
    }

    fn select_context_with_receiver(
        &mut self,
        callsite: &Rc<CSCallSite>,
        _recv: &Rc<CSObj>,
        _callee: MethodId,
    ) -> Rc<Context<InvokeId>> {
        Context::from_elem(callsite.invoke)
    }
}

/// k-call-site-sensitivity: the callee context is the k newest call sites of
/// the call chain; heap contexts keep the hk newest elements of the
/// allocating method's context.
pub struct KCallSiteSensitive {
    k: usize,
    hk: usize,
    cache: ContextCache<InvokeId>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize, hk: usize) -> Self {
        assert!(k >= 1, "call-site sensitivity requires a depth of at least 1");
        KCallSiteSensitive {
            k,
            hk,
            cache: ContextCache::new(),
        }
    }
}

impl ContextStrategy for KCallSiteSensitive {
    type E = InvokeId;

    fn context_cache(&self) -> &ContextCache<InvokeId> {
        &self.cache
    }

    fn context_cache_mut(&mut self) -> &mut ContextCache<InvokeId> {
        &mut self.cache
    }

    fn select_context(
        &mut self,
        callsite: &Rc<CSCallSite>,
        _callee: MethodId,
    ) -> Rc<Context<InvokeId>> {
        let caller_context = self.get_context_by_id(callsite.cid);
        Context::new_k_limited(&caller_context, callsite.invoke, self.k)
    }

    fn select_context_with_receiver(
        &mut self,
        callsite: &Rc<CSCallSite>,
        _recv: &Rc<CSObj>,
        callee: MethodId,
    ) -> Rc<Context<InvokeId>> {
        self.select_context(callsite, callee)
    }

    fn select_heap_context(&mut self, method: &Rc<CSMethod>, _obj: ObjId) -> Rc<Context<InvokeId>> {
        let method_context = self.get_context_by_id(method.cid);
        Context::k_limited(&method_context, self.hk)
    }
}

/// k-object-sensitivity: the callee context of a virtual call is derived
/// from the receiver's allocation site and heap context; statically bound
/// calls inherit the caller's context.
pub struct KObjectSensitive {
    k: usize,
    hk: usize,
    cache: ContextCache<ObjId>,
}

impl KObjectSensitive {
    pub fn new(k: usize, hk: usize) -> Self {
        assert!(k >= 1, "object sensitivity requires a depth of at least 1");
        KObjectSensitive {
            k,
            hk,
            cache: ContextCache::new(),
        }
    }
}

impl ContextStrategy for KObjectSensitive {
    type E = ObjId;

    fn context_cache(&self) -> &ContextCache<ObjId> {
        &self.cache
    }

    fn context_cache_mut(&mut self) -> &mut ContextCache<ObjId> {
        &mut self.cache
    }

    fn select_context(
        &mut self,
        callsite: &Rc<CSCallSite>,
        _callee: MethodId,
    ) -> Rc<Context<ObjId>> {
        let caller_context = self.get_context_by_id(callsite.cid);
        Context::k_limited(&caller_context, self.k)
    }

    fn select_context_with_receiver(
        &mut self,
        _callsite: &Rc<CSCallSite>,
        recv: &Rc<CSObj>,
        _callee: MethodId,
    ) -> Rc<Context<ObjId>> {
        let recv_heap_context = self.get_context_by_id(recv.cid);
        Context::new_k_limited(&recv_heap_context, recv.obj, self.k)
    }

    fn select_heap_context(&mut self, method: &Rc<CSMethod>, _obj: ObjId) -> Rc<Context<ObjId>> {
        let method_context = self.get_context_by_id(method.cid);
        Context::k_limited(&method_context, self.hk)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cs::manager::CSManager;
    use crate::ir::analysis_context::AnalysisContext;
    use crate::ir::call_site::DispatchKind;
    use crate::ir::TypeId;
    use crate::util::options::AnalysisOptions;

    struct TestWorld {
        acx: AnalysisContext,
        manager: CSManager,
        class: TypeId,
        caller: MethodId,
        callee: MethodId,
    }

    fn test_world() -> TestWorld {
        let mut acx = AnalysisContext::new(AnalysisOptions::default());
        let object = acx.types.object();
        let class = acx.types.add_class("A", Some(object));
        let caller = acx.new_method(class, "caller", false);
        let callee = acx.new_method(class, "callee", false);
        TestWorld {
            acx,
            manager: CSManager::new(),
            class,
            caller,
            callee,
        }
    }

    #[test]
    fn one_call_site_wraps_exactly_the_call_site() {
        let mut world = test_world();
        let invoke = world.acx.new_invoke(world.caller, DispatchKind::Virtual);
        let outer = world.acx.new_invoke(world.caller, DispatchKind::Static);

        let mut strategy = OneCallSiteSensitive::new();

        // The caller is itself analyzed under a non-empty context.
        let caller_cid = strategy.get_context_id(&Context::from_elem(outer));
        let callsite = world.manager.get_cs_call_site(caller_cid, invoke);

        let selected = strategy.select_context(&callsite, world.callee);
        assert_eq!(selected.elems(), &[invoke]);

        // The same context is selected regardless of the caller context.
        let other_callsite = world
            .manager
            .get_cs_call_site(strategy.get_empty_context_id(), invoke);
        let selected2 = strategy.select_context(&other_callsite, world.callee);
        assert_eq!(selected, selected2);

        // The receiver does not matter either.
        let o = world.acx.new_obj(world.class, world.caller);
        let recv_cid = strategy.get_empty_context_id();
        let recv = world.manager.get_cs_obj(&world.acx, recv_cid, o);
        let selected3 = strategy.select_context_with_receiver(&callsite, &recv, world.callee);
        assert_eq!(selected, selected3);
    }

    #[test]
    fn one_call_site_has_no_heap_context() {
        let mut world = test_world();
        let invoke = world.acx.new_invoke(world.caller, DispatchKind::Static);
        let o = world.acx.new_obj(world.class, world.callee);

        let mut strategy = OneCallSiteSensitive::new();
        let cid = strategy.get_context_id(&Context::from_elem(invoke));
        let cs_method = world.manager.get_cs_method(cid, world.callee);

        let heap_context = strategy.select_heap_context(&cs_method, o);
        assert!(heap_context.is_empty());
        assert_eq!(heap_context, strategy.empty_context());
    }

    #[test]
    fn k_call_site_builds_bounded_chains() {
        let mut world = test_world();
        let i1 = world.acx.new_invoke(world.caller, DispatchKind::Static);
        let i2 = world.acx.new_invoke(world.caller, DispatchKind::Static);
        let i3 = world.acx.new_invoke(world.caller, DispatchKind::Static);

        let mut strategy = KCallSiteSensitive::new(2, 1);

        let empty = strategy.get_empty_context_id();
        let cs1 = world.manager.get_cs_call_site(empty, i1);
        let ctx1 = strategy.select_context(&cs1, world.callee);
        assert_eq!(ctx1.elems(), &[i1]);

        let cid1 = strategy.get_context_id(&ctx1);
        let cs2 = world.manager.get_cs_call_site(cid1, i2);
        let ctx2 = strategy.select_context(&cs2, world.callee);
        assert_eq!(ctx2.elems(), &[i2, i1]);

        // The chain is truncated to the two newest call sites.
        let cid2 = strategy.get_context_id(&ctx2);
        let cs3 = world.manager.get_cs_call_site(cid2, i3);
        let ctx3 = strategy.select_context(&cs3, world.callee);
        assert_eq!(ctx3.elems(), &[i3, i2]);

        // Heap contexts keep the single newest call site.
        let cid3 = strategy.get_context_id(&ctx3);
        let cs_method = world.manager.get_cs_method(cid3, world.callee);
        let o = world.acx.new_obj(world.class, world.callee);
        let heap_context = strategy.select_heap_context(&cs_method, o);
        assert_eq!(heap_context.elems(), &[i3]);
    }

    #[test]
    fn zero_heap_depth_merges_all_heap_contexts() {
        let mut world = test_world();
        let i1 = world.acx.new_invoke(world.caller, DispatchKind::Static);
        let o = world.acx.new_obj(world.class, world.callee);

        let mut strategy = KCallSiteSensitive::new(1, 0);
        let cid = strategy.get_context_id(&Context::from_elem(i1));
        let cs_method = world.manager.get_cs_method(cid, world.callee);
        assert!(strategy.select_heap_context(&cs_method, o).is_empty());
    }

    #[test]
    fn object_sensitive_contexts_follow_the_receiver() {
        let mut world = test_world();
        let invoke = world.acx.new_invoke(world.caller, DispatchKind::Virtual);
        let alloc_outer = world.acx.new_obj(world.class, world.caller);
        let alloc_recv = world.acx.new_obj(world.class, world.caller);

        let mut strategy = KObjectSensitive::new(2, 1);

        // The receiver was abstracted under the heap context [alloc_outer].
        let recv_cid = strategy.get_context_id(&Context::from_elem(alloc_outer));
        let recv = world.manager.get_cs_obj(&world.acx, recv_cid, alloc_recv);

        let empty = strategy.get_empty_context_id();
        let callsite = world.manager.get_cs_call_site(empty, invoke);
        let selected = strategy.select_context_with_receiver(&callsite, &recv, world.callee);
        assert_eq!(selected.elems(), &[alloc_recv, alloc_outer]);

        // Statically bound calls inherit the caller's context.
        let caller_cid = strategy.get_context_id(&Context::from_elem(alloc_outer));
        let static_callsite = world.manager.get_cs_call_site(caller_cid, invoke);
        let inherited = strategy.select_context(&static_callsite, world.callee);
        assert_eq!(inherited.elems(), &[alloc_outer]);

        // Heap contexts are the truncated method context.
        let cid = strategy.get_context_id(&selected);
        let cs_method = world.manager.get_cs_method(cid, world.callee);
        let heap_context = strategy.select_heap_context(&cs_method, alloc_recv);
        assert_eq!(heap_context.elems(), &[alloc_recv]);
    }

    #[test]
    #[should_panic(expected = "never issued")]
    fn foreign_context_ids_fail_fast() {
        let strategy = OneCallSiteSensitive::new();
        let _ = strategy.get_context_by_id(ContextId::from_u32(99));
    }
}
