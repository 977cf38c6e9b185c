// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use crate::ir::{InvokeId, ObjId};
use crate::util::index_vec::{newtype_index, IndexVec};

newtype_index!(
    /// The unique identifier for each context.
    pub struct ContextId => "ContextId"
);

/// The id of the distinguished empty context. Every [`ContextCache`] interns
/// the empty context first, so this id is valid in all caches.
pub const EMPTY_CONTEXT_ID: ContextId = ContextId::from_u32(0);

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {}

/// A sensitivity abstraction: an immutable sequence of context elements,
/// newest first. Two contexts are equal iff their element sequences are.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    /// The distinguished empty context.
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context { elems: Vec::new() })
    }

    /// A context of length exactly one.
    pub fn from_elem(elem: E) -> Rc<Self> {
        Rc::new(Context { elems: vec![elem] })
    }

    pub fn new(elems: Vec<E>) -> Rc<Self> {
        Rc::new(Context { elems })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn elems(&self) -> &[E] {
        &self.elems
    }

    /// The most recently appended element.
    pub fn newest_element(&self) -> Option<&E> {
        self.elems.first()
    }

    /// Composes a new context by prepending `elem` to `old_ctx`, keeping at
    /// most `k` elements. The oldest elements are discarded first.
    pub fn new_k_limited(old_ctx: &Rc<Context<E>>, elem: E, k: usize) -> Rc<Self> {
        let mut elems = Vec::with_capacity(k);
        if k > 0 {
            elems.push(elem);
            let keep = std::cmp::min(old_ctx.len(), k - 1);
            elems.extend_from_slice(&old_ctx.elems[..keep]);
        }
        Rc::new(Context { elems })
    }

    /// Truncates `ctx` to its `k` newest elements.
    pub fn k_limited(ctx: &Rc<Context<E>>, k: usize) -> Rc<Self> {
        if ctx.len() <= k {
            ctx.clone()
        } else {
            Rc::new(Context {
                elems: ctx.elems[..k].to_vec(),
            })
        }
    }
}

/// Interns contexts, assigning each distinct context a dense [`ContextId`].
///
/// The empty context is interned at construction and always receives
/// [`EMPTY_CONTEXT_ID`].
pub struct ContextCache<E: ContextElement> {
    context_list: IndexVec<ContextId, Rc<Context<E>>>,
    context_to_id_map: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        let mut cache = ContextCache {
            context_list: IndexVec::new(),
            context_to_id_map: HashMap::new(),
        };
        let empty_id = cache.get_context_id(&Context::new_empty());
        debug_assert_eq!(empty_id, EMPTY_CONTEXT_ID);
        cache
    }

    /// Returns the id for `context`, interning it on first sight.
    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        if let Some(id) = self.context_to_id_map.get(context) {
            *id
        } else {
            let id = self.context_list.push(context.clone());
            self.context_to_id_map.insert(context.clone(), id);
            id
        }
    }

    /// Returns the context stored at this id, or None if the id was never
    /// issued by this cache.
    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.context_list.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.context_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.context_list.is_empty()
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Rc<Context<E>>> + '_ {
        self.context_list.iter()
    }
}

// Different kinds of context elements supported now
impl ContextElement for InvokeId {}

impl ContextElement for ObjId {}
