// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use crate::util::index_vec::Idx;

pub mod context;
pub mod element;
pub mod manager;

/// The bidirectional mapping between interned entities and their dense
/// indices, enabling flat array and bitset based storage of per-entity
/// analysis results.
pub trait Indexer<T> {
    type Id: Idx;

    /// The dense index of an interned entity. O(1): the index is stored on
    /// the wrapper itself.
    fn index_of(&self, entity: &T) -> Self::Id;

    /// The entity at `id`, or None if the id was never issued.
    fn entity_at(&self, id: Self::Id) -> Option<T>;
}
