// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::time::Duration;

use crate::cs::manager::{CSManager, THROWABLE_BUDGET};
use crate::pta::context_strategy::ContextStrategy;
use crate::util::index_vec::Idx;

/// A serializable snapshot of the element manager's interning state.
#[derive(Clone, Debug, Serialize)]
pub struct ElementStat {
    pub vars: usize,
    pub cs_vars: usize,
    pub static_fields: usize,
    pub instance_fields: usize,
    pub array_indexes: usize,
    pub pointers: usize,
    pub objects: usize,
    pub throwable_indexed_objects: usize,
    pub cs_methods: usize,
    pub cs_call_sites: usize,
    pub contexts: usize,
}

pub struct CSStat<'s, S: ContextStrategy> {
    manager: &'s CSManager,
    strategy: &'s S,
}

impl<'s, S: ContextStrategy> CSStat<'s, S> {
    pub fn new(manager: &'s CSManager, strategy: &'s S) -> Self {
        CSStat { manager, strategy }
    }

    pub fn snapshot(&self) -> ElementStat {
        let manager = self.manager;
        ElementStat {
            vars: manager.vars().count(),
            cs_vars: manager.cs_vars().count(),
            static_fields: manager.static_fields().count(),
            instance_fields: manager.instance_fields().count(),
            array_indexes: manager.array_indexes().count(),
            pointers: manager.num_pointers(),
            objects: manager.num_objects(),
            throwable_indexed_objects: manager
                .objects()
                .filter(|o| o.index.index() < THROWABLE_BUDGET)
                .count(),
            cs_methods: manager.num_cs_methods(),
            cs_call_sites: manager.num_cs_call_sites(),
            contexts: self.strategy.context_cache().len(),
        }
    }

    pub fn dump_stats(&self, elapsed: Duration) {
        let mut stat_writer = BufWriter::new(Box::new(std::io::stdout()) as Box<dyn Write>);

        info!("Dumping element statistics...");
        stat_writer
            .write_all("##########################################################\n".as_bytes())
            .expect("Unable to write data");
        self.dump_element_stat(&mut stat_writer);
        stat_writer
            .write_all("----------------------------------------------------------\n".as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(
                format!(
                    "Analysis time: {}\n",
                    humantime::format_duration(elapsed)
                )
                .as_bytes(),
            )
            .expect("Unable to write data");
        stat_writer
            .write_all("##########################################################\n".as_bytes())
            .expect("Unable to write data");
    }

    pub fn dump_element_stat<W: Write>(&self, stat_writer: &mut BufWriter<W>) {
        let stat = self.snapshot();
        stat_writer
            .write_all("Element Statistics: \n".as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Vars: {}\n", stat.vars).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#CS Vars: {}\n", stat.cs_vars).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Pointers: {}\n", stat.pointers).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#CS Objects: {}\n", stat.objects).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(
                format!(
                    "#Throwable-indexed objects: {}\n",
                    stat.throwable_indexed_objects
                )
                .as_bytes(),
            )
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#CS Methods: {}\n", stat.cs_methods).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#CS CallSites: {}\n", stat.cs_call_sites).as_bytes())
            .expect("Unable to write data");
        stat_writer
            .write_all(format!("#Contexts: {}\n", stat.contexts).as_bytes())
            .expect("Unable to write data");
    }

    /// Dumps the snapshot in JSON format.
    pub fn dump_json<W: Write>(&self, writer: W) {
        serde_json::to_writer_pretty(writer, &self.snapshot()).expect("Unable to write data");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::analysis_context::AnalysisContext;
    use crate::ir::types::THROWABLE;
    use crate::pta::context_strategy::OneCallSiteSensitive;
    use crate::util::options::AnalysisOptions;

    #[test]
    fn snapshot_counts_interned_elements() {
        let mut acx = AnalysisContext::new(AnalysisOptions::default());
        let object = acx.types.object();
        let class = acx.types.add_class("A", Some(object));
        let throwable = acx.types.get_class(THROWABLE).unwrap();
        let m = acx.new_method(class, "m", false);
        let v = acx.new_var(m, "v");
        let o = acx.new_obj(class, m);
        let e = acx.new_obj(throwable, m);

        let mut manager = CSManager::new();
        let mut strategy = OneCallSiteSensitive::new();
        let empty = strategy.get_empty_context_id();
        manager.get_cs_var(empty, v);
        manager.get_cs_obj(&acx, empty, o);
        manager.get_cs_obj(&acx, empty, e);
        manager.get_cs_method(empty, m);

        let stat = CSStat::new(&manager, &strategy);
        let snapshot = stat.snapshot();
        assert_eq!(snapshot.vars, 1);
        assert_eq!(snapshot.cs_vars, 1);
        assert_eq!(snapshot.pointers, 1);
        assert_eq!(snapshot.objects, 2);
        assert_eq!(snapshot.throwable_indexed_objects, 1);
        assert_eq!(snapshot.cs_methods, 1);
        assert_eq!(snapshot.cs_call_sites, 0);
        assert_eq!(snapshot.contexts, 1);
    }

    #[test]
    fn json_snapshot_has_expected_fields() {
        let manager = CSManager::new();
        let strategy = OneCallSiteSensitive::new();
        let stat = CSStat::new(&manager, &strategy);
        let mut buf = Vec::new();
        stat.dump_json(&mut buf);
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["pointers"], 0);
        assert_eq!(value["objects"], 0);
        assert_eq!(value["contexts"], 1);
    }
}
