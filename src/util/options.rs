// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use itertools::Itertools;

use clap::error::ErrorKind;
use clap::{Arg, Command};

use crate::pta::PTAType;

const CSPTA_USAGE: &str = r#"cspta [OPTIONS] -- [ENGINE OPTIONS]"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    // We could put this into lazy_static! with a Mutex around, but we really do not expect
    // to construct this more then once per regular program run.
    let parser = Command::new("cspta")
        .no_binary_name(true)
        .override_usage(CSPTA_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("entry-func-name")
            .long("entry-func")
            .takes_value(true)
            .help("The name of the entry method from which the pointer analysis begins."))
        .arg(Arg::new("pta-type")
            .long("pta-type")
            .takes_value(true)
            .value_parser(["callsite-sensitive", "cs", "object-sensitive", "obj"])
            .default_value("callsite-sensitive")
            .help("The type of pointer analysis.")
            .long_help("Callsite-sensitive and object-sensitive pointer analyses are supported now."))
        .arg(Arg::new("context-depth")
            .long("context-depth")
            .takes_value(true)
            .value_parser(clap::value_parser!(u32))
            .default_value("1")
            .help("The context depth limit for method contexts."))
        .arg(Arg::new("heap-context-depth")
            .long("heap-context-depth")
            .takes_value(true)
            .value_parser(clap::value_parser!(u32))
            .default_value("0")
            .help("The context depth limit for heap contexts.")
            .long_help("A depth of 0 merges all objects allocated at one site regardless of \
                        the calling context."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Dump the statistics of the interned elements."))
        .arg(Arg::new("stats-output")
            .long("dump-stats-json")
            .takes_value(true)
            .help("Dump the element statistics in JSON format to the output file."));
    parser
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub entry_func: String,
    pub pta_type: PTAType,
    // options for context-sensitive analysis
    pub context_depth: u32,
    pub heap_context_depth: u32,

    pub dump_stats: bool,
    pub stats_output: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            entry_func: String::new(),
            pta_type: PTAType::CallSiteSensitive,
            context_depth: 1,
            heap_context_depth: 0,
            dump_stats: false,
            stats_output: None,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings. Any content beyond the leftmost `--` token
    /// will be returned (excluding this token) for the driving engine to consume.
    pub fn parse_from_args(&mut self, args: &[String]) -> Vec<String> {
        let mut cspta_args_end = args.len();
        let mut engine_args_start = 0;
        if let Some((p, _)) = args.iter().find_position(|s| s.as_str() == "--") {
            cspta_args_end = p;
            engine_args_start = p + 1;
        }
        let cspta_args = &args[0..cspta_args_end];
        let matches = if engine_args_start == 0 {
            // The arguments may not be intended for us and may get here via some tool, so do
            // not report errors here, but just pass them through to the engine untouched.
            match make_options_parser().try_get_matches_from(cspta_args.iter()) {
                Ok(matches) => {
                    engine_args_start = args.len();
                    matches
                }
                Err(e) => match e.kind() {
                    ErrorKind::DisplayHelp => {
                        eprintln!("{e}");
                        return args.to_vec();
                    }
                    ErrorKind::UnknownArgument => {
                        return args.to_vec();
                    }
                    _ => {
                        e.exit();
                    }
                },
            }
        } else {
            // This will display error diagnostics for arguments that are not valid for us.
            match make_options_parser().try_get_matches_from(cspta_args.iter()) {
                Ok(matches) => matches,
                Err(e) => {
                    e.exit();
                }
            }
        };

        if let Some(s) = matches.get_one::<String>("entry-func-name") {
            self.entry_func = s.clone();
        }

        if matches.contains_id("pta-type") {
            self.pta_type = match matches.get_one::<String>("pta-type").unwrap().as_str() {
                "callsite-sensitive" | "cs" => PTAType::CallSiteSensitive,
                "object-sensitive" | "obj" => PTAType::ObjectSensitive,
                _ => unreachable!(),
            }
        }

        if let Some(depth) = matches.get_one::<u32>("context-depth") {
            self.context_depth = *depth;
        }
        if let Some(depth) = matches.get_one::<u32>("heap-context-depth") {
            self.heap_context_depth = *depth;
        }

        self.dump_stats = matches.contains_id("dump-stats");
        self.stats_output = matches.get_one::<String>("stats-output").cloned();

        args[engine_args_start..].to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn to_args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let options = AnalysisOptions::default();
        assert!(matches!(options.pta_type, PTAType::CallSiteSensitive));
        assert_eq!(options.context_depth, 1);
        assert_eq!(options.heap_context_depth, 0);
        assert!(!options.dump_stats);
    }

    #[test]
    fn parse_all_options() {
        let mut options = AnalysisOptions::default();
        let rest = options.parse_from_args(&to_args(&[
            "--entry-func",
            "main",
            "--pta-type",
            "obj",
            "--context-depth",
            "2",
            "--heap-context-depth",
            "1",
            "--dump-stats",
        ]));
        assert!(rest.is_empty());
        assert_eq!(options.entry_func, "main");
        assert!(matches!(options.pta_type, PTAType::ObjectSensitive));
        assert_eq!(options.context_depth, 2);
        assert_eq!(options.heap_context_depth, 1);
        assert!(options.dump_stats);
    }

    #[test]
    fn engine_args_are_passed_through() {
        let mut options = AnalysisOptions::default();
        let rest = options.parse_from_args(&to_args(&[
            "--pta-type",
            "cs",
            "--",
            "--engine-flag",
            "value",
        ]));
        assert_eq!(rest, to_args(&["--engine-flag", "value"]));
        assert!(matches!(options.pta_type, PTAType::CallSiteSensitive));
    }

    #[test]
    fn unknown_args_without_separator_are_returned_unchanged() {
        let mut options = AnalysisOptions::default();
        let args = to_args(&["--not-a-cspta-option", "x"]);
        let rest = options.parse_from_args(&args);
        assert_eq!(rest, args);
    }
}
