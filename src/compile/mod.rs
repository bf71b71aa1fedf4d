//! Compiles user-facing method specs into coder graphs.
//!
//! The entry points are [`compile`] for already split method specs,
//! [`compile_str`] for a single `name:param:param` string and
//! [`MethodProperties`] for the archive-level property list.

mod config;
pub use config::*;
mod properties;
pub use properties::*;
#[cfg(test)]
mod test;

use tracing::debug;

use crate::err::{Error, Result};
use crate::graph::{BindPair, Coder, CoderGraph, PropId, PropValue, Property};
use crate::method::{Method, DEFAULT_METHOD};
use crate::parser::parsers::size_log;

/// Archive-level switches that travel with a compiled mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSwitches {
    pub solid: bool,
    pub compress_headers: bool,
    pub multi_thread: bool,
    /// Relative thread count, in percent.
    pub multi_thread_mult: u32,
}

impl Default for ModeSwitches {
    fn default() -> Self {
        return ModeSwitches {
            solid: true,
            compress_headers: true,
            multi_thread: false,
            multi_thread_mult: 100,
        };
    }
}

/// The result of compiling method specs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionMethodMode {
    pub graph: CoderGraph,
    pub solid: bool,
    pub multi_thread: bool,
    pub multi_thread_mult: u32,
    /// Mode used for the archive's own metadata, if header compression is on.
    pub header_method: Option<Box<CompressionMethodMode>>,
}

impl CompressionMethodMode {
    pub fn coders(&self) -> &[Coder] {
        return self.graph.coders();
    }

    pub fn bind_pairs(&self) -> &[BindPair] {
        return self.graph.bind_pairs();
    }
}

/// Compile method specs and bind directives into a mode with the default switches.
///
/// No specs at all means a single coder of the default method.
/// Several coders must be wired up by explicit bind directives.
pub fn compile(
    methods: &[MethodSpec],
    binds: &[BindPair],
    config: &CompileConfig,
) -> Result<CompressionMethodMode> {
    return build(methods, binds, config, ModeSwitches::default());
}

/// Compile a single method spec string such as `LZMA:d=24:fb=64`.
pub fn compile_str(spec: &str, config: &CompileConfig) -> Result<CompressionMethodMode> {
    let spec = MethodSpec::parse(spec)?;
    return compile(&[spec], &[], config);
}

pub(crate) fn build(
    methods: &[MethodSpec],
    binds: &[BindPair],
    config: &CompileConfig,
    switches: ModeSwitches,
) -> Result<CompressionMethodMode> {
    let fallback = [MethodSpec::default()];
    let methods = if methods.is_empty() {
        &fallback[..]
    } else {
        methods
    };

    let mut coders = Vec::with_capacity(methods.len());
    for spec in methods.iter() {
        coders.push(resolve_coder(spec, config)?);
    }
    if coders.len() > 1 && binds.is_empty() {
        return Err(Error::invalid(
            "binds",
            format!("{} coders need bind directives", coders.len()),
        ));
    }

    let header_method = match coders.last() {
        Some(last) if switches.compress_headers => {
            let header_switches = ModeSwitches {
                compress_headers: false,
                ..ModeSwitches::default()
            };
            let header = build_graph(vec![last.clone()], &[], header_switches, None)?;
            Some(Box::new(header))
        }
        _ => None,
    };

    let mode = build_graph(coders, binds, switches, header_method)?;
    debug!(
        coders = mode.coders().len(),
        binds = mode.bind_pairs().len(),
        solid = mode.solid,
        "compiled method mode"
    );
    return Ok(mode);
}

fn build_graph(
    coders: Vec<Coder>,
    binds: &[BindPair],
    switches: ModeSwitches,
    header_method: Option<Box<CompressionMethodMode>>,
) -> Result<CompressionMethodMode> {
    let graph = CoderGraph::with_implicit_pack_streams(coders, binds.to_vec())
        .map_err(|e| Error::invalid("binds", e.to_string()))?;
    return Ok(CompressionMethodMode {
        graph,
        solid: switches.solid,
        multi_thread: switches.multi_thread,
        multi_thread_mult: switches.multi_thread_mult,
        header_method,
    });
}

/// Look the method up and fill in whatever the method spec and the method require.
fn resolve_coder(spec: &MethodSpec, config: &CompileConfig) -> Result<Coder> {
    let name = if spec.name.is_empty() {
        DEFAULT_METHOD.name()
    } else {
        spec.name.as_str()
    };
    let method = match Method::from_name(name) {
        Some(m) => m,
        None => return Err(Error::invalid(name, "unknown method")),
    };

    let mut coder = Coder::new(method);
    coder.coder_props = spec.coder_props.clone();
    coder.encoder_props = spec.encoder_props.clone();

    let match_finder = match &spec.match_finder {
        Some(mf) => Some(mf.as_str()),
        None if method.is_lz() => Some(config.match_finder.as_str()),
        None => None,
    };
    if let Some(mf) = match_finder {
        match match_finder_name(mf) {
            Some(canonical) => coder.match_finder = Some(String::from(canonical)),
            None => {
                return Err(Error::invalid(
                    "match_finder",
                    format!("unknown match finder `{}`", mf),
                ))
            }
        }
    }

    if method.is_lz() {
        if !coder.has_property(PropId::DictionarySize) {
            let bytes = config.default_dictionary_size();
            coder.push_property(Property {
                id: PropId::DictionarySize,
                value: PropValue::Size {
                    bytes,
                    log: size_log(u64::from(bytes)),
                },
            });
        }
        if !coder.has_property(PropId::Algorithm) {
            coder.push_property(Property {
                id: PropId::Algorithm,
                value: PropValue::Number(config.default_algorithm()),
            });
        }
        if !coder.has_property(PropId::NumFastBytes) {
            coder.push_property(Property {
                id: PropId::NumFastBytes,
                value: PropValue::Number(config.default_fast_bytes()),
            });
        }
    }
    return Ok(coder);
}
