//! This module contains the interface between coder graphs and
//! the codecs documented in 7zip's methods.txt.
//!
//! The codec algorithms themselves are opaque to this crate:
//! a decoder only has to move bytes from its input streams to its output streams.
//! Callers plug in the decoders they have through a [`CodecRegistry`].

mod copy;
pub use copy::*;

use std::collections::HashMap;
use std::io::{self, Read, Write};

use thiserror::Error;

use crate::graph::Coder;
use crate::method::{Method, MethodId};

/// The main interface trait for decoders.
///
/// All codecs must implement it.
pub trait Decoder: Send {
    /// Read the given inputs to their end and write the decoded data to the outputs.
    ///
    /// `out_sizes` holds the expected size of each output if the archive records it.
    fn decode(
        &mut self,
        inputs: &mut [&mut dyn Read],
        outputs: &mut [&mut dyn Write],
        out_sizes: &[Option<u64>],
    ) -> Result<(), CodecError>;

    /// Decoders that take properties from the coder record expose them here.
    fn as_set_properties(&mut self) -> Option<&mut dyn SetDecoderProperties> {
        None
    }
}

/// Optional capability of decoders configured by the attribute bytes of their coder record.
pub trait SetDecoderProperties {
    fn set_decoder_properties(&mut self, props: &[u8]) -> Result<(), CodecError>;
}

/// The top-level codec error type.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The packed data doesn't have the format the codec expects.
    #[error("data mismatch: {0}")]
    DataMismatch(String),
    /// No decoder has been registered for the method.
    #[error("unsupported method {0}")]
    UnsupportedMethod(MethodId),
    #[error("method {method} has arity {expected:?}, coder declares {got:?}")]
    ArityMismatch {
        method: MethodId,
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

pub type DecoderFactory = Box<dyn Fn() -> Box<dyn Decoder> + Send + Sync>;

struct Registration {
    arity: (usize, usize),
    factory: DecoderFactory,
}

/// Maps method IDs to decoder constructors.
pub struct CodecRegistry {
    decoders: HashMap<MethodId, Registration>,
}

impl CodecRegistry {
    /// A registry without any decoders.
    pub fn empty() -> CodecRegistry {
        return CodecRegistry {
            decoders: HashMap::new(),
        };
    }

    /// Register a decoder for a method ID with its fixed `(inputs, outputs)` arity.
    /// A previous registration for the same ID is replaced.
    pub fn register<F>(&mut self, id: MethodId, arity: (usize, usize), factory: F)
    where
        F: Fn() -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        self.decoders.insert(
            id,
            Registration {
                arity,
                factory: Box::new(factory),
            },
        );
    }

    /// Register a decoder for one of the known methods.
    pub fn register_method<F>(&mut self, method: Method, factory: F)
    where
        F: Fn() -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        self.register(method.id(), method.arity(), factory);
    }

    pub fn supports(&self, id: &MethodId) -> bool {
        return self.decoders.contains_key(id);
    }

    /// Create and configure a decoder for the given coder.
    pub fn create(&self, coder: &Coder) -> Result<Box<dyn Decoder>, CodecError> {
        let reg = match self.decoders.get(&coder.method) {
            Some(r) => r,
            None => return Err(CodecError::UnsupportedMethod(coder.method.clone())),
        };
        let got = (coder.num_in_streams, coder.num_out_streams);
        if reg.arity != got {
            return Err(CodecError::ArityMismatch {
                method: coder.method.clone(),
                expected: reg.arity,
                got,
            });
        }
        let mut decoder = (reg.factory)();
        if let Some(attrs) = &coder.attrs {
            if let Some(p) = decoder.as_set_properties() {
                p.set_decoder_properties(attrs)?;
            }
        }
        return Ok(decoder);
    }
}

impl Default for CodecRegistry {
    /// A registry with the codecs built into this crate.
    fn default() -> Self {
        let mut r = CodecRegistry::empty();
        r.register_method(Method::Copy, || Box::new(CopyDecoder::new()));
        return r;
    }
}
