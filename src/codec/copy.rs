use super::{CodecError, Decoder};

use std::io::{self, Read, Write};

/// The trivial codec.
/// Simply shuffles bytes it gets back out.
#[derive(Debug, Default)]
pub struct CopyDecoder {}

impl CopyDecoder {
    /// Creates a new `CopyDecoder`.
    /// Because this codec doesn't really need construction, this ctor is only implemented for the sake of uniformity.
    pub fn new() -> CopyDecoder {
        return CopyDecoder {};
    }
}

impl Decoder for CopyDecoder {
    fn decode(
        &mut self,
        inputs: &mut [&mut dyn Read],
        outputs: &mut [&mut dyn Write],
        out_sizes: &[Option<u64>],
    ) -> Result<(), CodecError> {
        let (input, output) = match (inputs.first_mut(), outputs.first_mut()) {
            (Some(i), Some(o)) => (i, o),
            _ => return Err(CodecError::Other("copy needs one input and one output".into())),
        };
        let copied = io::copy(input, output)?;
        if let Some(Some(expected)) = out_sizes.first() {
            if copied != *expected {
                return Err(CodecError::DataMismatch(format!(
                    "copied {} bytes, expected {}",
                    copied, expected
                )));
            }
        }
        return Ok(());
    }
}
