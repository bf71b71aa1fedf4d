use crate::method::{Method, MethodId};

/// Properties a coder can be configured with.
///
/// The first group is stored alongside the coder in the archive,
/// the second group only steers the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropId {
    DictionarySize,
    UsedMemorySize,
    Order,
    PosStateBits,
    LitContextBits,
    LitPosBits,
    NumPasses,
    NumFastBytes,
    Algorithm,
}

impl PropId {
    /// Whether this property ends up in the coder record rather than only configuring the encoder.
    pub fn is_coder_property(self) -> bool {
        !matches!(
            self,
            PropId::NumPasses | PropId::NumFastBytes | PropId::Algorithm
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropValue {
    Number(u32),
    /// A size in bytes together with the smallest `log` such that `bytes <= 1 << log`.
    Size { bytes: u32, log: u8 },
}

impl PropValue {
    pub fn as_u32(&self) -> u32 {
        match *self {
            PropValue::Number(n) => n,
            PropValue::Size { bytes, .. } => bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    pub id: PropId,
    pub value: PropValue,
}

/// One codec stage of a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct Coder {
    pub method: MethodId,
    pub num_in_streams: usize,
    pub num_out_streams: usize,
    pub coder_props: Vec<Property>,
    pub encoder_props: Vec<Property>,
    pub match_finder: Option<String>,
    /// Raw decoder properties as stored in the archive.
    pub attrs: Option<Vec<u8>>,
}

impl Coder {
    /// A coder for a known method with its fixed arity and no properties.
    pub fn new(method: Method) -> Coder {
        let (num_in_streams, num_out_streams) = method.arity();
        return Coder::from_id(method.id(), num_in_streams, num_out_streams);
    }

    pub fn from_id(method: MethodId, num_in_streams: usize, num_out_streams: usize) -> Coder {
        return Coder {
            method,
            num_in_streams,
            num_out_streams,
            coder_props: Vec::new(),
            encoder_props: Vec::new(),
            match_finder: None,
            attrs: None,
        };
    }

    pub fn property(&self, id: PropId) -> Option<PropValue> {
        return self
            .coder_props
            .iter()
            .chain(self.encoder_props.iter())
            .find(|p| p.id == id)
            .map(|p| p.value);
    }

    /// Add a property to the list it belongs to.
    pub fn push_property(&mut self, prop: Property) {
        if prop.id.is_coder_property() {
            self.coder_props.push(prop);
        } else {
            self.encoder_props.push(prop);
        }
    }

    pub fn has_property(&self, id: PropId) -> bool {
        return self.property(id).is_some();
    }
}
