//! Method IDs as documented in 7zip's methods.txt, and the fixed table
//! of methods this crate knows how to wire into a coder graph.

use std::convert::TryFrom;
use std::fmt;

/// Raw method ID as it's stored in a coder record.
/// It may be 1 to 15 bytes long, but all known methods use at most 4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub Vec<u8>);

impl MethodId {
    pub fn as_bytes(&self) -> &[u8] {
        return &self.0;
    }
}

impl From<&[u8]> for MethodId {
    fn from(b: &[u8]) -> Self {
        return MethodId(Vec::from(b));
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        return Ok(());
    }
}

/// All methods the graph builder can resolve by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// As the name implies, simply copies the data byte-for-byte.
    Copy,
    Lzma,
    Ppmd,
    /// x86 branch converter.
    Bcj,
    /// x86 branch converter with separate call/jump/range-coder streams.
    Bcj2,
    Deflate,
    BZip2,
    Lz5,
}

pub const ALL_METHODS: [Method; 8] = [
    Method::Copy,
    Method::Lzma,
    Method::Ppmd,
    Method::Bcj,
    Method::Bcj2,
    Method::Deflate,
    Method::BZip2,
    Method::Lz5,
];

/// Method used when a spec leaves the name empty.
pub const DEFAULT_METHOD: Method = Method::Lzma;

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Copy => "Copy",
            Method::Lzma => "LZMA",
            Method::Ppmd => "PPMD",
            Method::Bcj => "BCJ",
            Method::Bcj2 => "BCJ2",
            Method::Deflate => "Deflate",
            Method::BZip2 => "BZip2",
            Method::Lz5 => "LZ5",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Method> {
        return ALL_METHODS
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name));
    }

    pub fn id_bytes(self) -> &'static [u8] {
        match self {
            Method::Copy => &[0x00],
            Method::Lzma => &[0x03, 0x01, 0x01],
            Method::Ppmd => &[0x03, 0x04, 0x01],
            Method::Bcj => &[0x03, 0x03, 0x01, 0x03],
            Method::Bcj2 => &[0x03, 0x03, 0x01, 0x1B],
            Method::Deflate => &[0x04, 0x01, 0x08],
            Method::BZip2 => &[0x04, 0x02, 0x02],
            Method::Lz5 => &[0x04, 0xF7, 0x11, 0x05],
        }
    }

    pub fn id(self) -> MethodId {
        return MethodId::from(self.id_bytes());
    }

    /// `(inputs, outputs)` in decoding direction.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Method::Bcj2 => (4, 1),
            _ => (1, 1),
        }
    }

    /// Methods which take a dictionary, match finder and fast-bytes setting.
    pub fn is_lz(self) -> bool {
        // Deflate would belong here as well, but its encoder doesn't take the LZMA-style properties.
        return self == Method::Lzma;
    }
}

impl TryFrom<&MethodId> for Method {
    type Error = MethodId;
    fn try_from(id: &MethodId) -> Result<Self, Self::Error> {
        return ALL_METHODS
            .iter()
            .copied()
            .find(|m| m.id_bytes() == id.as_bytes())
            .ok_or_else(|| id.clone());
    }
}
