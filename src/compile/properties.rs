//! The name/value property layer of the method mini-language.

use super::{build, match_finder_name, CompileConfig, CompressionMethodMode, ModeSwitches, Preset};

use crate::err::{Error, Result};
use crate::graph::{BindPair, PropId, PropValue, Property};
use crate::parser::{parse_bind, parse_dictionary_size, parse_u32, split_param};

/// Highest method index accepted by [`MethodProperties::set`].
pub const MAX_METHOD_INDEX: u32 = 100;

const NAMED_PROPERTIES: [(&str, PropId); 7] = [
    ("O", PropId::Order),
    ("PB", PropId::PosStateBits),
    ("LC", PropId::LitContextBits),
    ("LP", PropId::LitPosBits),
    ("Pass", PropId::NumPasses),
    ("fb", PropId::NumFastBytes),
    ("a", PropId::Algorithm),
];

fn named_property(name: &str) -> Option<PropId> {
    return NAMED_PROPERTIES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id);
}

/// A property value as handed in by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    Empty,
    Number(u32),
    Text(String),
}

impl From<u32> for Setting {
    fn from(n: u32) -> Self {
        return Setting::Number(n);
    }
}

impl From<&str> for Setting {
    fn from(s: &str) -> Self {
        return Setting::Text(String::from(s));
    }
}

impl From<String> for Setting {
    fn from(s: String) -> Self {
        return Setting::Text(s);
    }
}

/// A method name plus the parameters given for it, not yet resolved against the method table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodSpec {
    /// Empty selects the default method.
    pub name: String,
    pub coder_props: Vec<Property>,
    pub encoder_props: Vec<Property>,
    pub match_finder: Option<String>,
}

impl MethodSpec {
    pub fn new(name: &str) -> MethodSpec {
        return MethodSpec {
            name: String::from(name),
            ..Default::default()
        };
    }

    /// Parse a spec such as `LZMA:d=24:fb64`.
    pub fn parse(s: &str) -> Result<MethodSpec> {
        let mut spec = MethodSpec::default();
        spec.apply_str(s)?;
        return Ok(spec);
    }

    /// Apply a `name(:param)*` string. The name replaces the current one.
    /// On error the spec is left as it was.
    pub fn apply_str(&mut self, s: &str) -> Result<()> {
        if s.is_empty() {
            return Ok(());
        }
        let mut spec = self.clone();
        let mut parts = s.split(':');
        if let Some(name) = parts.next() {
            spec.name = String::from(name);
        }
        for param in parts {
            let (name, value) = split_param(param);
            let value = match value {
                Some(v) => Setting::from(v),
                None => Setting::Empty,
            };
            spec.set_param(name, value)?;
        }
        *self = spec;
        return Ok(());
    }

    /// Set a single named parameter. A parameter set twice keeps the last value.
    pub fn set_param(&mut self, name: &str, value: Setting) -> Result<()> {
        if name.eq_ignore_ascii_case("MF") {
            match value {
                Setting::Text(mf) => match match_finder_name(&mf) {
                    Some(canonical) => self.match_finder = Some(String::from(canonical)),
                    None => {
                        return Err(Error::invalid(
                            name,
                            format!("unknown match finder `{}`", mf),
                        ))
                    }
                },
                _ => return Err(Error::invalid(name, "match finder must be a name")),
            }
            return Ok(());
        }

        let id = if name.eq_ignore_ascii_case("D") {
            Some(PropId::DictionarySize)
        } else if name.eq_ignore_ascii_case("MEM") {
            Some(PropId::UsedMemorySize)
        } else {
            None
        };
        if let Some(id) = id {
            let (bytes, log) = match value {
                Setting::Number(n) if n <= 31 => (1u32 << n, n as u8),
                Setting::Number(n) => {
                    return Err(Error::invalid(name, format!("exponent {} exceeds 31", n)))
                }
                Setting::Text(s) => match parse_dictionary_size(&s) {
                    Ok(size) => size,
                    Err(Error::InvalidArgument { reason, .. }) => {
                        return Err(Error::invalid(name, reason))
                    }
                    Err(e) => return Err(e),
                },
                Setting::Empty => return Err(Error::invalid(name, "missing size")),
            };
            self.push(Property {
                id,
                value: PropValue::Size { bytes, log },
            });
            return Ok(());
        }

        let id = match named_property(name) {
            Some(id) => id,
            None => return Err(Error::invalid(name, "unknown parameter")),
        };
        let n = match &value {
            Setting::Number(n) => *n,
            Setting::Text(s) => match parse_u32(s) {
                Some(n) => n,
                None => return Err(Error::invalid(name, format!("`{}` is not a number", s))),
            },
            Setting::Empty => return Err(Error::invalid(name, "missing value")),
        };
        self.push(Property {
            id,
            value: PropValue::Number(n),
        });
        return Ok(());
    }

    fn push(&mut self, prop: Property) {
        let list = if prop.id.is_coder_property() {
            &mut self.coder_props
        } else {
            &mut self.encoder_props
        };
        match list.iter_mut().find(|p| p.id == prop.id) {
            Some(existing) => *existing = prop,
            None => list.push(prop),
        }
    }

    pub fn property(&self, id: PropId) -> Option<PropValue> {
        return self
            .coder_props
            .iter()
            .chain(self.encoder_props.iter())
            .find(|p| p.id == id)
            .map(|p| p.value);
    }
}

impl std::str::FromStr for MethodSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        return MethodSpec::parse(s);
    }
}

fn bool_setting(name: &str, value: &Setting) -> Result<bool> {
    match value {
        Setting::Empty => Ok(true),
        Setting::Number(n) => Ok(*n != 0),
        Setting::Text(s) => {
            if s.eq_ignore_ascii_case("ON") || s == "+" {
                Ok(true)
            } else if s.eq_ignore_ascii_case("OFF") || s == "-" {
                Ok(false)
            } else {
                Err(Error::invalid(name, format!("`{}` is not ON or OFF", s)))
            }
        }
    }
}

/// Accumulates archive-level properties, one `set` call per name/value pair,
/// and compiles them into a [`CompressionMethodMode`].
///
/// Recognized names (case-insensitive):
///
/// * `0`, `1`, `X` without a value select the fast, normal or extreme preset.
/// * `B<bind>` adds a bind directive, e.g. `B0S1:1S0`.
/// * `S`, `HC`, `MT` switch solid mode, header compression and multi-threading.
/// * `<n>` with a text value is a whole method spec for method `n`.
/// * `<n>MF`, `<n>D`, `<n>MEM`, `<n>O`, `<n>PB`, `<n>LC`, `<n>LP`, `<n>Pass`, `<n>fb`, `<n>a`
///   set one parameter of method `n`. Without `<n>` method 0 is meant.
#[derive(Debug, Clone, Default)]
pub struct MethodProperties {
    pub config: CompileConfig,
    pub switches: ModeSwitches,
    methods: Vec<Option<MethodSpec>>,
    binds: Vec<BindPair>,
}

impl MethodProperties {
    pub fn new() -> MethodProperties {
        return MethodProperties::default();
    }

    pub fn set(&mut self, name: &str, value: Setting) -> Result<()> {
        if value == Setting::Empty {
            let preset = match name {
                "0" => Some(Preset::Fast),
                "1" => Some(Preset::Normal),
                "x" | "X" => Some(Preset::Extreme),
                _ => None,
            };
            if let Some(p) = preset {
                self.config.set_preset(p);
                return Ok(());
            }
        }

        if name.is_empty() {
            return Err(Error::invalid(name, "empty property name"));
        }
        if name.starts_with('B') || name.starts_with('b') {
            self.binds.push(parse_bind(name)?);
            return Ok(());
        }

        let digits = name.len() - name.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let (index, real_name) = if digits == 0 {
            if name.eq_ignore_ascii_case("S") {
                self.switches.solid = bool_setting(name, &value)?;
                return Ok(());
            }
            if name.eq_ignore_ascii_case("HC") {
                self.switches.compress_headers = bool_setting(name, &value)?;
                return Ok(());
            }
            if name.eq_ignore_ascii_case("MT") {
                self.switches.multi_thread = bool_setting(name, &value)?;
                self.switches.multi_thread_mult = 200;
                return Ok(());
            }
            (0, name)
        } else {
            match parse_u32(&name[..digits]) {
                Some(n) => (n, &name[digits..]),
                None => return Err(Error::invalid(name, "method index out of range")),
            }
        };
        if index > MAX_METHOD_INDEX {
            return Err(Error::invalid(
                name,
                format!("method index {} is above {}", index, MAX_METHOD_INDEX),
            ));
        }

        let index = index as usize;
        let mut spec = match self.methods.get(index) {
            Some(Some(spec)) => spec.clone(),
            _ => MethodSpec::default(),
        };
        if real_name.is_empty() {
            match value {
                Setting::Text(s) => spec.apply_str(&s)?,
                _ => return Err(Error::invalid(name, "method spec must be text")),
            }
        } else {
            spec.set_param(real_name, value)?;
        }

        if self.methods.len() <= index {
            self.methods.resize(index + 1, None);
        }
        self.methods[index] = Some(spec);
        return Ok(());
    }

    pub fn binds(&self) -> &[BindPair] {
        return &self.binds;
    }

    /// The configured methods in index order.
    ///
    /// Fails if an index below the highest one used was never configured.
    pub fn methods(&self) -> Result<Vec<MethodSpec>> {
        let mut out = Vec::with_capacity(self.methods.len());
        for (i, m) in self.methods.iter().enumerate() {
            match m {
                Some(spec) => out.push(spec.clone()),
                None => {
                    return Err(Error::invalid(
                        i.to_string(),
                        "method indices must be contiguous",
                    ))
                }
            }
        }
        return Ok(out);
    }

    pub fn compile(&self) -> Result<CompressionMethodMode> {
        let methods = self.methods()?;
        return build(&methods, &self.binds, &self.config, self.switches);
    }
}
