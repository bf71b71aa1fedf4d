/// Match finders the LZ encoders know about.
pub const MATCH_FINDERS: [&str; 11] = [
    "BT2", "BT3", "BT4", "BT4B", "HC3", "HC4", "PAT2", "PAT2H", "PAT2R", "PAT3H", "PAT4H",
];

const DEFAULT_MATCH_FINDER: &str = "BT4";
const FAST_MATCH_FINDER: &str = "HC3";

/// Compression level presets. Only one can be active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Normal,
    /// Small dictionary and the fastest algorithm.
    Fast,
    /// Larger dictionary, best algorithm, more fast bytes.
    Extreme,
}

/// Settings that fill in whatever a method spec leaves open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    pub preset: Preset,
    /// Match finder for LZ-family methods that don't name their own.
    pub match_finder: String,
}

impl CompileConfig {
    pub fn new(preset: Preset) -> CompileConfig {
        let mut config = CompileConfig {
            preset: Preset::Normal,
            match_finder: String::from(DEFAULT_MATCH_FINDER),
        };
        config.set_preset(preset);
        return config;
    }

    /// Switch to another preset.
    ///
    /// The fast preset also selects its own match finder,
    /// the others keep whatever match finder is configured.
    pub fn set_preset(&mut self, preset: Preset) {
        self.preset = preset;
        if preset == Preset::Fast {
            self.match_finder = String::from(FAST_MATCH_FINDER);
        }
    }

    pub fn default_dictionary_size(&self) -> u32 {
        match self.preset {
            Preset::Normal => 1 << 20,
            Preset::Fast => 1 << 15,
            Preset::Extreme => 1 << 22,
        }
    }

    pub fn default_algorithm(&self) -> u32 {
        match self.preset {
            Preset::Normal => 1,
            Preset::Fast => 0,
            Preset::Extreme => 2,
        }
    }

    pub fn default_fast_bytes(&self) -> u32 {
        match self.preset {
            Preset::Extreme => 64,
            _ => 32,
        }
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        return CompileConfig::new(Preset::Normal);
    }
}

/// The canonical spelling of a match finder name, if it's a known one.
pub fn match_finder_name(name: &str) -> Option<&'static str> {
    return MATCH_FINDERS
        .iter()
        .copied()
        .find(|mf| mf.eq_ignore_ascii_case(name));
}
