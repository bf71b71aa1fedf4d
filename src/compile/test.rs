use super::*;

use crate::graph::{InStream, OutStream};
use crate::method::ALL_METHODS;

use proptest::prelude::*;

fn dictionary(coder: &Coder) -> Option<u32> {
    return coder.property(PropId::DictionarySize).map(|v| v.as_u32());
}

fn number(coder: &Coder, id: PropId) -> Option<u32> {
    return coder.property(id).map(|v| v.as_u32());
}

fn invalid_field(res: Result<CompressionMethodMode>) -> String {
    match res {
        Err(Error::InvalidArgument { field, .. }) => field,
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn lzma_with_params() {
    let mode = compile_str("LZMA:d=24:fb=64", &CompileConfig::default()).unwrap();
    assert_eq!(mode.coders().len(), 1);
    let coder = &mode.coders()[0];
    assert_eq!(coder.method, Method::Lzma.id());
    assert_eq!(dictionary(coder), Some(1 << 24));
    assert_eq!(
        coder.property(PropId::DictionarySize),
        Some(PropValue::Size {
            bytes: 1 << 24,
            log: 24
        })
    );
    assert_eq!(number(coder, PropId::NumFastBytes), Some(64));
    assert_eq!(number(coder, PropId::Algorithm), Some(1));
    assert_eq!(coder.match_finder.as_deref(), Some("BT4"));
    assert!(mode.bind_pairs().is_empty());
    assert_eq!(mode.graph.pack_streams(), &[InStream { coder: 0, stream: 0 }]);
    assert_eq!(mode.graph.main_output(), OutStream { coder: 0, stream: 0 });
}

#[test]
fn bare_numeric_params() {
    let mode = compile_str("lzma:fb128:pb2:mf=hc4", &CompileConfig::default()).unwrap();
    let coder = &mode.coders()[0];
    assert_eq!(number(coder, PropId::NumFastBytes), Some(128));
    assert_eq!(number(coder, PropId::PosStateBits), Some(2));
    assert_eq!(coder.match_finder.as_deref(), Some("HC4"));
    assert_eq!(coder.coder_props.len(), 2);
    assert_eq!(coder.encoder_props.len(), 2);
}

#[test]
fn presets_fill_lz_defaults() {
    let fast = compile_str("LZMA", &CompileConfig::new(Preset::Fast)).unwrap();
    let coder = &fast.coders()[0];
    assert_eq!(dictionary(coder), Some(1 << 15));
    assert_eq!(number(coder, PropId::Algorithm), Some(0));
    assert_eq!(number(coder, PropId::NumFastBytes), Some(32));
    assert_eq!(coder.match_finder.as_deref(), Some("HC3"));

    let extreme = compile_str("LZMA:a=1", &CompileConfig::new(Preset::Extreme)).unwrap();
    let coder = &extreme.coders()[0];
    assert_eq!(dictionary(coder), Some(1 << 22));
    assert_eq!(number(coder, PropId::Algorithm), Some(1));
    assert_eq!(number(coder, PropId::NumFastBytes), Some(64));
    assert_eq!(coder.match_finder.as_deref(), Some("BT4"));
}

#[test]
fn non_lz_methods_get_no_defaults() {
    let mode = compile_str("PPMD:o=6:mem=24", &CompileConfig::default()).unwrap();
    let coder = &mode.coders()[0];
    assert_eq!(coder.method, Method::Ppmd.id());
    assert_eq!(number(coder, PropId::Order), Some(6));
    assert_eq!(number(coder, PropId::UsedMemorySize), Some(1 << 24));
    assert!(!coder.has_property(PropId::DictionarySize));
    assert!(coder.match_finder.is_none());
}

#[test]
fn empty_specs_default_to_lzma() {
    let mode = compile(&[], &[], &CompileConfig::default()).unwrap();
    assert_eq!(mode.coders().len(), 1);
    assert_eq!(mode.coders()[0].method, Method::Lzma.id());

    let mode = compile_str(":d=16", &CompileConfig::default()).unwrap();
    assert_eq!(mode.coders()[0].method, Method::Lzma.id());
    assert_eq!(dictionary(&mode.coders()[0]), Some(1 << 16));
}

#[test]
fn compile_errors_name_the_field() {
    let config = CompileConfig::default();
    assert_eq!(invalid_field(compile_str("LZX", &config)), "LZX");
    assert_eq!(invalid_field(compile_str("LZMA:zz=1", &config)), "zz");
    assert_eq!(invalid_field(compile_str("LZMA:fb=lots", &config)), "fb");
    assert_eq!(invalid_field(compile_str("LZMA:d=32", &config)), "d");
    assert_eq!(invalid_field(compile_str("LZMA:mf=XX9", &config)), "mf");
    assert_eq!(invalid_field(compile_str("LZMA:d=99Q", &config)), "d");
    for (s, value) in [("LZMA:d=99Q", "99Q"), ("LZMA:mf=XX9", "XX9")] {
        match compile_str(s, &config) {
            Err(Error::InvalidArgument { reason, .. }) => assert!(reason.contains(value)),
            other => panic!("expected an invalid argument, got {:?}", other),
        }
    }
    assert_eq!(invalid_field(compile_str("LZMA:a", &config)), "a");
}

#[test]
fn several_coders_need_binds() {
    let specs = [MethodSpec::new("BCJ"), MethodSpec::new("LZMA")];
    let res = compile(&specs, &[], &CompileConfig::default());
    assert_eq!(invalid_field(res), "binds");
}

#[test]
fn bad_binds_are_invalid_arguments() {
    let specs = [MethodSpec::new("BCJ"), MethodSpec::new("LZMA")];
    let bind = crate::parser::parse_bind("B0:5").unwrap();
    let res = compile(&specs, &[bind], &CompileConfig::default());
    assert_eq!(invalid_field(res), "binds");
}

#[test]
fn bcj2_chain_through_properties() {
    let mut props = MethodProperties::new();
    props.set("0", Setting::from("BCJ2")).unwrap();
    props.set("1", Setting::from("LZMA:d=20")).unwrap();
    props.set("2", Setting::from("LZMA:d=19")).unwrap();
    props.set("3", Setting::from("LZMA:d=19")).unwrap();
    props.set("b1:0", Setting::Empty).unwrap();
    props.set("B2:0s1", Setting::Empty).unwrap();
    props.set("B3:0S2", Setting::Empty).unwrap();

    let mode = props.compile().unwrap();
    assert_eq!(mode.coders().len(), 4);
    assert_eq!(mode.coders()[0].num_in_streams, 4);
    assert_eq!(mode.graph.order(), &[1, 2, 3, 0]);
    assert_eq!(mode.graph.main_output(), OutStream { coder: 0, stream: 0 });
    assert_eq!(mode.graph.pack_streams()[0], InStream { coder: 0, stream: 3 });

    // The header is compressed with a copy of the last coder.
    let header = mode.header_method.as_ref().unwrap();
    assert_eq!(header.coders(), &mode.coders()[3..]);
    assert!(header.header_method.is_none());
}

#[test]
fn property_layer_switches() {
    let mut props = MethodProperties::new();
    assert!(props.switches.solid);
    assert!(props.switches.compress_headers);
    assert!(!props.switches.multi_thread);
    assert_eq!(props.switches.multi_thread_mult, 100);

    props.set("s", Setting::from("off")).unwrap();
    props.set("HC", Setting::Number(0)).unwrap();
    props.set("mt", Setting::Empty).unwrap();
    assert!(props.set("S", Setting::from("maybe")).is_err());

    let mode = props.compile().unwrap();
    assert!(!mode.solid);
    assert!(mode.multi_thread);
    assert_eq!(mode.multi_thread_mult, 200);
    assert!(mode.header_method.is_none());
}

#[test]
fn property_layer_presets_and_params() {
    let mut props = MethodProperties::new();
    props.set("0", Setting::Empty).unwrap();
    assert_eq!(props.config.preset, Preset::Fast);
    props.set("x", Setting::Empty).unwrap();
    assert_eq!(props.config.preset, Preset::Extreme);

    props.set("D", Setting::Number(21)).unwrap();
    props.set("0fb", Setting::from("100")).unwrap();
    props.set("0MF", Setting::from("bt2")).unwrap();
    let mode = props.compile().unwrap();
    let coder = &mode.coders()[0];
    assert_eq!(coder.method, Method::Lzma.id());
    assert_eq!(dictionary(coder), Some(1 << 21));
    assert_eq!(number(coder, PropId::NumFastBytes), Some(100));
    assert_eq!(number(coder, PropId::Algorithm), Some(2));
    // Fast picked HC3, extreme keeps it, the explicit one wins.
    assert_eq!(coder.match_finder.as_deref(), Some("BT2"));
}

#[test]
fn property_layer_errors() {
    let mut props = MethodProperties::new();
    assert!(props.set("", Setting::Empty).is_err());
    assert!(props.set("101", Setting::from("LZMA")).is_err());
    assert!(props.set("0", Setting::Number(3)).is_err());
    assert!(props.set("D", Setting::Number(32)).is_err());
    assert!(props.set("B0", Setting::Empty).is_err());
    assert!(props.set("1ZZ", Setting::Number(1)).is_err());
    assert!(props.set("100", Setting::from("LZMA")).is_ok());
}

#[test]
fn rejected_settings_leave_no_trace() {
    let mut props = MethodProperties::new();
    assert!(props.set("1ZZ", Setting::Number(1)).is_err());
    assert!(props.methods().unwrap().is_empty());

    props.set("0", Setting::from("LZMA:d=20")).unwrap();
    assert!(props.set("0", Setting::from("PPMD:o=6:zz=1")).is_err());
    assert!(props.set("mt", Setting::from("maybe")).is_err());
    assert!(!props.switches.multi_thread);
    assert_eq!(props.switches.multi_thread_mult, 100);

    let methods = props.methods().unwrap();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].name, "LZMA");
    assert_eq!(
        methods[0].property(PropId::DictionarySize),
        Some(PropValue::Size {
            bytes: 1 << 20,
            log: 20
        })
    );
    assert_eq!(methods[0].property(PropId::Order), None);

    let mut spec = MethodSpec::parse("LZMA:fb=64").unwrap();
    assert!(spec.apply_str("PPMD:o=6:d=99").is_err());
    assert_eq!(spec, MethodSpec::parse("LZMA:fb=64").unwrap());
}

#[test]
fn method_index_gaps_are_rejected() {
    let mut props = MethodProperties::new();
    props.set("0", Setting::from("BCJ")).unwrap();
    props.set("2", Setting::from("LZMA")).unwrap();
    props.set("B2:0", Setting::Empty).unwrap();
    match props.compile() {
        Err(Error::InvalidArgument { field, .. }) => assert_eq!(field, "1"),
        other => panic!("expected a gap error, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn arity_matches_method_table(index in 0..ALL_METHODS.len(), upper in any::<bool>()) {
        let method = ALL_METHODS[index];
        let name = if upper {
            method.name().to_ascii_uppercase()
        } else {
            method.name().to_ascii_lowercase()
        };
        let mode = compile_str(&name, &CompileConfig::default()).unwrap();
        prop_assert_eq!(mode.coders().len(), 1);
        let coder = &mode.coders()[0];
        prop_assert_eq!((coder.num_in_streams, coder.num_out_streams), method.arity());
        prop_assert_eq!(&coder.method, &method.id());
        prop_assert_eq!(mode.graph.num_pack_streams(), method.arity().0);
    }
}
