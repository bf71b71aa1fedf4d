use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::ops::ControlFlow;
use std::rc::Rc;

use sevenz_coders::codec::{CodecError, CodecRegistry, Decoder};
use sevenz_coders::graph::{BindPair, Coder, CoderGraph, Folder, GraphError, InStream, OutStream};
use sevenz_coders::method::Method;
use sevenz_coders::read::{
    sevenz_crc, decode, ArchiveDatabase, AskMode, ExtractCallback, ExtractOptions, Extractor,
    FileEntry, NoProgress, OperationResult, SharedInput,
};
use sevenz_coders::{Error, FatalError};

const HEADER: &[u8] = b"7z\xBC\xAF\x27\x1C";
const KEY: u8 = 0x5A;

fn xor(data: &[u8]) -> Vec<u8> {
    return data.iter().map(|b| b ^ KEY).collect();
}

/// Undoes `xor`.
struct XorDecoder;

impl Decoder for XorDecoder {
    fn decode(
        &mut self,
        inputs: &mut [&mut dyn Read],
        outputs: &mut [&mut dyn Write],
        out_sizes: &[Option<u64>],
    ) -> Result<(), CodecError> {
        let mut data = Vec::new();
        inputs[0].read_to_end(&mut data)?;
        if let Some(Some(size)) = out_sizes.first() {
            if *size != data.len() as u64 {
                return Err(CodecError::DataMismatch("size".into()));
            }
        }
        outputs[0].write_all(&xor(&data))?;
        Ok(())
    }
}

/// Concatenates all of its inputs, like a 4-stream filter would merge its streams.
struct JoinDecoder;

impl Decoder for JoinDecoder {
    fn decode(
        &mut self,
        inputs: &mut [&mut dyn Read],
        outputs: &mut [&mut dyn Write],
        _: &[Option<u64>],
    ) -> Result<(), CodecError> {
        for input in inputs.iter_mut() {
            io::copy(input, &mut outputs[0])?;
        }
        Ok(())
    }
}

/// Rejects whatever it's given.
struct BrokenDecoder;

impl Decoder for BrokenDecoder {
    fn decode(
        &mut self,
        inputs: &mut [&mut dyn Read],
        outputs: &mut [&mut dyn Write],
        _: &[Option<u64>],
    ) -> Result<(), CodecError> {
        let mut head = [0u8; 2];
        inputs[0].read_exact(&mut head)?;
        outputs[0].write_all(&head)?;
        Err(CodecError::DataMismatch("unexpected literal".into()))
    }
}

/// Fails the way a decoder does when it runs out of memory.
struct FailingDecoder;

impl Decoder for FailingDecoder {
    fn decode(
        &mut self,
        _: &mut [&mut dyn Read],
        _: &mut [&mut dyn Write],
        _: &[Option<u64>],
    ) -> Result<(), CodecError> {
        Err(CodecError::Other("cannot allocate dictionary".into()))
    }
}

fn registry() -> CodecRegistry {
    let mut r = CodecRegistry::default();
    r.register_method(Method::Lzma, || Box::new(XorDecoder));
    r.register_method(Method::Bcj2, || Box::new(JoinDecoder));
    r.register_method(Method::Ppmd, || Box::new(BrokenDecoder));
    r.register_method(Method::Bcj, || Box::new(FailingDecoder));
    return r;
}

type Streams = Rc<RefCell<BTreeMap<usize, Vec<u8>>>>;

struct Sink(usize, Streams);

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.1
            .borrow_mut()
            .entry(self.0)
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    streams: Streams,
    modes: Vec<AskMode>,
    results: BTreeMap<usize, OperationResult>,
    total: Option<u64>,
    completed: Vec<u64>,
    cancel_after: Option<usize>,
}

impl Recorder {
    fn data(&self, index: usize) -> Option<Vec<u8>> {
        return self.streams.borrow().get(&index).cloned();
    }
}

impl ExtractCallback for Recorder {
    fn set_total(&mut self, total: u64) {
        self.total = Some(total);
    }

    fn set_completed(&mut self, completed: u64) -> ControlFlow<()> {
        self.completed.push(completed);
        match self.cancel_after {
            Some(n) if self.completed.len() > n => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }

    fn get_stream(&mut self, index: usize, mode: AskMode) -> io::Result<Option<Box<dyn Write>>> {
        self.modes.push(mode);
        if mode == AskMode::Test {
            return Ok(None);
        }
        self.streams.borrow_mut().insert(index, Vec::new());
        Ok(Some(Box::new(Sink(index, Rc::clone(&self.streams)))))
    }

    fn set_operation_result(&mut self, index: usize, result: OperationResult) {
        assert!(self.results.insert(index, result).is_none(), "file {} reported twice", index);
    }
}

fn single(method: Method) -> CoderGraph {
    return CoderGraph::with_implicit_pack_streams(vec![Coder::new(method)], vec![]).unwrap();
}

fn file(data: &[u8]) -> FileEntry {
    return FileEntry {
        unpack_size: data.len() as u64,
        crc: Some(sevenz_crc(data)),
        has_stream: !data.is_empty(),
    };
}

/// An archive image: header, then the pack streams in order.
struct Archive {
    bytes: Vec<u8>,
    folders: Vec<Folder>,
    streams: Vec<usize>,
    files: Vec<FileEntry>,
}

impl Archive {
    fn new() -> Archive {
        return Archive {
            bytes: HEADER.to_vec(),
            folders: Vec::new(),
            streams: Vec::new(),
            files: Vec::new(),
        };
    }

    fn folder(&mut self, graph: CoderGraph, packs: &[Vec<u8>], unpack: Vec<u64>, files: &[&[u8]]) {
        let crc = sevenz_crc(&files.concat());
        self.folder_with_crc(graph, packs, unpack, files, Some(crc));
    }

    fn folder_with_crc(
        &mut self,
        graph: CoderGraph,
        packs: &[Vec<u8>],
        unpack: Vec<u64>,
        files: &[&[u8]],
        crc: Option<u32>,
    ) {
        for p in packs {
            self.bytes.extend_from_slice(p);
        }
        let sizes = packs.iter().map(|p| p.len() as u64).collect();
        let folder = Folder::new(graph, sizes, unpack, crc).unwrap();
        self.folders.push(folder);
        self.streams.push(files.iter().filter(|f| !f.is_empty()).count());
        self.files.extend(files.iter().map(|f| file(f)));
    }

    fn empty_file(&mut self) {
        self.files.push(FileEntry::default());
    }

    fn build(self) -> (ArchiveDatabase, SharedInput<Cursor<Vec<u8>>>) {
        let db = ArchiveDatabase::new(HEADER.len() as u64, self.folders, self.streams, self.files)
            .unwrap();
        return (db, SharedInput::new(Cursor::new(self.bytes)));
    }
}

fn copy_folder(ar: &mut Archive, files: &[&[u8]]) {
    let data = files.concat();
    let len = data.len() as u64;
    ar.folder(single(Method::Copy), &[data], vec![len], files);
}

#[test]
fn single_coder_folder_matches_direct_decode() {
    let plain = b"the quick brown fox".to_vec();
    let mut ar = Archive::new();
    ar.folder(single(Method::Lzma), &[xor(&plain)], vec![plain.len() as u64], &[&plain[..]]);
    let (db, input) = ar.build();

    let mut out = Vec::new();
    decode(
        &input,
        db.folder_pack_offsets(0),
        &db.folders[0],
        &registry(),
        &mut out,
        &mut NoProgress,
    )
    .unwrap();

    let packed = xor(&plain);
    let mut reader: &[u8] = &packed;
    let mut direct = Vec::new();
    {
        let mut inputs: Vec<&mut dyn Read> = vec![&mut reader];
        let mut outputs: Vec<&mut dyn Write> = vec![&mut direct];
        XorDecoder.decode(&mut inputs, &mut outputs, &[None]).unwrap();
    }
    assert_eq!(out, direct);
    assert_eq!(out, plain);
}

#[test]
fn skipped_files_are_decoded_but_not_written() {
    let files: [&[u8]; 4] = [b"zero", b"one!", b"two", b"three"];
    let mut ar = Archive::new();
    copy_folder(&mut ar, &files);
    let (db, input) = ar.build();
    let registry = registry();
    let extractor = Extractor::new(&db, input, &registry);

    let mut rec = Recorder::default();
    let summary = extractor
        .extract(&[3, 1], ExtractOptions::default(), &mut rec)
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.files_written, 2);
    assert_eq!(rec.streams.borrow().len(), 2);
    assert_eq!(rec.data(1), Some(b"one!".to_vec()));
    assert_eq!(rec.data(3), Some(b"three".to_vec()));
    assert_eq!(rec.total, Some(9));
    assert_eq!(rec.completed.last(), Some(&9));
    assert!(rec.completed.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        rec.results.into_iter().collect::<Vec<_>>(),
        [(1, OperationResult::Ok), (3, OperationResult::Ok)]
    );
}

#[test]
fn multi_input_graph() {
    let parts: [&[u8]; 4] = [b"call ", b"jump ", b"data ", b"tail"];
    let coders = vec![
        Coder::new(Method::Bcj2),
        Coder::new(Method::Lzma),
        Coder::new(Method::Lzma),
        Coder::new(Method::Lzma),
    ];
    let binds = (1..4)
        .map(|i| BindPair::new(OutStream { coder: i, stream: 0 }, InStream { coder: 0, stream: i - 1 }))
        .collect();
    let graph = CoderGraph::with_implicit_pack_streams(coders, binds).unwrap();
    // Pack stream 0 feeds the filter directly, 1..=3 go through the XOR coders.
    let packs = vec![parts[3].to_vec(), xor(parts[0]), xor(parts[1]), xor(parts[2])];
    let plain = parts.concat();
    let unpack = vec![plain.len() as u64, 5, 5, 5];

    let mut ar = Archive::new();
    ar.folder(graph, &packs, unpack, &[&plain[..10], &plain[10..]]);
    let (db, input) = ar.build();
    let registry = registry();
    let mut rec = Recorder::default();
    Extractor::new(&db, input, &registry)
        .extract_all(ExtractOptions::default(), &mut rec)
        .unwrap();

    assert_eq!(rec.data(0), Some(b"call jump ".to_vec()));
    assert_eq!(rec.data(1), Some(b"data tail".to_vec()));
}

#[test]
fn corrupt_folder_is_skipped() {
    // Folder 0: PPMD fed by Copy, the PPMD step fails on its data.
    let graph = CoderGraph::with_implicit_pack_streams(
        vec![Coder::new(Method::Ppmd), Coder::new(Method::Copy)],
        vec![BindPair::new(OutStream { coder: 1, stream: 0 }, InStream { coder: 0, stream: 0 })],
    )
    .unwrap();
    let mut ar = Archive::new();
    ar.folder(graph, &[b"garbage!".to_vec()], vec![8, 8], &[b"abcd", b"efgh"]);
    copy_folder(&mut ar, &[b"fine"]);
    let (db, input) = ar.build();
    let registry = registry();
    let extractor = Extractor::new(&db, input, &registry);

    let mut rec = Recorder::default();
    let summary = extractor
        .extract_all(ExtractOptions::default(), &mut rec)
        .unwrap();

    assert_eq!(summary.failed_folders, [0]);
    assert!(!summary.is_complete());
    assert_eq!(rec.results[&0], OperationResult::DataError);
    assert_eq!(rec.results[&1], OperationResult::DataError);
    assert_eq!(rec.results[&2], OperationResult::Ok);
    assert_eq!(rec.data(2), Some(b"fine".to_vec()));

    let mut rec = Recorder::default();
    let opts = ExtractOptions {
        require_full_success: true,
        ..Default::default()
    };
    match extractor.extract_all(opts, &mut rec) {
        Err(Error::Data { folder, .. }) => assert_eq!(folder, Some(0)),
        other => panic!("expected a data error, got {:?}", other),
    }
    // Even then, the intact folder was extracted.
    assert_eq!(rec.results[&2], OperationResult::Ok);
}

#[test]
fn folder_crc_mismatch_is_a_data_error() {
    let mut ar = Archive::new();
    let payload = b"payload".to_vec();
    ar.folder_with_crc(single(Method::Copy), &[payload.clone()], vec![7], &[&payload[..]], Some(0));
    let (db, input) = ar.build();
    let registry = registry();

    let mut rec = Recorder::default();
    let summary = Extractor::new(&db, input, &registry)
        .extract_all(ExtractOptions::default(), &mut rec)
        .unwrap();
    // The file was complete and matched its own CRC before the folder check ran,
    // so it keeps its result while the folder is still rejected.
    assert_eq!(summary.failed_folders, [0]);
    assert_eq!(rec.results[&0], OperationResult::Ok);
    assert!(!summary.is_complete());
}

#[test]
fn file_crc_mismatch_is_reported_per_file() {
    let mut ar = Archive::new();
    copy_folder(&mut ar, &[b"left", b"right"]);
    ar.files[1].crc = Some(0xDEAD_BEEF);
    let (db, input) = ar.build();
    let registry = registry();

    let mut rec = Recorder::default();
    let summary = Extractor::new(&db, input, &registry)
        .extract_all(ExtractOptions::default(), &mut rec)
        .unwrap();
    assert!(summary.failed_folders.is_empty());
    assert_eq!(summary.crc_failures, [1]);
    assert_eq!(summary.files_written, 1);
    assert_eq!(rec.results[&0], OperationResult::Ok);
    assert_eq!(rec.results[&1], OperationResult::CrcError);
}

#[test]
fn unsupported_method_is_reported_per_file() {
    let plain = b"deflated".to_vec();
    let mut ar = Archive::new();
    ar.folder(single(Method::Deflate), &[plain.clone()], vec![8], &[&plain[..]]);
    copy_folder(&mut ar, &[b"ok"]);
    let (db, input) = ar.build();
    let registry = registry();

    let mut rec = Recorder::default();
    let summary = Extractor::new(&db, input, &registry)
        .extract_all(ExtractOptions::default(), &mut rec)
        .unwrap();
    assert_eq!(summary.failed_folders, [0]);
    assert_eq!(rec.results[&0], OperationResult::Unsupported);
    assert_eq!(rec.results[&1], OperationResult::Ok);
    assert_eq!(rec.data(0), None);
}

#[test]
fn empty_files_and_test_mode() {
    let mut ar = Archive::new();
    ar.empty_file();
    copy_folder(&mut ar, &[b"abc"]);
    ar.empty_file();
    let (db, input) = ar.build();
    assert_eq!(db.file_index_to_folder_index(), &[None, Some(0), None]);
    let registry = registry();

    let mut rec = Recorder::default();
    let opts = ExtractOptions {
        test_mode: true,
        ..Default::default()
    };
    let summary = Extractor::new(&db, input, &registry)
        .extract_all(opts, &mut rec)
        .unwrap();
    assert!(summary.is_complete());
    assert_eq!(summary.files_written, 3);
    assert!(rec.modes.iter().all(|m| *m == AskMode::Test));
    assert!(rec.streams.borrow().is_empty());
    assert_eq!(rec.results.len(), 3);
}

#[test]
fn cancellation_aborts_the_run() {
    let mut ar = Archive::new();
    copy_folder(&mut ar, &[b"first"]);
    copy_folder(&mut ar, &[b"second"]);
    let (db, input) = ar.build();
    let registry = registry();

    let mut rec = Recorder {
        cancel_after: Some(1),
        ..Default::default()
    };
    let res = Extractor::new(&db, input, &registry).extract_all(ExtractOptions::default(), &mut rec);
    assert!(matches!(res, Err(Error::Fatal(FatalError::Cancelled))));
    assert!(!rec.results.contains_key(&1));
}

#[test]
fn truncated_archive_is_fatal() {
    let mut ar = Archive::new();
    copy_folder(&mut ar, &[b"0123456789"]);
    ar.bytes.truncate(HEADER.len() + 4);
    let (db, input) = ar.build();
    let registry = registry();

    let mut rec = Recorder::default();
    let res = Extractor::new(&db, input, &registry).extract_all(ExtractOptions::default(), &mut rec);
    assert!(matches!(res, Err(Error::Fatal(FatalError::Io(_)))));
}

#[test]
fn codec_failure_stops_the_run() {
    let filtered = b"filtered".to_vec();
    let mut ar = Archive::new();
    ar.folder(single(Method::Bcj), &[filtered.clone()], vec![8], &[&filtered[..]]);
    copy_folder(&mut ar, &[b"never reached"]);
    let (db, input) = ar.build();
    let registry = registry();

    let mut rec = Recorder::default();
    let res = Extractor::new(&db, input, &registry).extract_all(ExtractOptions::default(), &mut rec);
    assert!(matches!(res, Err(Error::Fatal(FatalError::Codec(_)))));
    assert!(!rec.results.contains_key(&1));
    assert_eq!(rec.data(1), None);
}

#[test]
fn pack_offsets_must_fit_the_folder() {
    assert!(Folder::new(single(Method::Copy), vec![], vec![], None).is_err());

    let mut ar = Archive::new();
    copy_folder(&mut ar, &[b"data"]);
    let (db, input) = ar.build();
    let mut out: Vec<u8> = Vec::new();
    let res = decode(&input, &[], &db.folders[0], &registry(), &mut out, &mut NoProgress);
    assert!(matches!(
        res,
        Err(Error::Fatal(FatalError::Graph(GraphError::SizeMismatch { .. })))
    ));
    assert!(out.is_empty());
}
