//! Integration tests for the OpenTrep wrapper
//!
//! These tests drive full sessions through the public API with recorded or
//! scripted engines, so no native OpenTrep installation is needed.

use std::{
    cell::Cell,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::{BufMut, Bytes, BytesMut};
use opentrep_wrapper::{
    EngineError, OutputFormat, ReplayEngine, TrepConfig, TrepEngine, TrepSession, WireFormat,
    error::TrepError,
};

fn setup_test_env() {
    let _ = opentrep_wrapper::init_logging(tracing::Level::WARN);
}

fn config_in(dir: &tempfile::TempDir) -> TrepConfig {
    TrepConfig::builder()
        .por_path(dir.path().join("ori_por_public.csv"))
        .xapian_index_path(dir.path().join("xapian_traveldb"))
        .build()
        .expect("Default config should build")
}

const JSON_ANSWER: &str = r#"{"locations":[
    {"iata_code":"ORY","icao_code":"LFPO","geonames_id":"2988500","page_rank":"23.53",
     "cities":{"city_details":{"iata_code":"PAR"}},"lat":"48.725278","lon":"2.359444"},
    {"iata_code":"CDG","icao_code":"LFPG","geonames_id":"6269554","page_rank":"64.70",
     "city_code":"PAR","lat":"49.012779","lon":"2.55"}
]}"#;

#[test]
fn test_full_workflow() {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();

    let engine = ReplayEngine::new()
        .with_answer(WireFormat::Compact, "cdg/64.7,ory/23.53;niznayou")
        .with_answer(WireFormat::Json, JSON_ANSWER)
        .with_answer(WireFormat::Full, "1. CDG-A-6269554, 64.70%, Paris Charles de Gaulle")
        .with_index_count(11_742);

    // 1. Initialize
    let mut session =
        TrepSession::initialize(engine, config_in(&dir)).expect("Session should initialize");
    assert!(dir.path().join("xapian_traveldb").is_dir());

    // 2. Paths
    let paths = session.paths().expect("Paths should be reported");
    assert!(paths.por_path.ends_with("ori_por_public.csv"));
    assert!(paths.index_path.ends_with("xapian_traveldb0"));

    // 3. Index
    assert_eq!(session.index().unwrap(), 11_742);

    // 4. Compact search
    let outcome = session.search("paris niznayou", OutputFormat::Compact).unwrap();
    let result = outcome.result.as_ref().expect("Compact answers are decoded");
    assert_eq!(result.codes(), vec!["CDG", "ORY"]);
    assert_eq!(result.unmatched_text(), "niznayou");

    // 5. Interpreted search asks the engine for JSON
    let outcome = session.search("paris", OutputFormat::Interpreted).unwrap();
    assert_eq!(
        outcome.result.unwrap().render_interpreted(),
        "ORY-LFPO-2988500-23.53%-PAR-48.73-2.36; CDG-LFPG-6269554-64.70%-PAR-49.01-2.55"
    );

    // 6. Full answers stay raw
    let outcome = session.search("paris", OutputFormat::Full).unwrap();
    assert!(outcome.result.is_none());
    assert!(outcome.raw_text().starts_with("1. CDG"));

    // 7. Finalize
    session.finalize();
}

#[test]
fn test_search_output_block() {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();
    let engine = ReplayEngine::new().with_answer(WireFormat::Compact, "nce/100,sfo/100-emb/98");
    let session = TrepSession::initialize(engine, config_in(&dir)).unwrap();

    let outcome = session.search("", OutputFormat::Compact).unwrap();
    assert_eq!(outcome.query, "nce sfo");

    let printed = outcome.to_string();
    assert!(printed.starts_with("Compact format => recognised place (city/airport) codes:"));
    assert!(printed.contains("([(1, 'NCE'), (1, 'SFO')], '')"));
    assert!(printed.trim_end().ends_with("------------------"));
}

#[test]
fn test_refused_init_is_an_error() {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();
    let engine = ReplayEngine::new().with_init_result(false);

    let err = TrepSession::initialize(engine, config_in(&dir)).unwrap_err();
    assert!(matches!(err, TrepError::EngineError(EngineError::Init(_))));
}

#[test]
fn test_malformed_answer_surfaces_parse_error() {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();
    let engine = ReplayEngine::new().with_answer(WireFormat::Compact, "nce/abc");
    let session = TrepSession::initialize(engine, config_in(&dir)).unwrap();

    let err = session.search("nce", OutputFormat::Compact).unwrap_err();
    assert!(matches!(err, TrepError::ParseError(_)));
}

/// Engine that counts lifecycle calls.
#[derive(Debug, Default)]
struct CountingEngine {
    searches: Rc<Cell<usize>>,
    finalized: Arc<AtomicUsize>,
}

impl TrepEngine for CountingEngine {
    fn init(&mut self, _config: &TrepConfig) -> Result<bool, EngineError> {
        Ok(true)
    }

    fn paths(&self) -> Result<String, EngineError> {
        Ok("por.csv;index0".into())
    }

    fn index(&mut self) -> Result<u64, EngineError> {
        Ok(0)
    }

    fn search(&self, _format: WireFormat, query: &str) -> Result<Bytes, EngineError> {
        self.searches.set(self.searches.get() + 1);
        Ok(Bytes::from(format!("{}/100", query.split(' ').next().unwrap_or("nce"))))
    }

    fn finalize(&mut self) {
        self.finalized.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_finalize_runs_once() {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();
    let finalized = Arc::new(AtomicUsize::new(0));

    let engine = CountingEngine {
        finalized: Arc::clone(&finalized),
        ..Default::default()
    };
    let session = TrepSession::initialize(engine, config_in(&dir)).unwrap();
    session.finalize();
    assert_eq!(finalized.load(Ordering::SeqCst), 1);

    // Dropping an unfinalized session also finalizes
    let engine = CountingEngine {
        finalized: Arc::clone(&finalized),
        ..Default::default()
    };
    let session = TrepSession::initialize(engine, config_in(&dir)).unwrap();
    drop(session);
    assert_eq!(finalized.load(Ordering::SeqCst), 2);
}

#[test]
fn test_custom_engine_searches() {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();
    let searches = Rc::new(Cell::new(0));
    let engine = CountingEngine {
        searches: Rc::clone(&searches),
        ..Default::default()
    };
    let session = TrepSession::initialize(engine, config_in(&dir)).unwrap();

    for query in ["lhr heathrow", "sfo", "yul montreal"] {
        let outcome = session.search(query, OutputFormat::Compact).unwrap();
        assert_eq!(outcome.result.unwrap().matches().len(), 1);
    }
    assert_eq!(searches.get(), 3);
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn put_message(buf: &mut BytesMut, field: u64, body: &[u8]) {
    put_varint(buf, (field << 3) | 2);
    put_varint(buf, body.len() as u64);
    buf.put_slice(body);
}

#[test]
fn test_protobuf_session() {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();

    let mut code = BytesMut::new();
    put_message(&mut code, 1, b"NCE");
    let mut rank = BytesMut::new();
    put_varint(&mut rank, (1 << 3) | 1);
    rank.put_u64_le(100.0_f64.to_bits());
    let mut place = BytesMut::new();
    put_message(&mut place, 3, &code);
    put_message(&mut place, 17, &rank);
    let mut place_list = BytesMut::new();
    put_message(&mut place_list, 1, &place);
    let mut word = BytesMut::new();
    put_message(&mut word, 1, b"niznayou");
    let mut answer = BytesMut::new();
    put_message(&mut answer, 3, &place_list);
    put_message(&mut answer, 4, &word);

    let engine = ReplayEngine::new()
        .with_answer(WireFormat::Protobuf, answer.freeze())
        .with_answer(WireFormat::Json, "not json");
    let session = TrepSession::initialize(engine, config_in(&dir)).unwrap();

    let outcome = session.search("nice niznayou", OutputFormat::Protobuf).unwrap();
    let result = outcome.result.unwrap();
    assert!(!result.is_degraded());
    assert_eq!(result.render_interpreted(), "NCE---100.00%---");
    assert_eq!(result.unmatched_text(), "niznayou");

    // A truncated protobuf answer degrades instead of failing
    let engine = ReplayEngine::new().with_answer(WireFormat::Protobuf, Bytes::from_static(&[0x1a, 0x05, 0x0a]));
    let session = TrepSession::initialize(engine, config_in(&dir)).unwrap();
    let outcome = session.search("nice", OutputFormat::Protobuf).unwrap();
    let result = outcome.result.unwrap();
    assert!(result.is_degraded());
    assert!(result.is_empty());
}
