//! Decoder behaviour over whole documents

mod common;

use common::{literals, top_level_scopes, HEADER_ONLY, TWO_RECORDS};
use dswarm_core::{DecodeError, EventRecorder, PipelineError, StreamEvent};
use dswarm_decoder::{Decoder, DecoderRegistry, OaiDecoder, OaiOptions};

#[test]
fn test_two_records_with_header_and_metadata() {
    let mut recorder = EventRecorder::new();
    let count = OaiDecoder::default().decode(TWO_RECORDS, &mut recorder).unwrap();

    assert_eq!(count, 2);

    let starts: Vec<_> = recorder
        .events()
        .iter()
        .filter(|e| matches!(e, StreamEvent::StartRecord(_) | StreamEvent::EndRecord))
        .cloned()
        .collect();
    assert_eq!(
        starts,
        vec![
            StreamEvent::StartRecord("oai:example.org:1".into()),
            StreamEvent::EndRecord,
            StreamEvent::StartRecord("oai:example.org:2".into()),
            StreamEvent::EndRecord,
        ]
    );

    assert_eq!(
        top_level_scopes(&recorder),
        vec![vec!["header", "metadata"], vec!["header", "metadata"]]
    );
    assert!(recorder
        .events()
        .contains(&StreamEvent::StartEntity("oai_dc:dc".into())));
}

#[test]
fn test_literals_keep_qualified_names() {
    let mut recorder = EventRecorder::new();
    OaiDecoder::default().decode(TWO_RECORDS, &mut recorder).unwrap();

    let names: Vec<String> = literals(&recorder).into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec![
            "identifier",
            "datestamp",
            "dc:title",
            "dc:creator",
            "dc:language",
            "identifier",
            "datestamp",
            "dc:title",
        ]
    );
}

#[test]
fn test_missing_metadata_section_fails() {
    let err = OaiDecoder::default()
        .decode(HEADER_ONLY, &mut EventRecorder::new())
        .unwrap_err();

    assert!(matches!(err, PipelineError::Decode(DecodeError::MissingSection { record: 1, .. })));
}

#[test]
fn test_missing_section_emits_nothing_for_that_record() {
    let mut recorder = EventRecorder::new();
    let _ = OaiDecoder::default().decode(HEADER_ONLY, &mut recorder);
    assert!(recorder.events().is_empty());
}

#[test]
fn test_lenient_decoder_skips_missing_sections() {
    let decoder = OaiDecoder::new(OaiOptions {
        require_sections: false,
        ..Default::default()
    });
    let mut recorder = EventRecorder::new();

    assert_eq!(decoder.decode(HEADER_ONLY, &mut recorder).unwrap(), 1);
    assert_eq!(top_level_scopes(&recorder), vec![vec!["header"]]);
}

#[test]
fn test_malformed_xml_is_a_decode_error() {
    let truncated = &TWO_RECORDS[..TWO_RECORDS.len() / 2];
    let err = OaiDecoder::default()
        .decode(truncated, &mut EventRecorder::new())
        .unwrap_err();

    assert_eq!(err.category(), "decode");
    assert!(err.to_string().starts_with("malformed oai input"));
}

#[test]
fn test_auto_resolution_picks_oai() {
    let registry = DecoderRegistry::with_defaults();
    let decoder = registry.resolve("auto", TWO_RECORDS).unwrap();
    assert_eq!(decoder.name(), "oai");
}

#[test]
fn test_replaying_decoded_events_is_lossless() {
    let mut first = EventRecorder::new();
    OaiDecoder::default().decode(TWO_RECORDS, &mut first).unwrap();

    let mut second = EventRecorder::new();
    first.replay_into(&mut second).unwrap();

    assert_eq!(first.events(), second.events());
}
