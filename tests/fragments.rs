//! Integration tests for fragment reassembly driven through a producer.
//!
//! A small chunked container is parsed with the engine: each chunk's payload
//! is emitted as a fragment and registered into a shared group, and the group
//! is then reassembled into a fresh tagged stream which is parsed again with
//! a second producer.

use std::sync::Arc;

use fieldscope::prelude::*;

/// Container layout: repeated `[u8 payload_len][payload bytes]` chunks,
/// terminated by a zero length.
struct ChunkedProducer {
    group: Arc<FragmentGroup>,
}

impl FieldProducer for ChunkedProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        let length = out.bits("length[]", 8, "Payload length")?;
        if length == 0 {
            return Ok(Step::Done);
        }
        let fragment = out.fragment("payload[]", length, "", &self.group)?;
        self.group.add(fragment);
        Ok(Step::Continue)
    }
}

/// Parser for the reassembled logical payload: one big-endian u16 per step.
struct WordsProducer;

impl FieldProducer for WordsProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        if out.remaining_bits() == Some(0) {
            return Ok(Step::Done);
        }
        out.u16("word[]", "")?;
        Ok(Step::Continue)
    }
}

fn chunked(payloads: &[&[u8]]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for payload in payloads {
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(payload);
    }
    bytes.push(0);
    bytes
}

#[test]
fn test_fragments_reassemble_across_the_tree() {
    let bytes = chunked(&[b"AB", b"CD", b"EF"]);
    let group = Arc::new(FragmentGroup::new(
        ReparseTag::new("words").with_arg("origin", "chunked container"),
    ));

    let mut root = FieldSet::root(
        "container",
        Arc::new(InputStream::from_bytes(bytes)),
        Arc::new(Diagnostics::new()),
        Box::new(ChunkedProducer {
            group: Arc::clone(&group),
        }),
    );
    root.produce_all().unwrap();

    // Three fragments, interleaved with their length prefixes.
    assert_eq!(group.len(), 3);
    assert_eq!(
        root.get("payload[1]")
            .unwrap()
            .as_fragment()
            .unwrap()
            .raw_bytes()
            .unwrap(),
        b"CD"
    );

    let rebuilt = group.create_input_stream().unwrap();
    assert_eq!(rebuilt.data(), b"ABCDEF");
    assert_eq!(rebuilt.tag().map(|t| t.parser_id), Some("words"));
}

#[test]
fn test_reassembled_stream_parses_with_its_own_producer() {
    let bytes = chunked(&[&[0x12, 0x34], &[0x56, 0x78]]);
    let group = Arc::new(FragmentGroup::new(ReparseTag::new("words")));

    let mut root = FieldSet::root(
        "container",
        Arc::new(InputStream::from_bytes(bytes)),
        Arc::new(Diagnostics::new()),
        Box::new(ChunkedProducer {
            group: Arc::clone(&group),
        }),
    );
    root.produce_all().unwrap();

    let mut words = FieldSet::root(
        "words",
        Arc::new(group.create_input_stream().unwrap()),
        Arc::new(Diagnostics::new()),
        Box::new(WordsProducer),
    );
    words.produce_all().unwrap();

    let values: Vec<u64> = words
        .iter()
        .map(|node| node.as_field().unwrap().value().unwrap().as_u64().unwrap())
        .collect();
    assert_eq!(values, vec![0x1234, 0x5678]);
}

#[test]
fn test_reinterpret_from_any_member_sees_the_whole_group() {
    let bytes = chunked(&[b"XX", b"YY"]);
    let group = Arc::new(FragmentGroup::new(ReparseTag::new("words")));

    let mut root = FieldSet::root(
        "container",
        Arc::new(InputStream::from_bytes(bytes)),
        Arc::new(Diagnostics::new()),
        Box::new(ChunkedProducer {
            group: Arc::clone(&group),
        }),
    );
    root.produce_all().unwrap();

    let last = root.get("payload[1]").unwrap().as_fragment().unwrap();
    assert_eq!(last.raw_bytes().unwrap(), b"YY");
    assert_eq!(last.reinterpret().unwrap().data(), b"XXYY");
}
