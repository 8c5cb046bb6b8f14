//! Integration tests over a crafted TrueType font.
//!
//! The builder assembles a small but structurally complete font: a directory
//! whose on-disk record order deliberately disagrees with the physical table
//! order, a `head` table behind an alignment gap, a `name` table with a
//! UTF-16-BE and a single-byte string, one unknown table, and trailing slack.
//! The tests drive the parser the way a real consumer would: validate first,
//! then pull lazily, then inspect the whole tree.

use fieldscope::diagnostics::AnomalyCategory;
use fieldscope::formats::ttf::{head, TrueTypeFont};
use fieldscope::formats::Validation;
use fieldscope::prelude::*;

const HEAD_OFFSET: u32 = 62;
const NAME_OFFSET: u32 = 116;
const ZZZZ_OFFSET: u32 = 152;
const TOTAL_SIZE: usize = 160;

fn head_table() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(54);
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&0xB1B0_AFBAu32.to_be_bytes());
    bytes.extend_from_slice(&[0x5F, 0x0F, 0x3C, 0xF5]);
    // y0 and cleartype set
    bytes.extend_from_slice(&0x8004u16.to_be_bytes());
    bytes.extend_from_slice(&2048u16.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0xD000_0000u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0xD000_0E10u32.to_be_bytes());
    for metric in [10u16, 20, 1000, 900] {
        bytes.extend_from_slice(&metric.to_be_bytes());
    }
    // bold
    bytes.extend_from_slice(&0x8000u16.to_be_bytes());
    bytes.extend_from_slice(&8u16.to_be_bytes());
    bytes.extend_from_slice(&1i16.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    assert_eq!(bytes.len(), 54);
    bytes
}

fn name_table() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(36);
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&2u16.to_be_bytes());
    bytes.extend_from_slice(&30u16.to_be_bytes());
    // Microsoft / encoding 1 / family name -> UTF-16-BE "AB"
    for value in [3u16, 1, 0, 1, 4, 0] {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    // Macintosh / full name -> single-byte "XY"
    for value in [1u16, 0, 0, 4, 2, 4] {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes.extend_from_slice(&[0x00, b'A', 0x00, b'B', b'X', b'Y']);
    assert_eq!(bytes.len(), 36);
    bytes
}

fn directory_record(bytes: &mut Vec<u8>, tag: &[u8; 4], offset: u32, size: u32) {
    bytes.extend_from_slice(tag);
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&offset.to_be_bytes());
    bytes.extend_from_slice(&size.to_be_bytes());
}

/// Full crafted font. Directory records are stored in the reverse of their
/// physical order on purpose.
fn crafted_font() -> Vec<u8> {
    let mut bytes = Vec::with_capacity(TOTAL_SIZE);
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&3u16.to_be_bytes());
    bytes.extend_from_slice(&48u16.to_be_bytes());
    bytes.extend_from_slice(&2u16.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());

    directory_record(&mut bytes, b"zzzz", ZZZZ_OFFSET, 5);
    directory_record(&mut bytes, b"name", NAME_OFFSET, 36);
    directory_record(&mut bytes, b"head", HEAD_OFFSET, 54);
    assert_eq!(bytes.len(), 60);

    // Two alignment bytes before the head table.
    bytes.extend_from_slice(&[0xCC, 0xCC]);
    bytes.extend_from_slice(&head_table());
    assert_eq!(bytes.len(), NAME_OFFSET as usize);
    bytes.extend_from_slice(&name_table());
    assert_eq!(bytes.len(), ZZZZ_OFFSET as usize);
    bytes.extend_from_slice(&[0xEE; 5]);

    // Trailing slack after the last table.
    bytes.resize(TOTAL_SIZE, 0x00);
    bytes
}

#[test]
fn test_validation_then_full_production() {
    let mut font = TrueTypeFont::from_bytes(crafted_font());
    assert_eq!(font.validate(), Validation::Valid);
    font.root_mut().produce_all().unwrap();

    let names: Vec<&str> = font.root().iter().map(Node::name).collect();
    assert_eq!(
        names,
        vec![
            "maj_ver",
            "min_ver",
            "nb_table",
            "search_range",
            "entry_selector",
            "range_shift",
            "table_hdr[0]",
            "table_hdr[1]",
            "table_hdr[2]",
            "padding[0]",
            "header",
            "names",
            "table[0]",
            "padding[1]",
        ]
    );

    // Gapless coverage of the whole stream.
    let mut expected = 0;
    for node in font.root().iter() {
        assert_eq!(node.bit_offset(), expected, "node {}", node.name());
        expected += node.bit_size();
    }
    assert_eq!(expected, (TOTAL_SIZE as u64) * 8);
}

#[test]
fn test_tables_follow_physical_not_directory_order() {
    let mut font = TrueTypeFont::from_bytes(crafted_font());
    font.root_mut().produce_all().unwrap();

    let header = font.root().get("header").unwrap();
    let names = font.root().get("names").unwrap();
    let unknown = font.root().get("table[0]").unwrap();

    assert_eq!(header.bit_offset(), u64::from(HEAD_OFFSET) * 8);
    assert_eq!(names.bit_offset(), u64::from(NAME_OFFSET) * 8);
    assert_eq!(unknown.bit_offset(), u64::from(ZZZZ_OFFSET) * 8);
    assert_eq!(unknown.bit_size(), 40);

    // The directory records still reflect on-disk order.
    assert_eq!(
        font.root().get("table_hdr[0]").unwrap().description(),
        "Table entry: zzzz (5 bytes)"
    );
    assert_eq!(
        font.root().get("table_hdr[2]").unwrap().description(),
        "Table entry: head (54 bytes)"
    );
}

#[test]
fn test_sub_tables_stay_lazy_until_accessed() {
    let mut font = TrueTypeFont::from_bytes(crafted_font());
    font.root_mut().produce_all().unwrap();

    // The root is fully produced, but the table bodies are not.
    assert!(font.root().is_exhausted());
    let header = font.root().get("header").unwrap().as_set().unwrap();
    assert!(header.is_empty());
    assert!(!header.is_exhausted());
}

#[test]
fn test_head_table_contents() {
    let mut font = TrueTypeFont::from_bytes(crafted_font());
    let header = font
        .root_mut()
        .by_name_mut("header")
        .unwrap()
        .unwrap()
        .as_set_mut()
        .unwrap();
    header.produce_all().unwrap();

    let magic = header.get("magic").unwrap().as_field().unwrap();
    assert_eq!(
        magic.value().unwrap().as_bytes(),
        Some(&[0x5F, 0x0F, 0x3C, 0xF5][..])
    );
    let units = header.get("unit_per_em").unwrap().as_field().unwrap();
    assert_eq!(units.value().unwrap().as_u64(), Some(2048));

    assert_eq!(
        head::head_flags(header).unwrap(),
        head::HeadFlags::BASELINE_AT_Y0 | head::HeadFlags::CLEARTYPE_OPTIMIZED
    );
    assert_eq!(head::mac_style(header).unwrap(), head::MacStyle::BOLD);

    let font_dir = header.get("font_dir").unwrap().as_field().unwrap();
    assert_eq!(
        font_dir.display().unwrap(),
        "Only strongly left to right glyphs"
    );
}

#[test]
fn test_name_table_strings_and_charsets() {
    let mut font = TrueTypeFont::from_bytes(crafted_font());
    let names = font
        .root_mut()
        .by_name_mut("names")
        .unwrap()
        .unwrap()
        .as_set_mut()
        .unwrap();
    names.produce_all().unwrap();

    let family = names.get("value[0]").unwrap().as_field().unwrap();
    assert_eq!(family.value().unwrap().as_str(), Some("AB"));
    assert_eq!(
        family.description(),
        "Name record: Font family name (Microsoft)"
    );

    let full = names.get("value[1]").unwrap().as_field().unwrap();
    assert_eq!(full.value().unwrap().as_str(), Some("XY"));
    assert_eq!(
        full.description(),
        "Name record: Full font name (Macintosh)"
    );
}

#[test]
fn test_unknown_table_is_anomalous_but_preserved() {
    let mut font = TrueTypeFont::from_bytes(crafted_font());
    let unknown = font
        .root_mut()
        .by_name_mut("table[0]")
        .unwrap()
        .unwrap()
        .as_set_mut()
        .unwrap();
    unknown.produce_all().unwrap();

    let content = unknown.get("content").unwrap().as_field().unwrap();
    assert_eq!(content.value().unwrap().as_bytes(), Some(&[0xEE; 5][..]));

    let directory = font.diagnostics().by_category(AnomalyCategory::Directory);
    assert_eq!(directory.len(), 1);
    assert!(directory[0].message.contains("zzzz"));
}

#[test]
fn test_decoding_is_idempotent() {
    let mut font = TrueTypeFont::from_bytes(crafted_font());
    let node = font.root_mut().by_name("nb_table").unwrap().unwrap();
    let field = node.as_field().unwrap();

    let first = field.value().unwrap().clone();
    let second = field.value().unwrap().clone();
    assert_eq!(first, FieldValue::UInt(3));
    assert_eq!(first, second);
}

#[test]
fn test_truncated_table_fails_locally_not_globally() {
    // Cut the font inside the head table; the name table entry now points
    // past the end too, so only the directory itself stays parseable.
    let mut bytes = crafted_font();
    bytes.truncate(HEAD_OFFSET as usize + 10);
    let mut font = TrueTypeFont::from_bytes(bytes);

    assert_eq!(font.validate(), Validation::Valid);
    // Producing the whole root fails once a table no longer fits the stream.
    assert!(font.root_mut().produce_all().is_err());
    // Everything produced before the failure is still inspectable.
    assert!(font.root().get("table_hdr[2]").is_some());
}

#[test]
fn test_metadata_constants() {
    let meta = TrueTypeFont::METADATA;
    assert_eq!(meta.id, "ttf");
    assert_eq!(meta.category.to_string(), "font");
    assert_eq!(meta.extensions, &["ttf"]);
    assert_eq!(meta.min_size_bits, 80);
}
