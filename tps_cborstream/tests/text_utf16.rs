/***************************************************************************************************
 * Copyright (c) 2023, 2024 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice (including the next
 * paragraph) shall be included in all copies or substantial portions of the
 * Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * Code-unit text tests for the stream writer
 *
 * Text supplied as UCS-2 code units is transcoded to UTF-8 with the head baked after the run,
 * and split into indefinite-length chunks past MAX_LONG_TEXT_CHARS. Surrogate pairs must never
 * straddle a chunk boundary.
 **************************************************************************************************/

extern crate tps_cborstream;

use tps_cborstream::constants::MAX_LONG_TEXT_CHARS;
use tps_cborstream::encoder::{feature, CBORWriter, EncoderFeatures};
use tps_cborstream::error::CBORError;

fn written<F>(features: EncoderFeatures, op: F) -> Result<Vec<u8>, CBORError>
where
    F: FnOnce(&mut CBORWriter<Vec<u8>>) -> Result<(), CBORError>,
{
    let mut writer = CBORWriter::with_features(Vec::new(), features);
    op(&mut writer)?;
    writer.close()?;
    writer.into_inner()
}

/// Pull one definite-length text item off the front of `bytes`.
fn read_definite_text(bytes: &[u8]) -> (&[u8], usize) {
    let ib = bytes[0];
    assert_eq!(ib >> 5, 3, "expected a text item, got initial byte {:#04x}", ib);
    let ai = ib & 0x1f;
    let (len, head) = match ai {
        0..=23 => (ai as usize, 1),
        24 => (bytes[1] as usize, 2),
        25 => (u16::from_be_bytes([bytes[1], bytes[2]]) as usize, 3),
        26 => (
            u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize,
            5,
        ),
        _ => panic!("unexpected additional information {}", ai),
    };
    (&bytes[head..head + len], head + len)
}

/// Read one text item, definite or chunked, and hand back its decoded content and total size.
fn read_text_item(bytes: &[u8]) -> (String, usize) {
    if bytes[0] == 0x7f {
        let mut pos = 1;
        let mut content = Vec::new();
        while bytes[pos] != 0xff {
            let (chunk, used) = read_definite_text(&bytes[pos..]);
            content.extend_from_slice(chunk);
            pos += used;
        }
        (String::from_utf8(content).unwrap(), pos + 1)
    } else {
        let (content, used) = read_definite_text(bytes);
        (String::from_utf8(content.to_vec()).unwrap(), used)
    }
}

#[test]
fn code_unit_and_utf8_paths_agree() -> Result<(), CBORError> {
    println!("<================== code_unit_and_utf8_paths_agree ==================>");
    for text in [
        "",
        "a",
        "hello, world",
        "IETF",
        "caf\u{00e9}",
        "\u{6c34}\u{6c34}\u{6c34}",
        "mixed ascii and \u{20ac} and \u{1f600} too",
    ]
    .iter()
    {
        println!("<======================= Agree on {:?} =====================>", *text);
        let units: Vec<u16> = text.encode_utf16().collect();
        let from_str = written(EncoderFeatures::default(), |w| w.write_tstr(text))?;
        let from_units = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
        assert_eq!(from_str, from_units);
    }
    Ok(())
}

#[test]
fn surrogate_pairs_combine() -> Result<(), CBORError> {
    println!("<======================= surrogate_pairs_combine =====================>");
    // U+1F600 as a surrogate pair
    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_tstr_utf16(&[0xd83d, 0xde00])
    })?;
    assert_eq!(bytes, [0x64, 0xf0, 0x9f, 0x98, 0x80]);
    Ok(())
}

#[test]
fn strict_mode_rejects_lone_surrogates() {
    println!("<================== strict_mode_rejects_lone_surrogates ==================>");
    let mut writer = CBORWriter::new(Vec::new());
    assert!(matches!(
        writer.write_tstr_utf16(&[0xd800]),
        Err(CBORError::UnpairedSurrogate(0xd800))
    ));

    let mut writer = CBORWriter::new(Vec::new());
    assert!(matches!(
        writer.write_tstr_utf16(&[0xd800, 0x0041]),
        Err(CBORError::BadSurrogatePair(0xd800, 0x0041))
    ));

    let mut writer = CBORWriter::new(Vec::new());
    assert!(matches!(
        writer.write_tstr_utf16(&[0xdc00]),
        Err(CBORError::UnpairedSurrogate(0xdc00))
    ));
}

#[test]
fn lenient_mode_substitutes_replacement_char() -> Result<(), CBORError> {
    println!("<================== lenient_mode_substitutes_replacement_char ==================>");
    let features = EncoderFeatures::default().with(feature::LENIENT_UTF_ENCODING);

    let bytes = written(features, |w| w.write_tstr_utf16(&[0xd800]))?;
    assert_eq!(bytes, [0x63, 0xef, 0xbf, 0xbd]);

    // The follower of a broken pair is kept and re-encoded on its own
    let bytes = written(features, |w| w.write_tstr_utf16(&[0xd800, 0x0041]))?;
    assert_eq!(bytes, [0x64, 0xef, 0xbf, 0xbd, 0x41]);

    let bytes = written(features, |w| w.write_tstr_utf16(&[0xdc00]))?;
    assert_eq!(bytes, [0x63, 0xef, 0xbf, 0xbd]);
    Ok(())
}

#[test]
fn head_width_follows_encoded_length() -> Result<(), CBORError> {
    println!("<================== head_width_follows_encoded_length ==================>");
    // 23 single-byte units keep the inline head
    let units = vec![0x61u16; 23];
    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
    assert_eq!(bytes[0], 0x77);
    assert_eq!(bytes.len(), 24);

    // 23 two-byte units outgrow the inline head: the payload shifts up for a uint8 length
    let units = vec![0x00e9u16; 23];
    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
    assert_eq!(bytes[0..2], [0x78, 46]);
    assert_eq!(bytes.len(), 48);

    // 24 single-byte units sit in the uint8 class from the start
    let units = vec![0x61u16; 24];
    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
    assert_eq!(bytes[0..2], [0x78, 24]);
    assert_eq!(bytes.len(), 26);

    // 200 three-byte units promote the uint8 class to uint16
    let units = vec![0x4e2du16; 200];
    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
    assert_eq!(bytes[0..3], [0x79, 0x02, 0x58]);
    assert_eq!(bytes.len(), 603);

    // 300 single-byte units take the uint16 head directly
    let units = vec![0x61u16; 300];
    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
    assert_eq!(bytes[0..3], [0x79, 0x01, 0x2c]);
    assert_eq!(bytes.len(), 303);

    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&[]))?;
    assert_eq!(bytes, [0x60]);
    Ok(())
}

#[test]
fn chunk_boundary_never_splits_a_pair() -> Result<(), CBORError> {
    println!("<================== chunk_boundary_never_splits_a_pair ==================>");
    // A surrogate pair laid exactly across the chunk limit: the first chunk is shortened by
    // one unit so the pair stays whole.
    let mut units = vec![0x61u16; MAX_LONG_TEXT_CHARS - 1];
    units.push(0xd83d);
    units.push(0xde00);
    assert_eq!(units.len(), MAX_LONG_TEXT_CHARS + 1);

    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
    assert_eq!(bytes[0], 0x7f);
    // First chunk: 1995 single-byte units, one unit short of the limit
    assert_eq!(bytes[1..4], [0x79, 0x07, 0xcb]);

    let (decoded, used) = read_text_item(&bytes);
    assert_eq!(used, bytes.len());
    assert_eq!(decoded, String::from_utf16(&units).unwrap());
    Ok(())
}

#[test]
fn long_code_unit_runs_round_trip() -> Result<(), CBORError> {
    println!("<================== long_code_unit_runs_round_trip ==================>");
    // Mixed BMP and astral content, repeated past 100000 code units
    let base: Vec<u16> = "ab\u{20ac}\u{1f600}xyz\u{6c34}".encode_utf16().collect();
    let mut units = Vec::new();
    while units.len() < 100000 {
        units.extend_from_slice(&base);
    }

    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr_utf16(&units))?;
    assert_eq!(bytes[0], 0x7f);
    let (decoded, used) = read_text_item(&bytes);
    assert_eq!(used, bytes.len());
    assert_eq!(decoded, String::from_utf16(&units).unwrap());
    Ok(())
}

#[test]
fn long_utf8_strings_are_chunked() -> Result<(), CBORError> {
    println!("<================== long_utf8_strings_are_chunked ==================>");
    let text: String = std::iter::repeat('x').take(10000).collect();
    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr(&text))?;
    assert_eq!(bytes[0], 0x7f);
    let (decoded, used) = read_text_item(&bytes);
    assert_eq!(used, bytes.len());
    assert_eq!(decoded, text);

    // Multi-byte scalars survive the byte-budget chunking intact
    let text: String = std::iter::repeat('\u{6c34}').take(4000).collect();
    let bytes = written(EncoderFeatures::default(), |w| w.write_tstr(&text))?;
    assert_eq!(bytes[0], 0x7f);
    let (decoded, used) = read_text_item(&bytes);
    assert_eq!(used, bytes.len());
    assert_eq!(decoded, text);
    Ok(())
}

#[test]
fn code_unit_field_names() -> Result<(), CBORError> {
    println!("<======================= code_unit_field_names =====================>");
    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_map_sized(1)?;
        w.write_field_name_utf16(&[0x61])?;
        w.write_i32(1)?;
        w.write_end_map()
    })?;
    assert_eq!(bytes, [0xa1, 0x61, 0x61, 0x01]);
    Ok(())
}

#[test]
fn chunked_text_skips_the_stringref_table() -> Result<(), CBORError> {
    println!("<================== chunked_text_skips_the_stringref_table ==================>");
    let features = EncoderFeatures::default().with(feature::STRINGREF);
    let units = vec![0x61u16; MAX_LONG_TEXT_CHARS + 10];
    let bytes = written(features, |w| {
        w.write_tstr_utf16(&units)?;
        w.write_tstr_utf16(&units)
    })?;
    // Both emissions are literal chunked items, no back-reference
    assert_eq!(bytes[0], 0x7f);
    let (first, used) = read_text_item(&bytes);
    assert_eq!(bytes[used], 0x7f);
    let (second, used2) = read_text_item(&bytes[used..]);
    assert_eq!(used + used2, bytes.len());
    assert_eq!(first, second);
    Ok(())
}
