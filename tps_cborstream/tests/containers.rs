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
 * Container bookkeeping tests for the stream writer
 *
 * Declared element counts are enforced exactly: arrays count each element, maps count each key
 * and each value.
 **************************************************************************************************/

extern crate tps_cborstream;

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

#[test]
fn sized_containers() -> Result<(), CBORError> {
    println!("<======================= sized_containers =====================>");
    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_array_sized(0)?;
        w.write_end_array()
    })?;
    assert_eq!(bytes, [0x80]);

    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_array_sized(3)?;
        w.write_i32(1)?;
        w.write_i32(2)?;
        w.write_i32(3)?;
        w.write_end_array()
    })?;
    assert_eq!(bytes, [0x83, 0x01, 0x02, 0x03]);

    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_map_sized(1)?;
        w.write_field_name("a")?;
        w.write_i32(1)?;
        w.write_end_map()
    })?;
    assert_eq!(bytes, [0xa1, 0x61, 0x61, 0x01]);

    // {"a": 1, "b": [2, 3]}
    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_map_sized(2)?;
        w.write_field_name("a")?;
        w.write_i32(1)?;
        w.write_field_name("b")?;
        w.write_start_array_sized(2)?;
        w.write_i32(2)?;
        w.write_i32(3)?;
        w.write_end_array()?;
        w.write_end_map()
    })?;
    assert_eq!(
        bytes,
        [0xa2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x82, 0x02, 0x03]
    );

    // A 25-element array promotes the length to the uint8 head
    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_array_sized(25)?;
        for i in 0..25 {
            w.write_i32(i)?;
        }
        w.write_end_array()
    })?;
    assert_eq!(bytes[0..2], [0x98, 0x19]);
    Ok(())
}

#[test]
fn indefinite_containers() -> Result<(), CBORError> {
    println!("<======================= indefinite_containers =====================>");
    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_array()?;
        w.write_bool(true)?;
        w.write_bool(true)?;
        w.write_end_array()
    })?;
    assert_eq!(bytes, [0x9f, 0xf5, 0xf5, 0xff]);

    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_map()?;
        w.write_field_name("a")?;
        w.write_i32(1)?;
        w.write_end_map()
    })?;
    assert_eq!(bytes, [0xbf, 0x61, 0x61, 0x01, 0xff]);

    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_start_array()?;
        w.write_end_array()
    })?;
    assert_eq!(bytes, [0x9f, 0xff]);
    Ok(())
}

#[test]
fn size_mismatch_is_detected() {
    println!("<======================= size_mismatch_is_detected =====================>");
    // One element short
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_array_sized(2).unwrap();
    writer.write_i32(1).unwrap();
    assert!(matches!(
        writer.write_end_array(),
        Err(CBORError::TooFewItems(1))
    ));

    // One element over
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_array_sized(1).unwrap();
    writer.write_i32(1).unwrap();
    assert!(matches!(writer.write_i32(2), Err(CBORError::TooManyItems)));

    // Map counts keys and values separately: a missing value shows up as leftover elements
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_map_sized(1).unwrap();
    writer.write_field_name("a").unwrap();
    assert!(matches!(
        writer.write_end_map(),
        Err(CBORError::MissingValue)
    ));

    // Extra pair in a sized map
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_map_sized(1).unwrap();
    writer.write_field_name("a").unwrap();
    writer.write_i32(1).unwrap();
    assert!(matches!(
        writer.write_field_name("b"),
        Err(CBORError::TooManyItems)
    ));
}

#[test]
fn context_errors() {
    println!("<======================= context_errors =====================>");
    // Field name outside a map
    let mut writer = CBORWriter::new(Vec::new());
    assert!(matches!(
        writer.write_field_name("a"),
        Err(CBORError::FieldNameNotAllowed)
    ));

    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_array().unwrap();
    assert!(matches!(
        writer.write_field_name("a"),
        Err(CBORError::FieldNameNotAllowed)
    ));

    // Value where a name is expected
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_map().unwrap();
    assert!(matches!(writer.write_i32(1), Err(CBORError::ExpectedFieldName)));

    // Name where a value is expected
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_map().unwrap();
    writer.write_field_name("a").unwrap();
    assert!(matches!(
        writer.write_field_name("b"),
        Err(CBORError::FieldNameNotAllowed)
    ));

    // Mismatched end kind
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_array().unwrap();
    assert!(matches!(
        writer.write_end_map(),
        Err(CBORError::ExpectedContext("map"))
    ));

    // The root frame cannot be closed
    let mut writer = CBORWriter::new(Vec::new());
    assert!(matches!(
        writer.write_end_array(),
        Err(CBORError::ExpectedContext("array"))
    ));
}

#[test]
fn nesting_limit() {
    println!("<======================= nesting_limit =====================>");
    let mut writer = CBORWriter::new(Vec::new()).with_max_nesting(4);
    for _ in 0..4 {
        writer.write_start_array().unwrap();
    }
    assert!(matches!(
        writer.write_start_array(),
        Err(CBORError::NestingTooDeep(4))
    ));
}

#[test]
fn close_terminates_open_content() -> Result<(), CBORError> {
    println!("<======================= close_terminates_open_content =====================>");
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_array()?;
    writer.write_start_map()?;
    writer.write_field_name("a")?;
    writer.write_bool(true)?;
    writer.close()?;
    let bytes = writer.into_inner()?;
    assert_eq!(bytes, [0x9f, 0xbf, 0x61, 0x61, 0xf5, 0xff, 0xff]);

    // With auto-close disabled the unterminated content is emitted as-is
    let features = EncoderFeatures::default().without(feature::AUTO_CLOSE_CONTENT);
    let mut writer = CBORWriter::with_features(Vec::new(), features);
    writer.write_start_array()?;
    writer.write_bool(true)?;
    writer.close()?;
    let bytes = writer.into_inner()?;
    assert_eq!(bytes, [0x9f, 0xf5]);
    Ok(())
}

#[test]
fn multiple_root_items_form_a_sequence() -> Result<(), CBORError> {
    println!("<================== multiple_root_items_form_a_sequence ==================>");
    let bytes = written(EncoderFeatures::default(), |w| {
        w.write_i32(1)?;
        w.write_tstr("a")?;
        w.write_bool(false)
    })?;
    assert_eq!(bytes, [0x01, 0x61, 0x61, 0xf4]);
    Ok(())
}

#[test]
fn errors_poison_the_writer() {
    println!("<======================= errors_poison_the_writer =====================>");
    let mut writer = CBORWriter::new(Vec::new());
    writer.write_start_array_sized(1).unwrap();
    writer.write_i32(1).unwrap();
    assert!(matches!(writer.write_i32(2), Err(CBORError::TooManyItems)));

    // Every call but close now fails
    assert!(matches!(writer.write_i32(3), Err(CBORError::WriterClosed)));
    assert!(matches!(writer.flush(), Err(CBORError::WriterClosed)));

    // Close releases resources without error, and stays a no-op afterwards
    assert!(writer.close().is_ok());
    assert!(writer.close().is_ok());
    assert!(matches!(writer.write_i32(4), Err(CBORError::WriterClosed)));
}
