/***************************************************************************************************
 * Copyright (c) 2023, 2024 Qualcomm Innovation Center, Inc. All rights reserved.
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of this software
 * and associated documentation files (the “Software”), to deal in the Software without
 * restriction, including without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all copies or
 * substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
 * BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
 * DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 **************************************************************************************************/
/***************************************************************************************************
 * tps_cborstream CBOR stream writer
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 *
 * All encoding goes through a pooled output buffer. Every write path reserves its worst case
 * before putting down a single byte, so a flush can never fall inside a multi-byte head, a UTF-8
 * sequence or a surrogate pair.
 **************************************************************************************************/
use std::convert::TryFrom;
use std::io::{Read, Write};
use std::mem;

use crate::buffer;
use crate::constants::*;
use crate::context::{ContextKind, EncodeContext};
use crate::error::{CBORError, Result};
use crate::features::EncoderFeatures;
use crate::strref::StringRefTable;
use crate::utf8::{is_high_surrogate, transcode_utf16};

use half::f16;

#[cfg(feature = "std_tags")]
use chrono::{DateTime, FixedOffset};

/// Default bound on container nesting, checked on every container start.
pub const DEFAULT_MAX_NESTING: usize = 1000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum WriterState {
    Active,
    Poisoned,
    Closed,
}

/// A streaming CBOR writer.
///
/// `CBORWriter` consumes a sequence of token events (scalars, field names, container starts and
/// ends) and emits the corresponding RFC8949 byte stream on any [`std::io::Write`] sink. Wire
/// format options are selected at construction through [`EncoderFeatures`].
///
/// Any error poisons the writer: subsequent calls fail with [`CBORError::WriterClosed`] and only
/// [`CBORWriter::close`] remains valid. `close` is idempotent, and dropping an unclosed writer
/// performs a best-effort `close` with any failure discarded; call [`CBORWriter::close`] or
/// [`CBORWriter::into_inner`] to observe it.
#[derive(Debug)]
pub struct CBORWriter<W: Write> {
    // `None` only once `into_inner` has reclaimed the sink
    sink: Option<W>,
    buf: Vec<u8>,
    tail: usize,
    features: EncoderFeatures,
    contexts: Vec<EncodeContext>,
    string_refs: Option<StringRefTable>,
    max_nesting: usize,
    state: WriterState,
}

impl<W: Write> CBORWriter<W> {
    /// Construct a writer over `sink` with the default feature set.
    pub fn new(sink: W) -> CBORWriter<W> {
        Self::with_features(sink, EncoderFeatures::default())
    }

    /// Construct a writer over `sink` with an explicit feature set.
    pub fn with_features(sink: W, features: EncoderFeatures) -> CBORWriter<W> {
        let mut writer = CBORWriter {
            sink: Some(sink),
            buf: buffer::acquire(),
            tail: 0,
            features,
            contexts: vec![EncodeContext::root()],
            string_refs: if features.stringref() {
                Some(StringRefTable::new())
            } else {
                None
            },
            max_nesting: DEFAULT_MAX_NESTING,
            state: WriterState::Active,
        };
        if features.type_header() {
            // Self-describe tag 55799: d9 d9 f7. The buffer is freshly acquired, so there is
            // always room.
            writer.buf[0] = MT_TAG | PAYLOAD_TWO_BYTES;
            writer.buf[1..3].copy_from_slice(&(TAG_SELF_DESCRIBE as u16).to_be_bytes());
            writer.tail = 3;
        }
        writer
    }

    /// Replace the nesting bound checked on every container start.
    pub fn with_max_nesting(mut self, limit: usize) -> Self {
        self.max_nesting = limit;
        self
    }

    /// The feature set this writer was constructed with.
    pub fn features(&self) -> EncoderFeatures {
        self.features
    }

    /// Return `true` if `flag` (a value from [`crate::features::feature`]) is enabled.
    pub fn is_enabled(&self, flag: u32) -> bool {
        self.features.is_enabled(flag)
    }

    /*
     * Scalar writers
     */

    /// Write `null` (0xf6).
    pub fn write_null(&mut self) -> Result<()> {
        self.guarded(|w| w.simple_value(SIMPLE_NULL))
    }

    /// Write `undefined` (0xf7).
    pub fn write_undefined(&mut self) -> Result<()> {
        self.guarded(|w| w.simple_value(SIMPLE_UNDEFINED))
    }

    /// Write a boolean (0xf4 / 0xf5).
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        let ai = if value { SIMPLE_TRUE } else { SIMPLE_FALSE };
        self.guarded(|w| w.simple_value(ai))
    }

    /// Write a simple value other than the booleans, `null` and `undefined`. Values 20..=31 are
    /// reserved by RFC8949 and are rejected.
    pub fn write_simple(&mut self, value: u8) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            match value {
                0..=19 => {
                    w.ensure_room(1)?;
                    w.push_byte(MT_SIMPLE | value);
                    Ok(())
                }
                20..=31 => Err(CBORError::BadArgument("reserved simple value")),
                _ => {
                    w.ensure_room(2)?;
                    w.push_byte(MT_SIMPLE | PAYLOAD_ONE_BYTE);
                    w.push_byte(value);
                    Ok(())
                }
            }
        })
    }

    /// Write a 32-bit signed integer as Major Type 0 or 1.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.signed_i32_item(value)
        })
    }

    /// Write a 64-bit signed integer as Major Type 0 or 1.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.signed_i64_item(value)
        })
    }

    /// Write an arbitrary-precision integer as tag 2 or tag 3 over a byte string.
    ///
    /// `magnitude` is the big-endian magnitude of the value itself for positive numbers, and of
    /// `-1 - n` for negative ones, as RFC8949 defines the tag 3 content. Leading zero bytes are
    /// stripped. The byte string participates in the stringref table like any other.
    pub fn write_bignum(&mut self, negative: bool, magnitude: &[u8]) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            let tag = if negative { TAG_NEG_BIGNUM } else { TAG_POS_BIGNUM };
            w.write_head(MT_TAG, tag)?;
            let mut mag = magnitude;
            while mag.len() > 1 && mag[0] == 0 {
                mag = &mag[1..];
            }
            w.bstr_item(mag)
        })
    }

    /// Write a decimal fraction as tag 4 over `[exponent, mantissa]`.
    ///
    /// `scale` follows the big-decimal convention (digits right of the point), so the encoded
    /// exponent is `-scale`. The mantissa is written as a 32-bit integer, a 64-bit integer or a
    /// bignum, whichever it fits first.
    pub fn write_decimal(&mut self, unscaled: i128, scale: i32) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.write_head(MT_TAG, TAG_DECIMAL_FRACTION)?;
            w.write_head(MT_ARRAY, 2)?;
            w.signed_i64_item(-(scale as i64))?;
            if let Ok(v) = i32::try_from(unscaled) {
                w.signed_i32_item(v)
            } else if let Ok(v) = i64::try_from(unscaled) {
                w.signed_i64_item(v)
            } else {
                let negative = unscaled < 0;
                let magnitude = if negative {
                    !(unscaled as u128)
                } else {
                    unscaled as u128
                };
                let tag = if negative { TAG_NEG_BIGNUM } else { TAG_POS_BIGNUM };
                w.write_head(MT_TAG, tag)?;
                let be = magnitude.to_be_bytes();
                let first = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
                w.bstr_item(&be[first..])
            }
        })
    }

    /// Write a half-precision float (0xf9 + big-endian bits).
    pub fn write_f16(&mut self, value: f16) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.ensure_room(3)?;
            w.push_byte(MT_FLOAT | PAYLOAD_TWO_BYTES);
            w.push_slice(&value.to_be_bytes());
            Ok(())
        })
    }

    /// Write a single-precision float (0xfa + big-endian bits).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.float32_item(value)
        })
    }

    /// Write a double-precision float (0xfb + big-endian bits).
    ///
    /// With minimal doubles enabled the value is narrowed to `f32` when the round-trip compares
    /// exactly equal. NaN never compares equal, so NaN always keeps the 8-byte form.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            if w.features.minimal_doubles() {
                let narrowed = value as f32;
                if f64::from(narrowed) == value {
                    return w.float32_item(narrowed);
                }
            }
            w.ensure_room(9)?;
            w.push_byte(MT_FLOAT | PAYLOAD_EIGHT_BYTES);
            w.push_slice(&value.to_be_bytes());
            Ok(())
        })
    }

    /*
     * String writers
     */

    /// Write a UTF-8 text string (Major Type 3).
    ///
    /// Text that fits the output buffer is emitted as one definite-length item; longer text is
    /// split into indefinite-length chunks at `char` boundaries. Definite-length items go
    /// through the stringref table when the extension is enabled.
    pub fn write_tstr(&mut self, text: &str) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.tstr_item(text)
        })
    }

    /// Write a text string supplied as UCS-2 code units (Major Type 3).
    ///
    /// This is the form token producers hand over when the upstream representation is UTF-16.
    /// Surrogate pairs are combined during transcoding; ill-formed input follows the strict or
    /// lenient policy selected at construction.
    pub fn write_tstr_utf16(&mut self, units: &[u16]) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.tstr_utf16_item(units)
        })
    }

    /// Write a map key. Only valid inside a map that is waiting for a name.
    pub fn write_field_name(&mut self, name: &str) -> Result<()> {
        self.guarded(|w| {
            w.verify_name_write()?;
            w.tstr_item(name)
        })
    }

    /// Write a map key supplied as UCS-2 code units.
    pub fn write_field_name_utf16(&mut self, units: &[u16]) -> Result<()> {
        self.guarded(|w| {
            w.verify_name_write()?;
            w.tstr_utf16_item(units)
        })
    }

    /// Write a byte string (Major Type 2). Goes through the stringref table when the extension
    /// is enabled; on insertion the table keeps its own copy of the content.
    pub fn write_bstr(&mut self, data: &[u8]) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.bstr_item(data)
        })
    }

    /// Write a byte string of `len` bytes copied from `src`.
    ///
    /// The payload is pulled through the output buffer in whole-buffer copies, flushing in
    /// between. A source that runs dry fails with the number of bytes still owed.
    pub fn write_bstr_stream<R: Read>(&mut self, src: &mut R, len: usize) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.write_head(MT_BSTR, len as u64)?;
            let mut remaining = len;
            while remaining > 0 {
                if w.tail == w.buf.len() {
                    w.flush_buffer()?;
                }
                let space = (w.buf.len() - w.tail).min(remaining);
                let got = src.read(&mut w.buf[w.tail..w.tail + space])?;
                if got == 0 {
                    return Err(CBORError::ShortRead(remaining));
                }
                w.tail += got;
                remaining -= got;
            }
            Ok(())
        })
    }

    /*
     * Containers and tags
     */

    /// Open an indefinite-length array (0x9f), terminated by [`CBORWriter::write_end_array`].
    pub fn write_start_array(&mut self) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.check_depth()?;
            w.ensure_room(1)?;
            w.push_byte(START_INDEFINITE_ARRAY);
            w.contexts.push(EncodeContext::indefinite_array());
            Ok(())
        })
    }

    /// Open an array declared to hold exactly `size` elements.
    pub fn write_start_array_sized(&mut self, size: usize) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.check_depth()?;
            w.write_head(MT_ARRAY, size as u64)?;
            w.contexts.push(EncodeContext::definite_array(size));
            Ok(())
        })
    }

    /// Open an indefinite-length map (0xbf), terminated by [`CBORWriter::write_end_map`].
    pub fn write_start_map(&mut self) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.check_depth()?;
            w.ensure_room(1)?;
            w.push_byte(START_INDEFINITE_MAP);
            w.contexts.push(EncodeContext::indefinite_map());
            Ok(())
        })
    }

    /// Open a map declared to hold exactly `size` key/value pairs.
    pub fn write_start_map_sized(&mut self, size: usize) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.check_depth()?;
            w.write_head(MT_MAP, size as u64)?;
            w.contexts.push(EncodeContext::definite_map(size));
            Ok(())
        })
    }

    /// Close the innermost array. A definite-length array must have received exactly its
    /// declared element count.
    pub fn write_end_array(&mut self) -> Result<()> {
        self.guarded(|w| w.end_array())
    }

    /// Close the innermost map. A definite-length map must have received exactly its declared
    /// pairs, and the last key must have its value.
    pub fn write_end_map(&mut self) -> Result<()> {
        self.guarded(|w| w.end_map())
    }

    /// Tag the next item. A tag is a prefix and does not count against the enclosing container:
    /// the tagged item that follows does.
    pub fn write_tag(&mut self, tag: u64) -> Result<()> {
        self.guarded(|w| w.write_head(MT_TAG, tag))
    }

    /// Append one raw byte, bypassing context verification. Escape hatch for callers that
    /// splice pre-encoded material into the stream.
    pub fn write_raw_byte(&mut self, byte: u8) -> Result<()> {
        self.guarded(|w| {
            w.ensure_room(1)?;
            w.push_byte(byte);
            Ok(())
        })
    }

    /*
     * Date/time tags
     */

    /// Write a date/time as tag 0 over its RFC3339 text form.
    #[cfg(feature = "std_tags")]
    pub fn write_datetime(&mut self, date: &DateTime<FixedOffset>) -> Result<()> {
        let text = date.to_rfc3339();
        self.guarded(|w| {
            w.verify_value_write()?;
            w.write_head(MT_TAG, TAG_DATE_TIME)?;
            w.tstr_item(&text)
        })
    }

    /// Write a date/time as tag 1 over seconds since the POSIX epoch.
    #[cfg(feature = "std_tags")]
    pub fn write_epoch(&mut self, secs: i64) -> Result<()> {
        self.guarded(|w| {
            w.verify_value_write()?;
            w.write_head(MT_TAG, TAG_EPOCH)?;
            w.signed_i64_item(secs)
        })
    }

    /*
     * Lifecycle
     */

    /// Push all buffered bytes to the sink. The sink's own `flush` is invoked as well when
    /// flush-passthrough is enabled.
    pub fn flush(&mut self) -> Result<()> {
        self.guarded(|w| {
            w.flush_buffer()?;
            if w.features.flush_passthrough() {
                if let Some(sink) = w.sink.as_mut() {
                    sink.flush()?;
                }
            }
            Ok(())
        })
    }

    /// Close the writer.
    ///
    /// On a healthy writer this ends any still-open containers (when auto-close-content is
    /// enabled), flushes, and returns the output buffer to the pool. On a poisoned writer only
    /// the buffer release happens: the buffered bytes may end mid-item and are discarded.
    /// Closing twice is a no-op, and `Drop` closes any writer not closed explicitly.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            WriterState::Closed => Ok(()),
            WriterState::Poisoned => {
                self.release_buffer();
                self.state = WriterState::Closed;
                Ok(())
            }
            WriterState::Active => {
                let result = self.close_active();
                self.release_buffer();
                self.state = WriterState::Closed;
                result
            }
        }
    }

    /// Close the writer and hand back the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        self.sink.take().ok_or(CBORError::WriterClosed)
    }

    fn close_active(&mut self) -> Result<()> {
        if self.features.auto_close_content() {
            while self.contexts.len() > 1 {
                match self.top().kind {
                    ContextKind::Array => self.end_array()?,
                    ContextKind::Map => self.end_map()?,
                    ContextKind::Root => break,
                }
            }
        }
        self.flush_buffer()?;
        if self.features.flush_passthrough() {
            if let Some(sink) = self.sink.as_mut() {
                sink.flush()?;
            }
        }
        Ok(())
    }

    fn release_buffer(&mut self) {
        let buf = mem::take(&mut self.buf);
        buffer::release(buf);
        self.tail = 0;
    }

    /*
     * Context verification
     */

    /// Run `op` on an active writer and poison the writer if it fails.
    fn guarded<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.state != WriterState::Active {
            return Err(CBORError::WriterClosed);
        }
        let result = op(self);
        if result.is_err() {
            self.state = WriterState::Poisoned;
        }
        result
    }

    #[inline]
    fn top(&mut self) -> &mut EncodeContext {
        let last = self.contexts.len() - 1;
        &mut self.contexts[last]
    }

    /// Account for one value in the current frame: a value may not stand where a field name is
    /// expected, nor exceed a declared element count.
    fn verify_value_write(&mut self) -> Result<()> {
        let ctx = self.top();
        if ctx.expects_name {
            return Err(CBORError::ExpectedFieldName);
        }
        if ctx.remaining == 0 {
            return Err(CBORError::TooManyItems);
        }
        if ctx.remaining > 0 {
            ctx.remaining -= 1;
        }
        if ctx.kind == ContextKind::Map {
            ctx.expects_name = true;
        }
        Ok(())
    }

    /// Account for one field name in the current frame.
    fn verify_name_write(&mut self) -> Result<()> {
        let ctx = self.top();
        if ctx.kind != ContextKind::Map || !ctx.expects_name {
            return Err(CBORError::FieldNameNotAllowed);
        }
        if ctx.remaining == 0 {
            return Err(CBORError::TooManyItems);
        }
        if ctx.remaining > 0 {
            ctx.remaining -= 1;
        }
        ctx.expects_name = false;
        Ok(())
    }

    fn check_depth(&self) -> Result<()> {
        if self.contexts.len() > self.max_nesting {
            Err(CBORError::NestingTooDeep(self.max_nesting))
        } else {
            Ok(())
        }
    }

    fn end_array(&mut self) -> Result<()> {
        let ctx = *self.top();
        if ctx.kind != ContextKind::Array {
            return Err(CBORError::ExpectedContext("array"));
        }
        if ctx.is_definite() {
            if ctx.remaining != 0 {
                return Err(CBORError::TooFewItems(ctx.remaining as u64));
            }
        } else {
            self.ensure_room(1)?;
            self.push_byte(BREAK);
        }
        self.contexts.pop();
        Ok(())
    }

    fn end_map(&mut self) -> Result<()> {
        let ctx = *self.top();
        if ctx.kind != ContextKind::Map {
            return Err(CBORError::ExpectedContext("map"));
        }
        if !ctx.expects_name {
            return Err(CBORError::MissingValue);
        }
        if ctx.is_definite() {
            if ctx.remaining != 0 {
                return Err(CBORError::TooFewItems(ctx.remaining as u64));
            }
        } else {
            self.ensure_room(1)?;
            self.push_byte(BREAK);
        }
        self.contexts.pop();
        Ok(())
    }

    /*
     * Item emission
     */

    fn simple_value(&mut self, ai: u8) -> Result<()> {
        self.verify_value_write()?;
        self.ensure_room(1)?;
        self.push_byte(MT_SIMPLE | ai);
        Ok(())
    }

    fn signed_i32_item(&mut self, value: i32) -> Result<()> {
        // Two's complement: !n == -n - 1, so the negative transform cannot overflow at MIN.
        let (mt, magnitude) = if value < 0 {
            (MT_NINT, !(value as u32))
        } else {
            (MT_UINT, value as u32)
        };
        if self.features.minimal_ints() {
            self.write_head(mt, magnitude as u64)
        } else {
            self.write_head_u32(mt, magnitude)
        }
    }

    fn signed_i64_item(&mut self, value: i64) -> Result<()> {
        let (mt, magnitude) = if value < 0 {
            (MT_NINT, !(value as u64))
        } else {
            (MT_UINT, value as u64)
        };
        if self.features.minimal_ints() {
            self.write_head(mt, magnitude)
        } else {
            // Fixed-width mode keys the head off the source type, not the value
            self.write_head_u64(mt, magnitude)
        }
    }

    fn float32_item(&mut self, value: f32) -> Result<()> {
        self.ensure_room(5)?;
        self.push_byte(MT_FLOAT | PAYLOAD_FOUR_BYTES);
        self.push_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Emit a text string already held as UTF-8.
    fn tstr_item(&mut self, text: &str) -> Result<()> {
        let len = text.len();
        if len > MAX_DEFINITE_TEXT_BYTES {
            return self.chunked_tstr_item(text);
        }
        if let Some(refs) = &self.string_refs {
            if let Some(index) = refs.lookup_text(text) {
                return self.back_reference(index);
            }
        }
        self.write_head(MT_TSTR, len as u64)?;
        self.ensure_room(len)?;
        self.push_slice(text.as_bytes());
        if let Some(refs) = &mut self.string_refs {
            refs.maybe_insert_text(text, len);
        }
        Ok(())
    }

    /// Split UTF-8 text too long for one buffered item into indefinite-length chunks. Chunk
    /// boundaries land on `char` boundaries. Chunked text never enters the stringref table.
    fn chunked_tstr_item(&mut self, text: &str) -> Result<()> {
        self.ensure_room(1)?;
        self.push_byte(START_INDEFINITE_TSTR);
        let bytes = text.as_bytes();
        let mut start = 0;
        while start < bytes.len() {
            let mut end = (start + MAX_CHUNK_TEXT_BYTES).min(bytes.len());
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            let chunk = &bytes[start..end];
            self.write_head(MT_TSTR, chunk.len() as u64)?;
            self.ensure_room(chunk.len())?;
            self.push_slice(chunk);
            start = end;
        }
        self.ensure_room(1)?;
        self.push_byte(BREAK);
        Ok(())
    }

    /// Emit a text string held as UCS-2 code units.
    ///
    /// The encoded byte length is unknown until the run is transcoded, so for short and medium
    /// runs the head is baked afterwards: space for the optimistic head width is reserved, the
    /// run transcoded behind it, and the payload shifted up one byte if the encoding outgrew the
    /// reservation. Runs longer than [`MAX_LONG_TEXT_CHARS`] are chunked.
    fn tstr_utf16_item(&mut self, units: &[u16]) -> Result<()> {
        let len = units.len();
        if len > MAX_LONG_TEXT_CHARS {
            return self.chunked_tstr_utf16_item(units);
        }
        if len == 0 {
            self.ensure_room(1)?;
            self.push_byte(MT_TSTR);
            return Ok(());
        }
        let lenient = self.features.lenient_utf();
        // The stringref key is the decoded text. A run that fails strict decoding can never be
        // in the table; the transcoder below reports the precise offender.
        let decoded: Option<String> = if self.string_refs.is_some() {
            match String::from_utf16(units) {
                Ok(text) => Some(text),
                Err(_) if lenient => Some(String::from_utf16_lossy(units)),
                Err(_) => None,
            }
        } else {
            None
        };
        let hit = match (&self.string_refs, &decoded) {
            (Some(refs), Some(text)) => refs.lookup_text(text),
            _ => None,
        };
        if let Some(index) = hit {
            return self.back_reference(index);
        }

        let reserve = match len {
            1..=23 => 1,
            24..=255 => 2,
            _ => 3,
        };
        // Worst case three bytes per unit, plus one byte of slack should the head outgrow its
        // reservation.
        self.ensure_room(reserve + 3 * len + 1)?;
        let head = self.tail;
        let body = head + reserve;
        let blen = transcode_utf16(units, &mut self.buf[body..], lenient)?;
        match reserve {
            1 => {
                if blen <= PAYLOAD_AI_BITS as usize {
                    self.buf[head] = MT_TSTR | blen as u8;
                    self.tail = body + blen;
                } else {
                    self.buf.copy_within(body..body + blen, body + 1);
                    self.buf[head] = MT_TSTR | PAYLOAD_ONE_BYTE;
                    self.buf[head + 1] = blen as u8;
                    self.tail = body + 1 + blen;
                }
            }
            2 => {
                if blen <= u8::MAX as usize {
                    self.buf[head] = MT_TSTR | PAYLOAD_ONE_BYTE;
                    self.buf[head + 1] = blen as u8;
                    self.tail = body + blen;
                } else {
                    self.buf.copy_within(body..body + blen, body + 1);
                    self.buf[head] = MT_TSTR | PAYLOAD_TWO_BYTES;
                    self.buf[head + 1..head + 3].copy_from_slice(&(blen as u16).to_be_bytes());
                    self.tail = body + 1 + blen;
                }
            }
            _ => {
                // At least 256 units means at least 256 bytes: the uint16 head is minimal.
                self.buf[head] = MT_TSTR | PAYLOAD_TWO_BYTES;
                self.buf[head + 1..head + 3].copy_from_slice(&(blen as u16).to_be_bytes());
                self.tail = body + blen;
            }
        }
        if let (Some(refs), Some(text)) = (&mut self.string_refs, decoded) {
            refs.maybe_insert_text(&text, blen);
        }
        Ok(())
    }

    /// Split a long code-unit run into indefinite-length chunks. A chunk that would end on a
    /// high surrogate is shortened by one unit so no surrogate pair straddles a chunk boundary.
    fn chunked_tstr_utf16_item(&mut self, units: &[u16]) -> Result<()> {
        let lenient = self.features.lenient_utf();
        self.ensure_room(1)?;
        self.push_byte(START_INDEFINITE_TSTR);
        let mut start = 0;
        while start < units.len() {
            let mut end = (start + MAX_LONG_TEXT_CHARS).min(units.len());
            if end < units.len() && is_high_surrogate(units[end - 1]) {
                end -= 1;
            }
            let chunk = &units[start..end];
            self.ensure_room(3 + 3 * chunk.len())?;
            let head = self.tail;
            let body = head + 3;
            let blen = transcode_utf16(chunk, &mut self.buf[body..], lenient)?;
            self.buf[head] = MT_TSTR | PAYLOAD_TWO_BYTES;
            self.buf[head + 1..head + 3].copy_from_slice(&(blen as u16).to_be_bytes());
            self.tail = body + blen;
            start = end;
        }
        self.ensure_room(1)?;
        self.push_byte(BREAK);
        Ok(())
    }

    /// Emit a byte string, consulting the stringref table on both ends.
    fn bstr_item(&mut self, data: &[u8]) -> Result<()> {
        if let Some(refs) = &self.string_refs {
            if let Some(index) = refs.lookup_bytes(data) {
                return self.back_reference(index);
            }
        }
        self.write_head(MT_BSTR, data.len() as u64)?;
        self.copy_payload(data)?;
        if let Some(refs) = &mut self.string_refs {
            refs.maybe_insert_bytes(data);
        }
        Ok(())
    }

    /// Emit `tag(25)` and the table index of a previously seen string.
    fn back_reference(&mut self, index: u64) -> Result<()> {
        self.write_head(MT_TAG, TAG_STRINGREF)?;
        self.write_head(MT_UINT, index)
    }

    /*
     * Buffer management
     */

    /// Emit the one-to-nine-byte head of an item: the initial byte and the smallest argument
    /// width that holds `argument`.
    fn write_head(&mut self, mt: u8, argument: u64) -> Result<()> {
        self.ensure_room(MAX_HEAD_LEN)?;
        if argument <= PAYLOAD_AI_BITS as u64 {
            self.push_byte(mt | argument as u8);
        } else if argument <= u8::MAX as u64 {
            self.push_byte(mt | PAYLOAD_ONE_BYTE);
            self.push_byte(argument as u8);
        } else if argument <= u16::MAX as u64 {
            self.push_byte(mt | PAYLOAD_TWO_BYTES);
            self.push_slice(&(argument as u16).to_be_bytes());
        } else if argument <= u32::MAX as u64 {
            self.push_byte(mt | PAYLOAD_FOUR_BYTES);
            self.push_slice(&(argument as u32).to_be_bytes());
        } else {
            self.push_byte(mt | PAYLOAD_EIGHT_BYTES);
            self.push_slice(&argument.to_be_bytes());
        }
        Ok(())
    }

    /// Emit a head with the argument forced onto four bytes.
    fn write_head_u32(&mut self, mt: u8, argument: u32) -> Result<()> {
        self.ensure_room(5)?;
        self.push_byte(mt | PAYLOAD_FOUR_BYTES);
        self.push_slice(&argument.to_be_bytes());
        Ok(())
    }

    /// Emit a head with the argument forced onto eight bytes.
    fn write_head_u64(&mut self, mt: u8, argument: u64) -> Result<()> {
        self.ensure_room(9)?;
        self.push_byte(mt | PAYLOAD_EIGHT_BYTES);
        self.push_slice(&argument.to_be_bytes());
        Ok(())
    }

    /// Copy an opaque payload through the buffer, flushing between whole-buffer pieces. Only
    /// byte-string payloads come through here: they have no internal encoding a flush could
    /// split.
    fn copy_payload(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            if self.tail == self.buf.len() {
                self.flush_buffer()?;
            }
            let space = (self.buf.len() - self.tail).min(data.len());
            self.push_slice(&data[..space]);
            data = &data[space..];
        }
        Ok(())
    }

    /// Make sure at least `needed` bytes are free behind `tail`, flushing if they are not.
    #[inline]
    fn ensure_room(&mut self, needed: usize) -> Result<()> {
        if self.tail + needed > self.buf.len() {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.tail > 0 {
            if let Some(sink) = self.sink.as_mut() {
                sink.write_all(&self.buf[..self.tail])?;
            }
            self.tail = 0;
        }
        Ok(())
    }

    #[inline]
    fn push_byte(&mut self, byte: u8) {
        self.buf[self.tail] = byte;
        self.tail += 1;
    }

    #[inline]
    fn push_slice(&mut self, src: &[u8]) {
        self.buf[self.tail..self.tail + src.len()].copy_from_slice(src);
        self.tail += src.len();
    }
}

impl<W: Write> Drop for CBORWriter<W> {
    /// Best-effort close: an unclosed writer still flushes its buffered bytes and returns its
    /// buffer to the pool. Errors cannot surface here; call [`CBORWriter::close`] to see them.
    fn drop(&mut self) {
        let _ = self.close();
    }
}
