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
 * tps_cborstream UTF-8 transcoder
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 *
 * Token producers deliver text as runs of UCS-2 code units. The transcoder turns such a run into
 * UTF-8 in the output buffer, combining surrogate pairs and applying the configured policy to
 * ill-formed sequences.
 **************************************************************************************************/
use crate::error::{CBORError, Result};

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

const SURROGATE_HIGH_FIRST: u16 = 0xd800;
const SURROGATE_HIGH_LAST: u16 = 0xdbff;
const SURROGATE_LOW_FIRST: u16 = 0xdc00;
const SURROGATE_LOW_LAST: u16 = 0xdfff;

// U+FFFD REPLACEMENT CHARACTER
const REPLACEMENT: [u8; 3] = [0xef, 0xbf, 0xbd];

/// Return `true` if `unit` is the first half of a surrogate pair.
#[inline]
pub(crate) fn is_high_surrogate(unit: u16) -> bool {
    (SURROGATE_HIGH_FIRST..=SURROGATE_HIGH_LAST).contains(&unit)
}

#[inline]
fn is_low_surrogate(unit: u16) -> bool {
    (SURROGATE_LOW_FIRST..=SURROGATE_LOW_LAST).contains(&unit)
}

/// Encode a run of UCS-2 code units as UTF-8 into `out`, returning the number of bytes written.
///
/// The caller must provide at least `3 * units.len()` bytes of space: every unit encodes on at
/// most three bytes, and a surrogate pair encodes its four bytes across two units.
///
/// With `lenient` set, ill-formed sequences are replaced by U+FFFD and encoding continues; a
/// high surrogate followed by a non-low unit consumes only the high surrogate, so the follower
/// is re-examined as an ordinary unit. Without `lenient`, ill-formed sequences fail with
/// [`CBORError::UnpairedSurrogate`] or [`CBORError::BadSurrogatePair`].
#[cfg_attr(feature = "trace", trace)]
pub(crate) fn transcode_utf16(units: &[u16], out: &mut [u8], lenient: bool) -> Result<usize> {
    let mut i = 0;
    let mut o = 0;

    // ASCII fast path: single-byte units copy straight through until the first wider unit.
    while i < units.len() {
        let c = units[i];
        if c > 0x7f {
            break;
        }
        out[o] = c as u8;
        o += 1;
        i += 1;
    }

    while i < units.len() {
        let c = units[i];
        i += 1;
        if c <= 0x7f {
            out[o] = c as u8;
            o += 1;
        } else if c <= 0x7ff {
            out[o] = 0xc0 | (c >> 6) as u8;
            out[o + 1] = 0x80 | (c & 0x3f) as u8;
            o += 2;
        } else if is_high_surrogate(c) {
            match units.get(i) {
                Some(&d) if is_low_surrogate(d) => {
                    i += 1;
                    let code =
                        0x10000u32 + (((c - SURROGATE_HIGH_FIRST) as u32) << 10)
                            + (d - SURROGATE_LOW_FIRST) as u32;
                    out[o] = 0xf0 | (code >> 18) as u8;
                    out[o + 1] = 0x80 | ((code >> 12) & 0x3f) as u8;
                    out[o + 2] = 0x80 | ((code >> 6) & 0x3f) as u8;
                    out[o + 3] = 0x80 | (code & 0x3f) as u8;
                    o += 4;
                }
                Some(&d) => {
                    if !lenient {
                        return Err(CBORError::BadSurrogatePair(c, d));
                    }
                    // The follower is left in place and re-examined on the next pass.
                    out[o..o + 3].copy_from_slice(&REPLACEMENT);
                    o += 3;
                }
                None => {
                    if !lenient {
                        return Err(CBORError::UnpairedSurrogate(c));
                    }
                    out[o..o + 3].copy_from_slice(&REPLACEMENT);
                    o += 3;
                }
            }
        } else if is_low_surrogate(c) {
            if !lenient {
                return Err(CBORError::UnpairedSurrogate(c));
            }
            out[o..o + 3].copy_from_slice(&REPLACEMENT);
            o += 3;
        } else {
            out[o] = 0xe0 | (c >> 12) as u8;
            out[o + 1] = 0x80 | ((c >> 6) & 0x3f) as u8;
            out[o + 2] = 0x80 | (c & 0x3f) as u8;
            o += 3;
        }
    }
    Ok(o)
}
