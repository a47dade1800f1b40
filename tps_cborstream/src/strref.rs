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
 * tps_cborstream stringref table
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 *
 * The stringref extension (http://cbor.schmorp.de/stringref) replaces a repeated string with
 * `tag(25)` and the index the string was assigned when first emitted. Indices are assigned in
 * emission order, and a string only earns an index when it is at least as long as the shortest
 * back-reference that could replace it at the current table size. Decoders maintain the same
 * table while reading, so the insertion policy here must match them exactly.
 **************************************************************************************************/
use std::collections::HashMap;

#[cfg(feature = "trace")]
use func_trace::trace;

#[cfg(feature = "trace")]
func_trace::init_depth_var!();

/// Content-addressed table of the definite-length strings emitted so far.
///
/// Text keys compare by code-point content, byte keys by exact content. Both key spaces share
/// one index sequence. Byte keys own a copy of their content so that later caller-side mutation
/// of the source buffer cannot corrupt the table.
#[derive(Debug, Default)]
pub(crate) struct StringRefTable {
    text: HashMap<String, u64>,
    bytes: HashMap<Vec<u8>, u64>,
    next_index: u64,
}

impl StringRefTable {
    pub fn new() -> Self {
        StringRefTable::default()
    }

    /// Look up a text string previously assigned an index.
    #[inline]
    pub fn lookup_text(&self, text: &str) -> Option<u64> {
        self.text.get(text).copied()
    }

    /// Look up a byte string previously assigned an index.
    #[inline]
    pub fn lookup_bytes(&self, bytes: &[u8]) -> Option<u64> {
        self.bytes.get(bytes).copied()
    }

    /// Assign the next index to `text` if its encoded length qualifies at the current table
    /// size. `encoded_len` is the UTF-8 byte length that was just emitted.
    #[cfg_attr(feature = "trace", trace)]
    pub fn maybe_insert_text(&mut self, text: &str, encoded_len: usize) {
        if self.qualifies(encoded_len) {
            self.text.insert(text.to_string(), self.next_index);
            self.next_index += 1;
        }
    }

    /// Assign the next index to `bytes` if its length qualifies at the current table size.
    #[cfg_attr(feature = "trace", trace)]
    pub fn maybe_insert_bytes(&mut self, bytes: &[u8]) {
        if self.qualifies(bytes.len()) {
            self.bytes.insert(bytes.to_vec(), self.next_index);
            self.next_index += 1;
        }
    }

    /// The qualification rule of the stringref extension: a string earns an index only when
    /// encoding the back-reference would not be longer than repeating the string itself, which
    /// depends on how wide the next index is.
    fn qualifies(&self, encoded_len: usize) -> bool {
        match self.next_index {
            0..=23 => encoded_len >= 3,
            24..=255 => encoded_len >= 4,
            256..=65535 => encoded_len >= 5,
            65536..=4294967295 => encoded_len >= 7,
            _ => false,
        }
    }
}
