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
 * tps_cborstream encoding context
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 **************************************************************************************************/

/// Sentinel `remaining` value for frames without a declared element count.
pub(crate) const INDEFINITE_COUNT: i64 = -2;

/// The kind of container a frame tracks. The root frame is always present and never popped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ContextKind {
    Root,
    Array,
    Map,
}

/// One frame of the container stack.
///
/// `remaining` counts elements still to be written in a definite-length container; map keys and
/// map values each count as one element, so a map of N pairs starts at 2N. Indefinite frames and
/// the root carry [`INDEFINITE_COUNT`].
#[derive(Debug, Copy, Clone)]
pub(crate) struct EncodeContext {
    pub kind: ContextKind,
    pub remaining: i64,
    pub expects_name: bool,
}

impl EncodeContext {
    pub fn root() -> Self {
        EncodeContext {
            kind: ContextKind::Root,
            remaining: INDEFINITE_COUNT,
            expects_name: false,
        }
    }

    pub fn definite_array(size: usize) -> Self {
        EncodeContext {
            kind: ContextKind::Array,
            remaining: size as i64,
            expects_name: false,
        }
    }

    pub fn indefinite_array() -> Self {
        EncodeContext {
            kind: ContextKind::Array,
            remaining: INDEFINITE_COUNT,
            expects_name: false,
        }
    }

    pub fn definite_map(size: usize) -> Self {
        EncodeContext {
            kind: ContextKind::Map,
            remaining: 2 * size as i64,
            expects_name: true,
        }
    }

    pub fn indefinite_map() -> Self {
        EncodeContext {
            kind: ContextKind::Map,
            remaining: INDEFINITE_COUNT,
            expects_name: true,
        }
    }

    /// Return `true` if this frame declared its element count up front.
    #[inline]
    pub fn is_definite(&self) -> bool {
        self.remaining >= 0
    }
}
