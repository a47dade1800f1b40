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
 * tps_cborstream writer feature set
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 **************************************************************************************************/

/// Module defining bitfield values for the runtime-selectable writer features. See
/// [`EncoderFeatures`].
pub mod feature {
    /// Prepend the self-describe tag (55799, `d9 d9 f7`) once at stream start. Off by default.
    pub const WRITE_TYPE_HEADER: u32 = 0x0001;
    /// Encode integer values on the smallest head that holds them. On by default.
    pub const WRITE_MINIMAL_INTS: u32 = 0x0002;
    /// Replace repeated definite-length strings with `tag(25)` back-references. Off by default.
    pub const STRINGREF: u32 = 0x0004;
    /// Shrink an `f64` to the `f32` wire form when the narrowing round-trip is exact.
    /// Off by default.
    pub const WRITE_MINIMAL_DOUBLES: u32 = 0x0008;
    /// Substitute U+FFFD for ill-formed surrogate sequences instead of failing. Off by default.
    pub const LENIENT_UTF_ENCODING: u32 = 0x0010;
    /// `close` terminates any still-open containers before flushing. On by default.
    pub const AUTO_CLOSE_CONTENT: u32 = 0x0020;
    /// `flush` and `close` propagate a `flush` to the underlying sink. On by default.
    pub const FLUSH_PASSED_TO_SINK: u32 = 0x0040;

    /// The feature set selected by [`super::EncoderFeatures::default`].
    pub const DEFAULTS: u32 = WRITE_MINIMAL_INTS | AUTO_CLOSE_CONTENT | FLUSH_PASSED_TO_SINK;
}

/// Runtime feature bit-set supplied when a writer is constructed and queryable for the lifetime
/// of the writer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncoderFeatures(u32);

impl EncoderFeatures {
    /// Construct a feature set from raw bits. Combine values from the [`feature`] module.
    pub fn new(bits: u32) -> Self {
        EncoderFeatures(bits)
    }

    /// The raw feature bits.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// A copy of this feature set with `flag` enabled.
    pub fn with(self, flag: u32) -> Self {
        EncoderFeatures(self.0 | flag)
    }

    /// A copy of this feature set with `flag` disabled.
    pub fn without(self, flag: u32) -> Self {
        EncoderFeatures(self.0 & !flag)
    }

    /// Return `true` if every bit of `flag` is enabled.
    pub fn is_enabled(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub(crate) fn type_header(&self) -> bool {
        self.is_enabled(feature::WRITE_TYPE_HEADER)
    }

    pub(crate) fn minimal_ints(&self) -> bool {
        self.is_enabled(feature::WRITE_MINIMAL_INTS)
    }

    pub(crate) fn stringref(&self) -> bool {
        self.is_enabled(feature::STRINGREF)
    }

    pub(crate) fn minimal_doubles(&self) -> bool {
        self.is_enabled(feature::WRITE_MINIMAL_DOUBLES)
    }

    pub(crate) fn lenient_utf(&self) -> bool {
        self.is_enabled(feature::LENIENT_UTF_ENCODING)
    }

    pub(crate) fn auto_close_content(&self) -> bool {
        self.is_enabled(feature::AUTO_CLOSE_CONTENT)
    }

    pub(crate) fn flush_passthrough(&self) -> bool {
        self.is_enabled(feature::FLUSH_PASSED_TO_SINK)
    }
}

impl Default for EncoderFeatures {
    fn default() -> Self {
        EncoderFeatures(feature::DEFAULTS)
    }
}
