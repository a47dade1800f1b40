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
 * tps_cborstream CBOR Error API
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 **************************************************************************************************/
use std::result;

use thiserror::Error;

/// An alias for Result<T, CBORError> used throughout this crate.
pub type Result<T> = result::Result<T, CBORError>;

/// `CBORError` provides information about errors detected while serializing token events.
///
/// Any error leaves the writer in a failed state where only [`crate::encoder::CBORWriter::close`]
/// remains valid.
#[derive(Error, Debug)]
pub enum CBORError {
    /// A value was written into a map which is waiting for a field name.
    #[error("Expected a field name before the next value")]
    ExpectedFieldName,
    /// A field name was written outside of a map, or where a value was expected.
    #[error("Field name not allowed in this context")]
    FieldNameNotAllowed,
    /// A map was closed between a key and its value.
    #[error("Map entry is missing its value")]
    MissingValue,
    /// An end-of-container call did not match the open container. The `str` names the kind
    /// that would have been legal to close here.
    #[error("Mismatched close: no open {0} to end here")]
    ExpectedContext(&'static str),
    /// A definite-length container was closed before all of its declared elements were written.
    #[error("Container closed with {0} declared items still unwritten")]
    TooFewItems(u64),
    /// More elements were written than a definite-length container declared.
    #[error("Attempt to write past the declared container size")]
    TooManyItems,
    /// A text run contained a surrogate code unit with no usable partner (strict mode only).
    #[error("Unpaired surrogate 0x{0:04x} in text input")]
    UnpairedSurrogate(u16),
    /// A high surrogate was followed by a unit outside of the low surrogate range
    /// (strict mode only).
    #[error("High surrogate 0x{0:04x} followed by invalid unit 0x{1:04x}")]
    BadSurrogatePair(u16, u16),
    /// A streamed binary source ended before delivering its declared length.
    #[error("Binary source ended {0} bytes short of the declared length")]
    ShortRead(usize),
    /// An argument is outside of the encodable range.
    #[error("Illegal argument: {0}")]
    BadArgument(&'static str),
    /// Nesting depth exceeded the configured maximum.
    #[error("Nesting depth exceeds the configured maximum of {0}")]
    NestingTooDeep(usize),
    /// The writer was closed, or poisoned by an earlier error.
    #[error("Write on a closed or failed writer")]
    WriterClosed,
    /// The sink reported an I/O failure. Surfaced verbatim.
    #[error("I/O error from the byte sink: {0}")]
    Io(#[from] std::io::Error),
}
