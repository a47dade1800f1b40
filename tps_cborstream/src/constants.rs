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
 * tps_cborstream CBOR constants
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 **************************************************************************************************/

/// Major Type 0 (Positive integers)
pub const MT_UINT: u8 = 0b000_00000;
/// Major Type 1 (Negative integers)
pub const MT_NINT: u8 = 0b001_00000;
/// Major Type 2 (Byte Strings)
pub const MT_BSTR: u8 = 0b010_00000;
/// Major Type 3 (Text Strings)
pub const MT_TSTR: u8 = 0b011_00000;
/// Major Type 4 (Array)
pub const MT_ARRAY: u8 = 0b100_00000;
/// Major Type 5 (Map)
pub const MT_MAP: u8 = 0b101_00000;
/// Major Type 6 (Tag)
pub const MT_TAG: u8 = 0b110_00000;
/// Major Type 7 (Floats, simple types etc.)
pub const MT_SIMPLE: u8 = 0b111_00000;
/// Major Type 7 alias used on the float encoding paths
pub const MT_FLOAT: u8 = 0b111_00000;

/// Maximum value of a "simple" payload mapped on AI bits
pub const PAYLOAD_AI_BITS: u8 = 23;
/// Indicates one byte of length of value information follows MT/AI byte
pub const PAYLOAD_ONE_BYTE: u8 = 24;
/// Indicates two bytes of length of value information follows MT/AI byte
pub const PAYLOAD_TWO_BYTES: u8 = 25;
/// Indicates four bytes of length of value information follows MT/AI byte
pub const PAYLOAD_FOUR_BYTES: u8 = 26;
/// Indicates eight bytes of length of value information follows MT/AI byte
pub const PAYLOAD_EIGHT_BYTES: u8 = 27;
/// Indicates an indefinite-length item terminated by a `break`
pub const PAYLOAD_INDEFINITE: u8 = 31;

/// `break` terminator for indefinite-length items
pub const BREAK: u8 = 0xff;
/// Start of an indefinite-length array
pub const START_INDEFINITE_ARRAY: u8 = MT_ARRAY | PAYLOAD_INDEFINITE;
/// Start of an indefinite-length map
pub const START_INDEFINITE_MAP: u8 = MT_MAP | PAYLOAD_INDEFINITE;
/// Start of an indefinite-length (chunked) text string
pub const START_INDEFINITE_TSTR: u8 = MT_TSTR | PAYLOAD_INDEFINITE;

/// Simple value `false`, mapped on the AI bits of Major Type 7
pub const SIMPLE_FALSE: u8 = 20;
/// Simple value `true`
pub const SIMPLE_TRUE: u8 = 21;
/// Simple value `null`
pub const SIMPLE_NULL: u8 = 22;
/// Simple value `undefined`
pub const SIMPLE_UNDEFINED: u8 = 23;

/// Tag 0: date/time as an RFC3339 text string
pub const TAG_DATE_TIME: u64 = 0;
/// Tag 1: date/time as seconds since the POSIX epoch
pub const TAG_EPOCH: u64 = 1;
/// Tag 2: positive bignum, encoded as a byte string magnitude
pub const TAG_POS_BIGNUM: u64 = 2;
/// Tag 3: negative bignum, encoded as the byte string magnitude of -1 - n
pub const TAG_NEG_BIGNUM: u64 = 3;
/// Tag 4: decimal fraction, encoded as [exponent, mantissa]
pub const TAG_DECIMAL_FRACTION: u64 = 4;
/// Tag 25: reference to a previously seen string (stringref extension)
pub const TAG_STRINGREF: u64 = 25;
/// Tag 55799: self-described CBOR. Encodes as `d9 d9 f7`
pub const TAG_SELF_DESCRIBE: u64 = 55799;

/// Size of the pooled output buffer. Every write path reserves its worst case before writing so
/// no multi-byte encoding is ever split by a flush.
pub const OUTPUT_BUFFER_LEN: usize = 8000;
/// Worst-case length of an item head (initial byte + 8 argument bytes)
pub const MAX_HEAD_LEN: usize = 9;
/// Longest text run (in UTF-16 code units) encoded as a single definite-length item by the
/// code-unit string writer. One chunk of this size plus its head and a `break` always fit the
/// output buffer, even if every unit encodes on three bytes.
pub const MAX_LONG_TEXT_CHARS: usize = OUTPUT_BUFFER_LEN / 4 - 4;
/// Byte budget of one chunk produced when a code-unit text run is split
pub const MAX_CHUNK_TEXT_BYTES: usize = MAX_LONG_TEXT_CHARS * 3;
/// Longest UTF-8 text (in bytes) encoded as a single definite-length item
pub const MAX_DEFINITE_TEXT_BYTES: usize = OUTPUT_BUFFER_LEN - 5;
