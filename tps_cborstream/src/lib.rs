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
 * tps_cborstream module definition
 *
 * A streaming serializer for CBOR (RFC8949). The writer consumes structural and scalar token
 * events and emits bytes on an `std::io::Write` sink.
 **************************************************************************************************/

#![warn(missing_docs)]

//! # TPS_CBORSTREAM
//!
//! The `tps_cborstream` crate provides a streaming CBOR writer for token pipelines: a producer
//! pushes structural and scalar events (start map, field name, integer, end map, ...) and the
//! writer emits the corresponding [RFC 8949](https://datatracker.ietf.org/doc/rfc8949/) bytes on
//! any [`std::io::Write`] sink.
//!
//! Unlike a buffer-building encoder, the writer never revisits emitted bytes: definite-length
//! containers declare their element counts up front and the writer enforces them, while
//! undeclared containers use the indefinite-length wire form. A pooled internal buffer holds
//! pending bytes between flushes, and no flush ever splits a multi-byte head, a UTF-8 sequence
//! or a surrogate pair.
//!
//! ## Features
//!
//! Wire-format options are selected at runtime through [`encoder::EncoderFeatures`]:
//!
//! - Preferred (shortest) serialization of integers, on by default; fixed-width serialization
//!   when disabled.
//! - Optional narrowing of `f64` values to the `f32` wire form when the round-trip is exact.
//! - The self-describe tag (55799) at stream start.
//! - The stringref extension (<http://cbor.schmorp.de/stringref>): repeated definite-length
//!   strings are replaced with `tag(25)` back-references, using the same qualification rule
//!   decoders apply.
//! - Strict or lenient handling of ill-formed surrogate sequences in UCS-2 text runs.
//!
//! ## Example
//!
//! The writer borrows or owns its sink; a `Vec<u8>` works for in-memory encoding.
//!
//! ```
//! use tps_cborstream::encoder::CBORWriter;
//! use tps_cborstream::error::CBORError;
//!
//! fn main() -> Result<(), CBORError> {
//!     let mut bytes = Vec::new();
//!     let mut writer = CBORWriter::new(&mut bytes);
//!     writer.write_start_map_sized(1)?;
//!     writer.write_field_name("a")?;
//!     writer.write_i32(1)?;
//!     writer.write_end_map()?;
//!     writer.close()?;
//!     drop(writer);
//!
//!     assert_eq!(bytes, [0xa1, 0x61, 0x61, 0x01]);
//!     Ok(())
//! }
//! ```

pub(crate) mod buffer;
pub(crate) mod context;
pub(crate) mod encode;
pub(crate) mod features;
pub(crate) mod strref;
pub(crate) mod utf8;

/// The `constants` module exposes the CBOR wire-level constants (major types, payload widths,
/// well-known tags) used by the writer.
pub mod constants;

/// The `error` module contains error definitions used throughout `tps_cborstream`.
pub mod error;

/// The `encoder` module exports the [`encoder::CBORWriter`] stream writer and its runtime
/// feature set.
pub mod encoder {
    pub use super::encode::{CBORWriter, DEFAULT_MAX_NESTING};
    pub use super::features::{feature, EncoderFeatures};
}
