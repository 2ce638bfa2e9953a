//! Binary frame layout.
//!
//! Structured: `i64 access time | binding | primary record | managed-context
//! blob | i32 interceptor count (-1 = absent) | interceptor records`.
//! Legacy: `i64 access time | binding | native bytes of the primary object`.
//!
//! Integers are big-endian. Every variable-length part is a segment: a `u32`
//! length followed by that many bytes. Bindings and records are MessagePack.

use super::frame::{FrameGeneration, PassivationFrame};
use crate::capture::CapturedObject;
use crate::core::{BeanMetaData, PassivationError, PersistenceContextBinding, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{self, Read, Write};

const MAX_SEGMENT_LEN: usize = 256 * 1024 * 1024;
const ABSENT_INTERCEPTORS: i32 = -1;

/// Placeholder type name for legacy primaries read without bean metadata.
pub const UNKNOWN_LEGACY_TYPE: &str = "<legacy>";

pub fn encode_frame<W: Write>(
    frame: &PassivationFrame,
    generation: FrameGeneration,
    out: &mut W,
) -> Result<()> {
    write_i64(out, frame.last_access_time)?;
    write_msgpack(out, &frame.persistence_context, "persistence context binding")?;

    match generation {
        FrameGeneration::Legacy => {
            let CapturedObject::Native { bytes, .. } = &frame.primary else {
                return Err(PassivationError::Capture {
                    type_name: frame.primary.type_name().to_string(),
                    field: "<native>".to_string(),
                    reason: "legacy frames require a natively serializable bean".to_string(),
                });
            };
            write_segment(out, bytes)?;
        }
        FrameGeneration::Structured => {
            write_msgpack(out, &frame.primary, "primary object")?;
            write_segment(out, &frame.managed_context)?;
            match &frame.interceptors {
                None => write_i32(out, ABSENT_INTERCEPTORS)?,
                Some(interceptors) => {
                    let count = i32::try_from(interceptors.len()).map_err(|_| {
                        PassivationError::Capture {
                            type_name: frame.primary.type_name().to_string(),
                            field: "<interceptors>".to_string(),
                            reason: format!("{} interceptors", interceptors.len()),
                        }
                    })?;
                    write_i32(out, count)?;
                    for interceptor in interceptors {
                        write_msgpack(out, interceptor, "interceptor")?;
                    }
                }
            }
        }
    }

    out.flush()
        .map_err(|e| PassivationError::store("flush frame", e))
}

pub fn encode_frame_to_vec(frame: &PassivationFrame, generation: FrameGeneration) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    encode_frame(frame, generation, &mut bytes)?;
    Ok(bytes)
}

/// Reads a frame without cross-checking it against bean metadata.
///
/// Legacy frames carry no type name for the primary object; it is taken from
/// `legacy_primary_type`.
pub fn read_frame<R: Read>(
    input: &mut R,
    generation: FrameGeneration,
    legacy_primary_type: &str,
) -> Result<PassivationFrame> {
    let last_access_time = read_i64(input)?;
    let persistence_context: Option<PersistenceContextBinding> =
        read_msgpack(input, "persistence context binding")?;

    match generation {
        FrameGeneration::Legacy => {
            let bytes = read_segment(input)?;
            Ok(PassivationFrame {
                last_access_time,
                persistence_context,
                primary: CapturedObject::Native {
                    type_name: legacy_primary_type.to_string(),
                    bytes,
                },
                managed_context: Vec::new(),
                interceptors: None,
            })
        }
        FrameGeneration::Structured => {
            let primary: CapturedObject = read_msgpack(input, "primary object")?;
            let managed_context = read_segment(input)?;
            let count = read_i32(input)?;
            let interceptors = match count {
                ABSENT_INTERCEPTORS => None,
                n if n < 0 => {
                    return Err(PassivationError::CorruptFrame(format!(
                        "negative interceptor count {}",
                        n
                    )));
                }
                n => {
                    let mut interceptors = Vec::with_capacity((n as usize).min(64));
                    for _ in 0..n {
                        interceptors.push(read_msgpack(input, "interceptor")?);
                    }
                    Some(interceptors)
                }
            };

            Ok(PassivationFrame {
                last_access_time,
                persistence_context,
                primary,
                managed_context,
                interceptors,
            })
        }
    }
}

/// Reads a frame and checks its interceptor count against `bean`.
pub fn decode_frame<R: Read>(
    input: &mut R,
    generation: FrameGeneration,
    bean: &BeanMetaData,
) -> Result<PassivationFrame> {
    let frame = read_frame(input, generation, &bean.type_name)?;

    if generation == FrameGeneration::Structured {
        let expected = bean.expected_interceptor_count();
        let found = frame.interceptor_count();
        if expected != found {
            return Err(PassivationError::InterceptorCountMismatch { expected, found });
        }
    }

    Ok(frame)
}

fn write_i64<W: Write>(out: &mut W, value: i64) -> Result<()> {
    out.write_all(&value.to_be_bytes())
        .map_err(|e| PassivationError::store("write frame", e))
}

fn write_i32<W: Write>(out: &mut W, value: i32) -> Result<()> {
    out.write_all(&value.to_be_bytes())
        .map_err(|e| PassivationError::store("write frame", e))
}

fn write_segment<W: Write>(out: &mut W, bytes: &[u8]) -> Result<()> {
    if bytes.len() > MAX_SEGMENT_LEN {
        return Err(PassivationError::StoreUnavailable(format!(
            "segment of {} bytes exceeds the {} byte limit",
            bytes.len(),
            MAX_SEGMENT_LEN
        )));
    }
    out.write_all(&(bytes.len() as u32).to_be_bytes())
        .and_then(|_| out.write_all(bytes))
        .map_err(|e| PassivationError::store("write frame", e))
}

fn write_msgpack<W: Write, T: Serialize>(out: &mut W, value: &T, what: &str) -> Result<()> {
    let bytes = rmp_serde::to_vec(value).map_err(|e| PassivationError::Capture {
        type_name: what.to_string(),
        field: "<encode>".to_string(),
        reason: e.to_string(),
    })?;
    write_segment(out, &bytes)
}

fn read_i64<R: Read>(input: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    read_exact(input, &mut buf)?;
    Ok(i64::from_be_bytes(buf))
}

fn read_i32<R: Read>(input: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    read_exact(input, &mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_segment<R: Read>(input: &mut R) -> Result<Vec<u8>> {
    let mut len = [0u8; 4];
    read_exact(input, &mut len)?;
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_SEGMENT_LEN {
        return Err(PassivationError::CorruptFrame(format!(
            "segment length {} exceeds the {} byte limit",
            len, MAX_SEGMENT_LEN
        )));
    }
    let mut bytes = vec![0u8; len];
    read_exact(input, &mut bytes)?;
    Ok(bytes)
}

fn read_msgpack<R: Read, T: DeserializeOwned>(input: &mut R, what: &str) -> Result<T> {
    let bytes = read_segment(input)?;
    rmp_serde::from_slice(&bytes).map_err(|e| PassivationError::corrupt(what, e))
}

fn read_exact<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            PassivationError::corrupt("truncated frame", e)
        }
        _ => PassivationError::store("read frame", e),
    })
}
