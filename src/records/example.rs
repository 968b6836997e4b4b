//! Record framing for prepared image examples
//!
//! Each record is self-delimiting: a fixed header carrying the label id and
//! image byte length, followed by the raw encoded image. Shard files are
//! plain concatenations of these records.

use anyhow::{bail, Result};

const HEADER_LEN: usize = 8;

/// Encode one labeled image as a record: `label_id (u32 BE) | image_len
/// (u32 BE) | image bytes`.
pub fn encode_example(label_id: u32, image: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(HEADER_LEN + image.len());
    record.extend_from_slice(&label_id.to_be_bytes());
    record.extend_from_slice(&(image.len() as u32).to_be_bytes());
    record.extend_from_slice(image);
    record
}

/// Decode one record from the front of `buf`, returning the label id, the
/// image bytes, and the remainder of the buffer.
pub fn decode_example(buf: &[u8]) -> Result<(u32, &[u8], &[u8])> {
    if buf.len() < HEADER_LEN {
        bail!("truncated record header: {} bytes", buf.len());
    }
    let label_id = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let image_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    let rest = &buf[HEADER_LEN..];
    if rest.len() < image_len {
        bail!("truncated record body: expected {} bytes, have {}", image_len, rest.len());
    }
    Ok((label_id, &rest[..image_len], &rest[image_len..]))
}
