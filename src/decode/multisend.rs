//! Safe MultiSend packed-batch parsing
//!
//! The MultiSend contract takes one `bytes` blob holding concatenated
//! `(operation, to, value, dataLength, data)` entries with no count prefix;
//! the batch size is discovered by consuming entries until the cursor lands
//! exactly on the end of the input. This parser runs speculatively against
//! arbitrary calldata, so exact-consumption rejection is the primary
//! correctness gate, not an edge case.

use alloy_primitives::{Address, Bytes, U256};
use thiserror::Error;

use crate::domain::MultiSendEntry;

/// Fixed bytes per entry before the variable `data`: 1 (operation) +
/// 20 (to) + 32 (value) + 32 (dataLength).
const ENTRY_HEADER_LEN: usize = 85;

#[derive(Debug, Error)]
pub enum MultiSendError {
    #[error("empty payload")]
    Empty,
    #[error("truncated entry at offset {offset}: {field} needs {needed} bytes, {remaining} left")]
    Truncated {
        offset: usize,
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("entry data length {declared} at offset {offset} overruns payload ({remaining} bytes left)")]
    DataOverrun {
        offset: usize,
        declared: U256,
        remaining: usize,
    },
}

/// Parse a packed MultiSend blob. All-or-nothing: any entry that does not
/// fit rejects the whole blob, and the cursor must consume the input exactly.
pub fn parse_multi_send(data: &[u8]) -> Result<Vec<MultiSendEntry>, MultiSendError> {
    if data.is_empty() {
        // a zero-entry batch would make this speculative strategy succeed
        // vacuously on any empty input
        return Err(MultiSendError::Empty);
    }

    let mut entries = Vec::new();
    let mut cursor = 0usize;

    while cursor < data.len() {
        let header = take(data, &mut cursor, ENTRY_HEADER_LEN, "entry header")?;
        let operation = header[0];
        let to = Address::from_slice(&header[1..21]);
        let value = U256::from_be_slice(&header[21..53]);
        let data_length = U256::from_be_slice(&header[53..85]);

        let remaining = data.len() - cursor;
        if data_length > U256::from(remaining) {
            return Err(MultiSendError::DataOverrun {
                offset: cursor,
                declared: data_length,
                remaining,
            });
        }
        let len = data_length.to::<usize>();
        let entry_data = take(data, &mut cursor, len, "entry data")?;

        entries.push(MultiSendEntry {
            operation,
            to,
            value,
            data: Bytes::copy_from_slice(entry_data),
        });
    }

    // the bounds checks above make overshoot impossible, so the loop can
    // only exit with cursor == data.len()
    debug_assert_eq!(cursor, data.len());
    Ok(entries)
}

/// Re-encode entries into the packed wire form. Inverse of
/// [`parse_multi_send`] for well-formed batches.
pub fn encode_multi_send(entries: &[MultiSendEntry]) -> Vec<u8> {
    let total: usize = entries
        .iter()
        .map(|entry| ENTRY_HEADER_LEN + entry.data.len())
        .sum();
    let mut out = Vec::with_capacity(total);

    for entry in entries {
        out.push(entry.operation);
        out.extend_from_slice(entry.to.as_slice());
        out.extend_from_slice(&entry.value.to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(entry.data.len()).to_be_bytes::<32>());
        out.extend_from_slice(&entry.data);
    }

    out
}

fn take<'a>(
    data: &'a [u8],
    cursor: &mut usize,
    len: usize,
    field: &'static str,
) -> Result<&'a [u8], MultiSendError> {
    let remaining = data.len() - *cursor;
    if len > remaining {
        return Err(MultiSendError::Truncated {
            offset: *cursor,
            field,
            needed: len,
            remaining,
        });
    }
    let slice = &data[*cursor..*cursor + len];
    *cursor += len;
    Ok(slice)
}
