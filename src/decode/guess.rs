//! Heuristic calldata layout inference
//!
//! When no signature is known, a plausible parameter layout can often be
//! recovered from the byte structure alone: dynamic parameters leave
//! word-aligned offset pointers in the head section, and padding direction
//! separates numeric words (left-padded) from bytes-like words
//! (right-padded). The result is a guess; the caller is expected to validate
//! it by actually decoding with it.

use std::collections::HashSet;

use alloy_dyn_abi::DynSolType;
use alloy_primitives::U256;

/// Infer a parameter-type layout for an ABI-encoded blob.
///
/// `data` is the encoded parameter area: calldata with the selector already
/// stripped, or a whole selectorless payload. Returns `None` when the bytes
/// cannot be a standard encoding or no layout accounts for every word.
pub fn guess_parameter_types(data: &[u8]) -> Option<Vec<DynSolType>> {
    let words = chunk_words(data)?;
    let mut covered: HashSet<usize> = HashSet::new();
    let mut types = Vec::new();

    let mut index = 0;
    while index < words.len() {
        if covered.contains(&index) {
            // reached the data region; the parameter head section is over
            break;
        }
        match dynamic_parameter_at(index, &words) {
            Some(guess) => {
                covered.extend(guess.coverage);
                types.push(guess.ty);
            }
            None => {
                covered.insert(index);
                types.push(static_word_type(&words[index]));
            }
        }
        index += 1;
    }

    // a layout that leaves words unaccounted for is not a consistent guess
    if types.is_empty() || covered.len() != words.len() {
        return None;
    }
    Some(types)
}

struct DynamicGuess {
    ty: DynSolType,
    coverage: Vec<usize>,
}

/// Try to read the word at `index` as the offset pointer of a dynamic
/// parameter (bytes, string, or a single-word-element array).
fn dynamic_parameter_at(index: usize, words: &[[u8; 32]]) -> Option<DynamicGuess> {
    let word = U256::from_be_bytes(words[index]);
    // a dynamic head slot holds a byte offset: nonzero, word-aligned, in bounds
    if word.is_zero() || word % U256::from(32) != U256::ZERO {
        return None;
    }
    let offset_words = usize::try_from(word / U256::from(32)).ok()?;
    if offset_words >= words.len() {
        return None;
    }
    let length = usize::try_from(U256::from_be_bytes(words[offset_words])).ok()?;
    let data_start = offset_words + 1;

    // array interpretation first: `length` elements of one word each
    if length > 0 {
        if let Some(end) = data_start.checked_add(length) {
            if end <= words.len() {
                if let Some(element) = uniform_element_type(&words[data_start..end]) {
                    let mut coverage = vec![index, offset_words];
                    coverage.extend(data_start..end);
                    return Some(DynamicGuess {
                        ty: DynSolType::Array(Box::new(element)),
                        coverage,
                    });
                }
            }
        }
    }

    // bytes / string interpretation: `length` is in bytes
    let byte_words = length.div_ceil(32);
    let end = data_start.checked_add(byte_words)?;
    if end > words.len() {
        return None;
    }
    if length == 0 {
        return Some(DynamicGuess {
            ty: DynSolType::Bytes,
            coverage: vec![index, offset_words],
        });
    }

    let tail = (32 - length % 32) % 32;
    if trailing_zero_bytes(&words[end - 1]) < tail {
        // the declared length leaves nonzero garbage in the final word
        return None;
    }

    let mut bytes_data = Vec::with_capacity(byte_words * 32);
    for w in &words[data_start..end] {
        bytes_data.extend_from_slice(w);
    }
    bytes_data.truncate(length);

    let ty = if is_printable(&bytes_data) {
        DynSolType::String
    } else {
        DynSolType::Bytes
    };
    let mut coverage = vec![index, offset_words];
    coverage.extend(data_start..end);
    Some(DynamicGuess { ty, coverage })
}

/// Pick an element type when every word in the slice shares a padding class;
/// mixed padding looks like string/bytes data rather than an element list.
fn uniform_element_type(elements: &[[u8; 32]]) -> Option<DynSolType> {
    if elements.iter().all(|w| leading_zero_bytes(w) == 12) {
        return Some(DynSolType::Address);
    }
    if elements.iter().all(|w| leading_zero_bytes(w) > 0) {
        return Some(DynSolType::Uint(256));
    }
    if elements.iter().all(|w| leading_zero_bytes(w) == 0) {
        return Some(DynSolType::FixedBytes(32));
    }
    None
}

/// Classify a single static word by its padding direction:
/// left-padded with a 20-byte body reads as an address, other left-padded
/// words as uint256, right-padded words as sized bytes.
fn static_word_type(word: &[u8; 32]) -> DynSolType {
    let leading = leading_zero_bytes(word);
    let trailing = trailing_zero_bytes(word);
    if leading == 12 {
        DynSolType::Address
    } else if leading > 0 {
        DynSolType::Uint(256)
    } else if trailing > 0 {
        DynSolType::FixedBytes(32 - trailing)
    } else {
        DynSolType::FixedBytes(32)
    }
}

fn chunk_words(data: &[u8]) -> Option<Vec<[u8; 32]>> {
    if data.is_empty() || data.len() % 32 != 0 {
        return None;
    }
    Some(
        data.chunks_exact(32)
            .map(|chunk| {
                let mut word = [0u8; 32];
                word.copy_from_slice(chunk);
                word
            })
            .collect(),
    )
}

fn leading_zero_bytes(word: &[u8; 32]) -> usize {
    word.iter().take_while(|b| **b == 0).count()
}

fn trailing_zero_bytes(word: &[u8; 32]) -> usize {
    word.iter().rev().take_while(|b| **b == 0).count()
}

fn is_printable(data: &[u8]) -> bool {
    !data.is_empty()
        && data
            .iter()
            .all(|b| (0x20..=0x7e).contains(b) || matches!(b, b'\n' | b'\r' | b'\t'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words_of(hex_data: &str) -> Vec<u8> {
        hex::decode(hex_data).unwrap()
    }

    #[test]
    fn test_guess_static_and_dynamic_mix() {
        // Signature: `f(uint256,uint32[],bytes10,bytes)`
        // Values: `(0x123, [0x456, 0x789], "1234567890", "Hello, world!")`
        // (example encoding from the Solidity ABI specification)
        let data = words_of(concat!(
            "0000000000000000000000000000000000000000000000000000000000000123",
            "0000000000000000000000000000000000000000000000000000000000000080",
            "3132333435363738393000000000000000000000000000000000000000000000",
            "00000000000000000000000000000000000000000000000000000000000000e0",
            "0000000000000000000000000000000000000000000000000000000000000002",
            "0000000000000000000000000000000000000000000000000000000000000456",
            "0000000000000000000000000000000000000000000000000000000000000789",
            "000000000000000000000000000000000000000000000000000000000000000d",
            "48656c6c6f2c20776f726c642100000000000000000000000000000000000000",
        ));

        let types = guess_parameter_types(&data).unwrap();
        assert_eq!(types.len(), 4);
        assert_eq!(types[0], DynSolType::Uint(256));
        assert_eq!(types[1], DynSolType::Array(Box::new(DynSolType::Uint(256))));
        assert_eq!(types[2], DynSolType::FixedBytes(10));
        // "Hello, world!" is printable, so the guesser prefers string
        assert_eq!(types[3], DynSolType::String);

        // the guess must actually decode
        assert!(DynSolType::Tuple(types).abi_decode(&data).is_ok());
    }

    #[test]
    fn test_guess_leading_dynamic_params() {
        // Signature: `sam(bytes,bool,uint256[])`
        // Values: `("dave", true, [1, 2, 3])`
        let data = words_of(concat!(
            "0000000000000000000000000000000000000000000000000000000000000060",
            "0000000000000000000000000000000000000000000000000000000000000001",
            "00000000000000000000000000000000000000000000000000000000000000a0",
            "0000000000000000000000000000000000000000000000000000000000000004",
            "6461766500000000000000000000000000000000000000000000000000000000",
            "0000000000000000000000000000000000000000000000000000000000000003",
            "0000000000000000000000000000000000000000000000000000000000000001",
            "0000000000000000000000000000000000000000000000000000000000000002",
            "0000000000000000000000000000000000000000000000000000000000000003",
        ));

        let types = guess_parameter_types(&data).unwrap();
        assert_eq!(types.len(), 3);
        assert_eq!(types[0], DynSolType::String);
        assert_eq!(types[1], DynSolType::Uint(256));
        assert_eq!(types[2], DynSolType::Array(Box::new(DynSolType::Uint(256))));
    }

    #[test]
    fn test_guess_address_word() {
        let data = words_of(concat!(
            "000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045",
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000",
        ));
        let types = guess_parameter_types(&data).unwrap();
        assert_eq!(types, vec![DynSolType::Address, DynSolType::Uint(256)]);
    }

    #[test]
    fn test_guess_rejects_unaligned_input() {
        assert!(guess_parameter_types(&[]).is_none());
        assert!(guess_parameter_types(&[0u8; 31]).is_none());
        assert!(guess_parameter_types(&[0u8; 33]).is_none());
    }

    #[test]
    fn test_guess_rejects_inconsistent_layout() {
        // word 0 points at a 32-byte blob occupying words 1-2, which ends the
        // head section; words 3-4 are left unaccounted for
        let data = words_of(concat!(
            "0000000000000000000000000000000000000000000000000000000000000020",
            "0000000000000000000000000000000000000000000000000000000000000020",
            "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
            "0000000000000000000000000000000000000000000000000000000000000001",
            "0000000000000000000000000000000000000000000000000000000000000002",
        ));
        assert!(guess_parameter_types(&data).is_none());
    }
}
