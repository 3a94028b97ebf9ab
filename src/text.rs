//! Decoder for the packed 5-bit string format used by the game databases.
//!
//! Each string section is a chain of variable-length records: a header byte
//! whose low 7 bits give the hop to the next record, followed by 5-byte
//! blocks. A block is a 40-bit group holding eight 5-bit indices into a
//! 32-character alphabet, most significant bits first.

use bitreader::BitReader;
use log::trace;

use crate::loader::LoadError;

/// The 32-character alphabet shared by every known dump. Index 28 (`\x01`)
/// is the shift code, index 31 (`\x00`) the terminator.
pub const ALPHABET: &[u8; 32] = b" abcdefghijklmnopqrstuvwxyz'\x01,.\x00";

/// Hard cap on a single decoded string.
const MAX_DECODED: usize = 255;

/// Bytes per packed block (eight 5-bit characters).
const BLOCK_SIZE: usize = 5;

/// Decode string `index` from the section starting at `base`.
///
/// Pure over the image slice; any read past the end of the image or a
/// string exceeding [`MAX_DECODED`] bytes is a decode failure.
pub fn decode(image: &[u8], base: usize, index: usize) -> Result<String, LoadError> {
    // Walk the hop chain to the record for string `index`.
    let mut pos = base;
    for _ in 0..index {
        let hop = header_byte(image, pos)? & 0x7f;
        pos += hop as usize;
    }

    // Bit 6 of the header byte clear means the first letter is uppercased.
    let mut shift = header_byte(image, pos)? & 0x40 == 0;
    pos += 1;

    let mut out = String::new();
    loop {
        let block = image
            .get(pos..pos + BLOCK_SIZE)
            .ok_or_else(|| LoadError::new("packed string runs off the end of the image"))?;
        pos += BLOCK_SIZE;

        let mut reader = BitReader::new(block);
        for _ in 0..8 {
            let code = reader
                .read_u8(5)
                .map_err(|e| LoadError::new(format!("bit group read failed: {e}")))?;
            let mut c = ALPHABET[code as usize];

            if c == 0x01 {
                // Shift code: emit a space, uppercase the next letter.
                shift = true;
                c = b' ';
            }
            if c == 0x00 {
                trace!("decoded string {index} at base {base:#x}: {out:?}");
                return Ok(out);
            }
            if shift && c.is_ascii_lowercase() {
                c = c.to_ascii_uppercase();
                shift = false;
            }

            out.push(c as char);
            if c == b'.' || c == b',' {
                if c == b'.' {
                    shift = true;
                }
                out.push(' ');
            }
            if out.len() > MAX_DECODED {
                return Err(LoadError::new(format!(
                    "string {index} at base {base:#x} exceeds {MAX_DECODED} bytes"
                )));
            }
        }
    }
}

fn header_byte(image: &[u8], pos: usize) -> Result<u8, LoadError> {
    image
        .get(pos)
        .copied()
        .ok_or_else(|| LoadError::new("string directory runs off the end of the image"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pack 5-bit indices into 5-byte blocks, MSB first, terminator added.
    fn pack(indices: &[u8]) -> Vec<u8> {
        let mut bits: Vec<bool> = Vec::new();
        for &i in indices.iter().chain(std::iter::once(&31u8)) {
            for b in (0..5).rev() {
                bits.push(i & (1 << b) != 0);
            }
        }
        while bits.len() % 40 != 0 {
            bits.push(false);
        }
        bits.chunks(8)
            .map(|c| c.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
            .collect()
    }

    fn index_of(c: u8) -> u8 {
        ALPHABET.iter().position(|&a| a == c).unwrap() as u8
    }

    fn encode(s: &str) -> Vec<u8> {
        let indices: Vec<u8> = s.bytes().map(index_of).collect();
        pack(&indices)
    }

    #[test]
    fn decodes_with_initial_uppercase() {
        // Header bit 6 clear: first letter is uppercased.
        let mut image = vec![0x06];
        image.extend(encode("hello"));
        assert_eq!(decode(&image, 0, 0).unwrap(), "Hello");
    }

    #[test]
    fn decodes_without_initial_uppercase() {
        let mut image = vec![0x46];
        image.extend(encode("hello"));
        assert_eq!(decode(&image, 0, 0).unwrap(), "hello");
    }

    #[test]
    fn period_appends_space_and_uppercases() {
        let mut image = vec![0x46];
        image.extend(encode("go west.then east"));
        assert_eq!(decode(&image, 0, 0).unwrap(), "go west. Then east");
    }

    #[test]
    fn comma_appends_space_without_shift() {
        let mut image = vec![0x46];
        image.extend(encode("one,two"));
        assert_eq!(decode(&image, 0, 0).unwrap(), "one, two");
    }

    #[test]
    fn shift_code_emits_space_and_uppercases() {
        let mut image = vec![0x46];
        image.extend(pack(&[index_of(b'a'), 28, index_of(b'b')]));
        assert_eq!(decode(&image, 0, 0).unwrap(), "a B");
    }

    #[test]
    fn follows_hop_chain_to_later_strings() {
        let first = encode("hi");
        let second = encode("bye");
        let mut image = Vec::new();
        image.push(1 + first.len() as u8); // hop to the next record, bit 6 clear
        image.extend(&first);
        image.push(0x46);
        image.extend(&second);
        assert_eq!(decode(&image, 0, 0).unwrap(), "Hi");
        assert_eq!(decode(&image, 0, 1).unwrap(), "bye");
    }

    #[test]
    fn refuses_overlong_strings() {
        // 64 blocks of 'a' repeated: 512 characters, no terminator in sight.
        let mut image = vec![0x46];
        for _ in 0..64 {
            image.extend(pack(&[1; 8])[..5].to_vec());
        }
        assert!(decode(&image, 0, 0).is_err());
    }

    #[test]
    fn truncated_image_is_an_error() {
        let image = vec![0x46, 0x00, 0x00];
        assert!(decode(&image, 0, 0).is_err());
    }
}
