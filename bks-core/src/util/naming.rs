use std::collections::HashMap;

use crate::error::{BksError, Result};

const NAME_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const NAME_LEN: usize = 16;

// Largest byte value that maps onto the alphabet without modulo bias.
const MAX_BYTE: u8 = (256 - 256 % NAME_CHARS.len()) as u8;

/// Generate a hide name absent from `taken` (hide name -> real name).
pub fn unique_hide_name(taken: &HashMap<String, String>) -> Result<String> {
    loop {
        let name = random_name()?;
        if !taken.contains_key(&name) {
            return Ok(name);
        }
    }
}

fn random_name() -> Result<String> {
    let mut name = String::with_capacity(NAME_LEN);
    for _ in 0..NAME_LEN {
        name.push(random_char()?);
    }
    Ok(name)
}

fn random_char() -> Result<char> {
    loop {
        let mut byte = [0u8; 1];
        getrandom::getrandom(&mut byte).map_err(|e| BksError::CryptoBackend(e.to_string()))?;
        if byte[0] < MAX_BYTE {
            return Ok(NAME_CHARS[byte[0] as usize % NAME_CHARS.len()] as char);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_have_the_expected_shape() {
        let taken = HashMap::new();
        for _ in 0..64 {
            let name = unique_hide_name(&taken).unwrap();
            assert_eq!(name.len(), NAME_LEN);
            assert!(
                name.bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            );
        }
    }

    #[test]
    fn taken_names_are_avoided() {
        let mut taken = HashMap::new();
        for _ in 0..256 {
            let name = unique_hide_name(&taken).unwrap();
            assert!(!taken.contains_key(&name));
            taken.insert(name, String::new());
        }
        assert_eq!(taken.len(), 256);
    }
}
