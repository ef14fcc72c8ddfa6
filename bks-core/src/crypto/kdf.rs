use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const ITERATIONS: u32 = 4096;

/// Derive an AES-256 key from `password` and a per-field salt.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let salt = [7u8; SALT_LEN];
        assert_eq!(derive_key("pw", &salt), derive_key("pw", &salt));
    }

    #[test]
    fn salt_and_password_both_matter() {
        let a = derive_key("pw", &[1u8; SALT_LEN]);
        let b = derive_key("pw", &[2u8; SALT_LEN]);
        let c = derive_key("other", &[1u8; SALT_LEN]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
