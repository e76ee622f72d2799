//! Password encryption for the login call
//!
//! `InitialApp_v2.php` hands out a key (`baseprm`). The login password is sent
//! Blowfish-ECB encrypted with that key, PKCS#5 padded and base64 encoded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockEncrypt, KeyInit};
use blowfish::Blowfish;

use crate::error::{CarwingsError, Result};

const BLOCK_SIZE: usize = 8;

/// Encrypt `password` the way the login endpoint expects it
pub fn encrypt_password(key: &str, password: &str) -> Result<String> {
    let mut data = pkcs5_pad(password.as_bytes());
    ecb_encrypt(key.as_bytes(), &mut data)?;
    Ok(STANDARD.encode(data))
}

/// Pad to a whole number of blocks; a full block is added when already aligned
fn pkcs5_pad(data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + pad);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad, pad as u8);
    padded
}

fn ecb_encrypt(key: &[u8], data: &mut [u8]) -> Result<()> {
    // Blowfish accepts 4 to 56 key bytes
    let cipher: Blowfish = Blowfish::new_from_slice(key).map_err(|_| {
        CarwingsError::remote(None, format!("unusable password key ({} bytes)", key.len()))
    })?;
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blowfish::cipher::BlockDecrypt;

    #[test]
    fn test_block_known_answers() {
        // Eric Young's Blowfish ECB vectors
        let vectors: [([u8; 8], [u8; 8], [u8; 8]); 3] = [
            (
                [0x00; 8],
                [0x00; 8],
                [0x4E, 0xF9, 0x97, 0x45, 0x61, 0x98, 0xDD, 0x78],
            ),
            (
                [0xFF; 8],
                [0xFF; 8],
                [0x51, 0x86, 0x6F, 0xD5, 0xB8, 0x5E, 0xCB, 0x8A],
            ),
            (
                [0x11; 8],
                [0x11; 8],
                [0x24, 0x66, 0xDD, 0x87, 0x8B, 0x96, 0x3C, 0x9D],
            ),
        ];

        for (key, plain, expected) in vectors {
            let mut block = plain;
            ecb_encrypt(&key, &mut block).unwrap();
            assert_eq!(block, expected);
        }
    }

    #[test]
    fn test_pkcs5_padding() {
        assert_eq!(pkcs5_pad(b"hunter2"), b"hunter2\x01".to_vec());
        assert_eq!(pkcs5_pad(b""), vec![8u8; 8]);

        let padded = pkcs5_pad(b"12345678");
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded[8..], &[8u8; 8]);
    }

    #[test]
    fn test_encrypted_password_decrypts_back() {
        let key = "uyI5Dj9g8VCOFDnBRUbr3g";
        let encoded = encrypt_password(key, "correct horse").unwrap();
        assert_ne!(encoded, "correct horse");

        let mut data = STANDARD.decode(&encoded).unwrap();
        assert_eq!(data.len(), 16);

        let cipher: Blowfish = Blowfish::new_from_slice(key.as_bytes()).unwrap();
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }
        let pad = data[data.len() - 1] as usize;
        data.truncate(data.len() - pad);
        assert_eq!(data, b"correct horse");
    }

    #[test]
    fn test_encryption_is_deterministic_per_key() {
        let a = encrypt_password("key-one", "secret").unwrap();
        assert_eq!(a, encrypt_password("key-one", "secret").unwrap());
        assert_ne!(a, encrypt_password("key-two", "secret").unwrap());
    }

    #[test]
    fn test_short_key_is_rejected() {
        let err = encrypt_password("abc", "secret").unwrap_err();
        assert!(err.is_remote());
    }
}
