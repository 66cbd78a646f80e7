//! Reversible token sealing.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const KEY_LEN: usize = 16;
const IV_LEN: usize = 16;

/// Possible errors from opening a sealed token blob.
#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    /// The blob is not valid base64.
    #[error("blob is not valid base64")]
    Encoding(#[from] base64::DecodeError),

    /// The blob is too short to carry an iv.
    #[error("blob is too short to carry an iv")]
    Truncated,

    /// The ciphertext failed to decrypt with this key.
    #[error("blob failed to decrypt")]
    Decrypt,

    /// The decrypted bytes are not a utf-8 token.
    #[error("decrypted token is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Reversible token cipher: AES-128-CBC with a fresh random iv per seal,
/// the iv prepended to the ciphertext and the whole blob base64-encoded.
///
/// The key is the passphrase truncated or space-padded to 16 bytes. This is
/// reversible at-rest storage, not a security boundary; the passphrase comes
/// from configuration so deployments can at least rotate it.
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; KEY_LEN],
}

impl TokenCipher {
    /// Derives the cipher key from a passphrase.
    pub fn new(passphrase: &str) -> Self {
        let mut key = [b' '; KEY_LEN];
        let bytes = passphrase.as_bytes();
        let len = bytes.len().min(KEY_LEN);
        key[..len].copy_from_slice(&bytes[..len]);

        Self { key }
    }

    /// Encrypts a token; every call draws a fresh iv, so two seals of the
    /// same token differ.
    pub fn seal(&self, token: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(token.as_bytes());

        let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);

        STANDARD.encode(blob)
    }

    /// Decrypts a blob produced by [`TokenCipher::seal`], reading the
    /// leading iv first.
    pub fn open(&self, blob: &str) -> Result<String, CryptoError> {
        let bytes = STANDARD.decode(blob)?;
        if bytes.len() < IV_LEN {
            return Err(CryptoError::Truncated);
        }

        let (iv, ciphertext) = bytes.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| CryptoError::Truncated)?;

        let plaintext = Aes128CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;

        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cipher = TokenCipher::new("a passphrase");
        for token in ["t", "a-longer-bearer-token", "exactly-16-bytes"] {
            let blob = cipher.seal(token);
            assert_eq!(cipher.open(&blob).unwrap(), token);
        }
    }

    #[test]
    fn test_fresh_iv_per_seal() {
        let cipher = TokenCipher::new("a passphrase");
        let first = cipher.seal("token");
        let second = cipher.seal("token");

        assert_ne!(first, second);
        assert_eq!(cipher.open(&first).unwrap(), "token");
        assert_eq!(cipher.open(&second).unwrap(), "token");
    }

    #[test]
    fn test_key_padding_and_truncation() {
        let short = TokenCipher::new("abc");
        let blob = short.seal("token");
        assert_eq!(short.open(&blob).unwrap(), "token");

        // Keys agree on the first 16 bytes, so the blobs interchange.
        let long = TokenCipher::new("0123456789abcdefEXTRA");
        let truncated = TokenCipher::new("0123456789abcdef");
        let blob = long.seal("token");
        assert_eq!(truncated.open(&blob).unwrap(), "token");
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let cipher = TokenCipher::new("a passphrase");
        assert!(matches!(
            cipher.open("not base64!!!"),
            Err(CryptoError::Encoding(_))
        ));
        assert!(matches!(cipher.open("AAAA"), Err(CryptoError::Truncated)));

        let blob = cipher.seal("token");
        let other = TokenCipher::new("different passphrase");
        assert_ne!(other.open(&blob).ok().as_deref(), Some("token"));
    }
}
