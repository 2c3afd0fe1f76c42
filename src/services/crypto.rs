use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

// AES-256-GCM with a 16-byte nonce, matching the width of the stored `iv`
// attribute.
type PasswordGcm = AesGcm<Aes256, U16>;

const KDF_SALT: &[u8] = b"tradedesk_kdf_salt_v1";
const KDF_ITERATIONS: u32 = 100_000;
const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("invalid base64 input: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Tag verification failed: wrong key, or the stored values were altered.
    #[error("authentication failed")]
    Authentication,
}

/// Ciphertext, nonce and tag, each independently base64-encoded so they can
/// be stored as plain string attributes in the document store.
#[derive(Debug, Clone)]
pub struct EncryptedPassword {
    pub ciphertext: String,
    pub nonce: String,
    pub tag: String,
}

/// Encrypts and decrypts stored broker passwords with a key derived once
/// from the operator secret.
#[derive(Clone)]
pub struct PasswordCipher {
    key: [u8; 32],
}

/// Stretches the operator secret into a 32-byte key. The secret is padded
/// with '0' to at least 32 bytes and truncated to 32 before PBKDF2. The salt
/// is fixed: two deployments sharing a secret derive the same key, which is
/// what lets them read each other's stored credentials.
pub fn derive_key(secret: &str) -> [u8; 32] {
    let mut padded = secret.to_string();
    while padded.len() < 32 {
        padded.push('0');
    }
    padded.truncate(32);

    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(padded.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut key);
    key
}

impl PasswordCipher {
    pub fn new(secret: &str) -> Self {
        Self {
            key: derive_key(secret),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedPassword, CipherError> {
        let cipher = PasswordGcm::new(&self.key.into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::<U16>::from_slice(&nonce_bytes);

        // The aead API appends the tag to the ciphertext; split it off so the
        // two are stored as separate attributes.
        let mut sealed = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Authentication)?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(EncryptedPassword {
            ciphertext: B64.encode(&sealed),
            nonce: B64.encode(nonce_bytes),
            tag: B64.encode(&tag),
        })
    }

    pub fn decrypt(&self, ciphertext: &str, nonce: &str, tag: &str) -> Result<String, CipherError> {
        let mut sealed = B64.decode(ciphertext)?;
        let nonce_bytes = B64.decode(nonce)?;
        let tag_bytes = B64.decode(tag)?;
        sealed.extend_from_slice(&tag_bytes);

        if nonce_bytes.len() != NONCE_LEN {
            return Err(CipherError::Authentication);
        }

        let cipher = PasswordGcm::new(&self.key.into());
        let plaintext = cipher
            .decrypt(Nonce::<U16>::from_slice(&nonce_bytes), sealed.as_ref())
            .map_err(|_| CipherError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Authentication)
    }
}
