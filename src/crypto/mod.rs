// crypto/mod.rs - Cryptographic Primitives

//! Signing, hashing and canonical serialization primitives.
//!
//! Provides:
//! - RSA-PSS/SHA-256 signing and verification over PEM-encoded keys
//! - SHA-256 hashing with lowercase-hex output
//! - Key fingerprints (`did:agent:<hex>` identifiers derive from these)
//! - Canonical JSON serialization used for ledger hashing
//!
//! Public keys are accepted in SPKI PEM with a PKCS#1 fallback; private
//! keys in PKCS#8 PEM with a PKCS#1 fallback. Signatures travel as
//! lowercase hex.

mod canonical;

pub use canonical::{canonical_json, check_details_keys, CanonicalError, RESERVED_ENTRY_KEYS};

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::sha2::Sha256 as PssSha256;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key PEM: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key PEM: {0}")]
    InvalidPrivateKey(String),

    #[error("Malformed signature encoding: {0}")]
    MalformedSignature(String),

    #[error("Signature verification failed")]
    SignatureRejected,

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),
}

/// Default modulus size for generated keypairs
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Compute the SHA-256 digest of `data` as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fingerprint of a PEM-encoded public key: lowercase hex of SHA-256 over
/// the PEM bytes as supplied
pub fn key_fingerprint(public_key_pem: &str) -> String {
    sha256_hex(public_key_pem.as_bytes())
}

/// A generated RSA keypair, both halves PEM-encoded.
///
/// Keypair generation is the host crypto library's job; this wrapper exists
/// so tests and embedders have a one-call way to mint credentials.
#[derive(Clone)]
pub struct AgentKeypair {
    /// PKCS#8 PEM private key
    pub private_key_pem: String,

    /// SPKI PEM public key
    pub public_key_pem: String,
}

impl AgentKeypair {
    /// Generate a fresh RSA keypair with the default modulus size
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with_bits(DEFAULT_KEY_BITS)
    }

    /// Generate a fresh RSA keypair with an explicit modulus size
    pub fn generate_with_bits(bits: usize) -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_key_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?
            .to_string();
        let public_key_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

        Ok(Self {
            private_key_pem,
            public_key_pem,
        })
    }

    /// Fingerprint of the public half
    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.public_key_pem)
    }

    /// Sign a message with the private half
    pub fn sign(&self, message: &[u8]) -> Result<String, CryptoError> {
        sign_message(&self.private_key_pem, message)
    }
}

impl std::fmt::Debug for AgentKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentKeypair")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Parse a PEM public key: SPKI first, PKCS#1 as fallback
fn parse_public_key(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Parse a PEM private key: PKCS#8 first, PKCS#1 as fallback
fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
}

/// Sign `message` with RSA-PSS/SHA-256, returning the signature as
/// lowercase hex
pub fn sign_message(private_key_pem: &str, message: &[u8]) -> Result<String, CryptoError> {
    let private_key = parse_private_key(private_key_pem)?;
    let signing_key = BlindedSigningKey::<PssSha256>::new(private_key);
    let signature = signing_key.sign_with_rng(&mut rand::thread_rng(), message);
    Ok(hex::encode(signature.to_bytes()))
}

/// Verify a lowercase-hex RSA-PSS/SHA-256 signature over `message`
pub fn verify_message(
    public_key_pem: &str,
    message: &[u8],
    signature_hex: &str,
) -> Result<(), CryptoError> {
    let public_key = parse_public_key(public_key_pem)?;
    let verifying_key = VerifyingKey::<PssSha256>::new(public_key);

    let signature_bytes =
        hex::decode(signature_hex).map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;

    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::SignatureRejected)
}


#[cfg(test)]
mod tests {
    use super::test_support::test_keypair;
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_is_lowercase_hex() {
        let keypair = test_keypair(0);
        let fp = keypair.fingerprint();

        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = test_keypair(0);
        let message = b"proposal: reallocate budget";

        let signature = keypair.sign(message).unwrap();
        assert!(verify_message(&keypair.public_key_pem, message, &signature).is_ok());
        assert!(verify_message(&keypair.public_key_pem, b"tampered", &signature).is_err());
    }

    #[test]
    fn test_verify_rejects_flipped_signature_byte() {
        let keypair = test_keypair(0);
        let signature = keypair.sign(b"payload").unwrap();

        let mut bytes = hex::decode(&signature).unwrap();
        bytes[0] ^= 0xff;
        let corrupted = hex::encode(bytes);

        assert!(matches!(
            verify_message(&keypair.public_key_pem, b"payload", &corrupted),
            Err(CryptoError::SignatureRejected)
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let signer = test_keypair(0);
        let other = test_keypair(1);

        let signature = signer.sign(b"payload").unwrap();
        assert!(verify_message(&other.public_key_pem, b"payload", &signature).is_err());
    }

    #[test]
    fn test_invalid_pem_is_reported() {
        let result = verify_message("not a key", b"payload", "00");
        assert!(matches!(result, Err(CryptoError::InvalidPublicKey(_))));
    }
}
