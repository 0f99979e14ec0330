//! Account provisioning: fresh ed25519 keypairs and their derived addresses.

use crate::types::Address;
use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use std::fmt;

/// An ed25519 keypair. Immutable after creation and owned exclusively by
/// the context that generated it; nothing is persisted.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing.verifying_key().to_bytes()
    }

    /// The address is derived deterministically from the public key.
    pub fn address(&self) -> Address {
        derive_address(&self.public_key_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    // never print key material
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

pub fn derive_address(public_key: &[u8; 32]) -> Address {
    Address::new(*blake3::hash(public_key).as_bytes())
}

/// Produces a fresh, unlinkable keypair and its derived address.
pub fn generate_account() -> (Keypair, Address) {
    let keypair = Keypair::generate();
    let address = keypair.address();
    (keypair, address)
}

/// Produces `n` independent addresses; empty for `n = 0`.
pub fn generate_addresses(n: usize) -> Vec<Address> {
    (0..n).map(|_| Keypair::generate().address()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_account_address_matches_keypair() {
        let (keypair, address) = generate_account();
        assert_eq!(keypair.address(), address);
        assert_eq!(derive_address(&keypair.public_key_bytes()), address);
    }

    #[test]
    fn generate_addresses_are_pairwise_distinct() {
        for n in [0usize, 1, 32] {
            let addrs = generate_addresses(n);
            assert_eq!(addrs.len(), n);
            let unique: HashSet<_> = addrs.iter().collect();
            assert_eq!(unique.len(), n);
        }
    }

    #[test]
    fn signature_verifies_under_public_key() {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let keypair = Keypair::generate();
        let msg = b"harness signing check";
        let sig = keypair.sign(msg);
        let vk = VerifyingKey::from_bytes(&keypair.public_key_bytes()).unwrap();
        assert!(vk.verify(msg, &Signature::from_bytes(&sig)).is_ok());
    }
}
