// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        private_key::{EcPrivateKey, Pkcs8PrivateKey},
        CrossSignError as Error, EcdsaCurve, KeyAlgorithm, SignatureAlgorithm,
    },
    bcder::{decode::Constructed, Mode},
    bytes::Bytes,
    ring::{
        rand::SystemRandom,
        signature::{self as ringsig, KeyPair},
    },
    signature::{Signature as SignatureTrait, Signer},
    std::convert::TryFrom,
};

/// Signifies that an entity is capable of producing cryptographic signatures.
pub trait Sign {
    /// Obtain the algorithm of the private key.
    ///
    /// If we can't coerce the key algorithm to [KeyAlgorithm], None is returned.
    fn key_algorithm(&self) -> Option<KeyAlgorithm>;

    /// Obtain the raw bytes constituting the public key of the signing certificate.
    ///
    /// This will be `.tbs_certificate.subject_public_key_info.subject_public_key` of a parsed
    /// X.509 public certificate.
    fn public_key_data(&self) -> Bytes;

    /// Obtain the [SignatureAlgorithm] that this signer will use.
    ///
    /// Instances can be coerced into the ASN.1 `AlgorithmIdentifier` via `.into()`
    /// for easy inclusion in ASN.1 structures.
    fn signature_algorithm(&self) -> Result<SignatureAlgorithm, Error>;

    /// Obtain the raw private key data.
    fn private_key_data(&self) -> Option<Vec<u8>>;
}

/// A superset of [Signer] and [Sign].
pub trait KeyInfoSigner: Signer<Signature> + Sign {}

#[derive(Clone, Debug)]
pub struct Signature(Vec<u8>);

impl From<Vec<u8>> for Signature {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<Signature> for Vec<u8> {
    fn from(v: Signature) -> Vec<u8> {
        v.0
    }
}

impl From<Signature> for Bytes {
    fn from(v: Signature) -> Self {
        Self::from(v.0)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl SignatureTrait for Signature {
    fn from_bytes(bytes: &[u8]) -> Result<Self, signature::Error> {
        Ok(Self(bytes.to_vec()))
    }
}

/// Represents a key pair that exists in memory and can be used to create cryptographic signatures.
///
/// This is a wrapper around ring's various key pair types. It provides
/// abstractions tailored for X.509 certificates.
#[derive(Debug)]
pub enum InMemorySigningKeyPair {
    /// ECDSA key pair.
    Ecdsa(ringsig::EcdsaKeyPair, EcdsaCurve, Vec<u8>),

    /// ED25519 key pair.
    Ed25519(ringsig::Ed25519KeyPair),

    /// RSA key pair.
    Rsa(ringsig::RsaKeyPair, Vec<u8>),
}

impl Signer<Signature> for InMemorySigningKeyPair {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        match self {
            Self::Rsa(key, _) => {
                let mut signature = vec![0; key.public_modulus_len()];

                key.sign(
                    &ringsig::RSA_PKCS1_SHA256,
                    &SystemRandom::new(),
                    msg,
                    &mut signature,
                )
                .map_err(|_| signature::Error::new())?;

                Ok(signature.into())
            }
            Self::Ecdsa(key, _, _) => {
                let signature = key
                    .sign(&SystemRandom::new(), msg)
                    .map_err(|_| signature::Error::new())?;

                Signature::from_bytes(signature.as_ref())
            }
            Self::Ed25519(key) => {
                let signature = key.sign(msg);

                Signature::from_bytes(signature.as_ref())
            }
        }
    }
}

impl Sign for InMemorySigningKeyPair {
    fn key_algorithm(&self) -> Option<KeyAlgorithm> {
        Some(KeyAlgorithm::from(self))
    }

    fn public_key_data(&self) -> Bytes {
        match self {
            Self::Rsa(key, _) => Bytes::copy_from_slice(key.public_key().as_ref()),
            Self::Ecdsa(key, _, _) => Bytes::copy_from_slice(key.public_key().as_ref()),
            Self::Ed25519(key) => Bytes::copy_from_slice(key.public_key().as_ref()),
        }
    }

    fn signature_algorithm(&self) -> Result<SignatureAlgorithm, Error> {
        Ok(match self {
            Self::Rsa(_, _) => SignatureAlgorithm::RsaSha256,
            Self::Ecdsa(_, curve, _) => {
                // ring refuses to mix and match the bitness of curves and signature
                // algorithms. e.g. it can't pair secp256r1 with SHA-384. It chooses
                // signatures on its own. We reimplement that logic here.
                match curve {
                    EcdsaCurve::Secp256r1 => SignatureAlgorithm::EcdsaSha256,
                    EcdsaCurve::Secp384r1 => SignatureAlgorithm::EcdsaSha384,
                }
            }
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
        })
    }

    fn private_key_data(&self) -> Option<Vec<u8>> {
        match self {
            Self::Rsa(_, data) => Some(data.clone()),
            Self::Ecdsa(_, _, data) => Some(data.clone()),
            Self::Ed25519(_) => None,
        }
    }
}

impl KeyInfoSigner for InMemorySigningKeyPair {}

fn key_rejected(e: ring::error::KeyRejected) -> Error {
    Error::UnsupportedKeyType(format!("key rejected: {}", e))
}

impl InMemorySigningKeyPair {
    /// Attempt to instantiate an instance from PKCS#8 DER data.
    ///
    /// The DER data should be a PKCS#8 `OneAsymmetricKey` structure.
    pub fn from_pkcs8_der(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        // We need to parse the PKCS#8 to know what kind of key we're dealing with.
        let key = Constructed::decode(data.as_ref(), Mode::Der, Pkcs8PrivateKey::take_from)
            .map_err(|e| Error::UnsupportedKeyType(format!("invalid PKCS#8 document: {}", e)))?;

        let algorithm = KeyAlgorithm::try_from(&key.algorithm)?;

        match algorithm {
            KeyAlgorithm::Rsa => {
                let pair = ringsig::RsaKeyPair::from_pkcs8(data.as_ref()).map_err(key_rejected)?;

                Ok(Self::Rsa(pair, key.private_key.into_bytes().to_vec()))
            }
            KeyAlgorithm::Ecdsa(curve) => {
                let pair = ringsig::EcdsaKeyPair::from_pkcs8(curve.into(), data.as_ref())
                    .map_err(key_rejected)?;

                Ok(Self::Ecdsa(pair, curve, data.as_ref().to_vec()))
            }
            KeyAlgorithm::Ed25519 => Ok(Self::Ed25519(
                ringsig::Ed25519KeyPair::from_pkcs8(data.as_ref()).map_err(key_rejected)?,
            )),
        }
    }

    /// Attempt to instantiate an instance from PEM encoded PKCS#8.
    ///
    /// This is just a wrapper for [Self::from_pkcs8_der] that does the PEM
    /// decoding for you.
    pub fn from_pkcs8_pem(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let der = pem::parse(data.as_ref()).map_err(Error::PemDecode)?;

        Self::from_pkcs8_der(&der.contents)
    }

    /// Construct an instance from an RFC 5915 `ECPrivateKey`.
    ///
    /// This is the format of `EC PRIVATE KEY` PEM documents. The structure
    /// must name its curve and carry its public key.
    pub fn from_sec1_ec_der(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let key = Constructed::decode(data.as_ref(), Mode::Der, EcPrivateKey::take_from)
            .map_err(|e| Error::UnsupportedKeyType(format!("invalid EC private key: {}", e)))?;

        let curve = key
            .named_curve
            .as_ref()
            .ok_or_else(|| Error::UnknownEllipticCurve("EC private key lacks a named curve".into()))?;
        let curve = EcdsaCurve::try_from(curve)?;

        let public_key = key.public_key.as_ref().ok_or_else(|| {
            Error::UnsupportedKeyType("EC private key lacks its public key".into())
        })?;

        let pair = ringsig::EcdsaKeyPair::from_private_key_and_public_key(
            curve.into(),
            key.private_key.to_bytes().as_ref(),
            public_key.octet_bytes().as_ref(),
        )
        .map_err(key_rejected)?;

        Ok(Self::Ecdsa(pair, curve, data.as_ref().to_vec()))
    }

    /// Construct an instance from a PKCS#1 `RSAPrivateKey`.
    pub fn from_rsa_der(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let pair = ringsig::RsaKeyPair::from_der(data.as_ref()).map_err(key_rejected)?;

        Ok(Self::Rsa(pair, data.as_ref().to_vec()))
    }

    /// Construct an instance from DER data of unknown format.
    ///
    /// PKCS#8, SEC1 `ECPrivateKey` and PKCS#1 `RSAPrivateKey` are recognized.
    pub fn from_der(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let data = data.as_ref();

        if Constructed::decode(data, Mode::Der, Pkcs8PrivateKey::take_from).is_ok() {
            Self::from_pkcs8_der(data)
        } else if Constructed::decode(data, Mode::Der, EcPrivateKey::take_from).is_ok() {
            Self::from_sec1_ec_der(data)
        } else {
            Self::from_rsa_der(data)
        }
    }

    /// Construct an instance from a PEM document.
    ///
    /// The PEM label selects the format.
    pub fn from_pem(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let doc = pem::parse(data.as_ref()).map_err(Error::PemDecode)?;

        match doc.tag.as_str() {
            "PRIVATE KEY" => Self::from_pkcs8_der(&doc.contents),
            "EC PRIVATE KEY" => Self::from_sec1_ec_der(&doc.contents),
            "RSA PRIVATE KEY" => Self::from_rsa_der(&doc.contents),
            tag => Err(Error::UnsupportedKeyType(format!(
                "unrecognized PEM label: {}",
                tag
            ))),
        }
    }

    /// Construct an instance from DER or PEM data, detecting which.
    pub fn from_der_or_pem(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let data = data.as_ref();

        if data.starts_with(b"-----BEGIN") {
            Self::from_pem(data)
        } else {
            Self::from_der(data)
        }
    }

    /// Generate a random key pair given a key algorithm.
    ///
    /// The raw PKCS#8 document is returned to facilitate access to the private key.
    ///
    /// No attempt is made to protect the private key in memory.
    pub fn generate_random(
        key_algorithm: KeyAlgorithm,
    ) -> Result<(Self, ring::pkcs8::Document), Error> {
        let rng = SystemRandom::new();

        let document = match key_algorithm {
            KeyAlgorithm::Ed25519 => {
                ringsig::Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| Error::KeyGeneration)
            }
            KeyAlgorithm::Ecdsa(curve) => ringsig::EcdsaKeyPair::generate_pkcs8(curve.into(), &rng)
                .map_err(|_| Error::KeyGeneration),
            KeyAlgorithm::Rsa => Err(Error::UnsupportedKeyType(
                "RSA key generation is not supported".into(),
            )),
        }?;

        let key_pair = Self::from_pkcs8_der(document.as_ref())?;

        Ok((key_pair, document))
    }

    /// Attempt to resolve a verification algorithm for this key pair.
    pub fn verification_algorithm(
        &self,
    ) -> Result<&'static dyn ringsig::VerificationAlgorithm, Error> {
        self.signature_algorithm()?
            .resolve_verification_algorithm(KeyAlgorithm::from(self))
    }
}

impl From<&InMemorySigningKeyPair> for KeyAlgorithm {
    fn from(key: &InMemorySigningKeyPair) -> Self {
        match key {
            InMemorySigningKeyPair::Rsa(_, _) => KeyAlgorithm::Rsa,
            InMemorySigningKeyPair::Ecdsa(_, curve, _) => KeyAlgorithm::Ecdsa(*curve),
            InMemorySigningKeyPair::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }
}
