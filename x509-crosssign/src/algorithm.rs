// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cryptographic algorithms commonly encountered in X.509 certificates.

use {
    crate::{
        rfc5280::{AlgorithmIdentifier, AlgorithmParameter},
        CrossSignError as Error,
    },
    bcder::{ConstOid, Oid},
    ring::{digest, signature},
    std::convert::TryFrom,
};

/// RSA+SHA-1 encryption.
///
/// 1.2.840.113549.1.1.5
const OID_SHA1_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 5]);

/// RSA+SHA-256 encryption.
///
/// 1.2.840.113549.1.1.11
const OID_SHA256_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);

/// RSA+SHA-384 encryption.
///
/// 1.2.840.113549.1.1.12
const OID_SHA384_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 12]);

/// RSA+SHA-512 encryption.
///
/// 1.2.840.113549.1.1.13
const OID_SHA512_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 13]);

/// RSA encryption.
///
/// 1.2.840.113549.1.1.1
const OID_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

/// ECDSA with SHA-256.
///
/// 1.2.840.10045.4.3.2
const OID_ECDSA_SHA256: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 3, 2]);

/// ECDSA with SHA-384.
///
/// 1.2.840.10045.4.3.3
const OID_ECDSA_SHA384: ConstOid = Oid(&[42, 134, 72, 206, 61, 4, 3, 3]);

/// Elliptic curve public key cryptography.
///
/// 1.2.840.10045.2.1
const OID_EC_PUBLIC_KEY: ConstOid = Oid(&[42, 134, 72, 206, 61, 2, 1]);

/// ED25519 key agreement.
///
/// 1.3.101.110
const OID_ED25519_KEY_AGREEMENT: ConstOid = Oid(&[43, 101, 110]);

/// Edwards curve digital signature algorithm.
///
/// 1.3.101.112
const OID_ED25519_SIGNATURE_ALGORITHM: ConstOid = Oid(&[43, 101, 112]);

/// Elliptic curve NIST P-256.
///
/// 1.2.840.10045.3.1.7
const OID_EC_SECP256R1: ConstOid = Oid(&[42, 134, 72, 206, 61, 3, 1, 7]);

/// Elliptic curve NIST P-384.
///
/// 1.3.132.0.34
const OID_EC_SECP384R1: ConstOid = Oid(&[43, 129, 4, 0, 34]);

/// A hashing algorithm used for digesting data.
///
/// SHA-1 is only used to derive key identifiers, never for signatures
/// produced by this crate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl From<DigestAlgorithm> for digest::Context {
    fn from(alg: DigestAlgorithm) -> Self {
        digest::Context::new(match alg {
            DigestAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            DigestAlgorithm::Sha256 => &digest::SHA256,
        })
    }
}

impl DigestAlgorithm {
    /// Digest a slice of data in one shot.
    pub fn digest_data(&self, data: &[u8]) -> Vec<u8> {
        let mut h = digest::Context::from(*self);
        h.update(data);
        h.finish().as_ref().to_vec()
    }
}

/// An elliptic curve.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EcdsaCurve {
    /// NIST P-256, a.k.a. secp256r1.
    Secp256r1,
    /// NIST P-384, a.k.a. secp384r1.
    Secp384r1,
}

impl From<EcdsaCurve> for Oid {
    fn from(curve: EcdsaCurve) -> Self {
        Oid(match curve {
            EcdsaCurve::Secp256r1 => OID_EC_SECP256R1.as_ref(),
            EcdsaCurve::Secp384r1 => OID_EC_SECP384R1.as_ref(),
        }
        .into())
    }
}

impl EcdsaCurve {
    /// All known curves.
    pub fn all() -> &'static [Self] {
        &[Self::Secp256r1, Self::Secp384r1]
    }
}

impl From<EcdsaCurve> for &'static signature::EcdsaSigningAlgorithm {
    /// ring pairs each curve with the digest of the same strength.
    fn from(curve: EcdsaCurve) -> Self {
        match curve {
            EcdsaCurve::Secp256r1 => &signature::ECDSA_P256_SHA256_ASN1_SIGNING,
            EcdsaCurve::Secp384r1 => &signature::ECDSA_P384_SHA384_ASN1_SIGNING,
        }
    }
}

impl TryFrom<&Oid> for EcdsaCurve {
    type Error = Error;

    fn try_from(v: &Oid) -> Result<Self, Self::Error> {
        if v == &OID_EC_SECP256R1 {
            Ok(Self::Secp256r1)
        } else if v == &OID_EC_SECP384R1 {
            Ok(Self::Secp384r1)
        } else {
            Err(Error::UnknownEllipticCurve(format!("{}", v)))
        }
    }
}

/// An algorithm used to digitally sign content.
///
/// Instances can be converted to/from [Oid] via `From`/`Into`.
///
/// Similarly, instances can be converted to/from an ASN.1
/// [AlgorithmIdentifier].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignatureAlgorithm {
    /// SHA-1 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.5.
    RsaSha1,

    /// SHA-256 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.11.
    RsaSha256,

    /// SHA-384 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.12.
    RsaSha384,

    /// SHA-512 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.13.
    RsaSha512,

    /// ECDSA with SHA-256.
    ///
    /// Corresponds to OID 1.2.840.10045.4.3.2.
    EcdsaSha256,

    /// ECDSA with SHA-384.
    ///
    /// Corresponds to OID 1.2.840.10045.4.3.3.
    EcdsaSha384,

    /// ED25519
    ///
    /// Corresponds to OID 1.3.101.112.
    Ed25519,
}

impl From<SignatureAlgorithm> for Oid {
    fn from(alg: SignatureAlgorithm) -> Self {
        Oid(match alg {
            SignatureAlgorithm::RsaSha1 => OID_SHA1_RSA.as_ref(),
            SignatureAlgorithm::RsaSha256 => OID_SHA256_RSA.as_ref(),
            SignatureAlgorithm::RsaSha384 => OID_SHA384_RSA.as_ref(),
            SignatureAlgorithm::RsaSha512 => OID_SHA512_RSA.as_ref(),
            SignatureAlgorithm::EcdsaSha256 => OID_ECDSA_SHA256.as_ref(),
            SignatureAlgorithm::EcdsaSha384 => OID_ECDSA_SHA384.as_ref(),
            SignatureAlgorithm::Ed25519 => OID_ED25519_SIGNATURE_ALGORITHM.as_ref(),
        }
        .into())
    }
}

impl TryFrom<&Oid> for SignatureAlgorithm {
    type Error = Error;

    fn try_from(v: &Oid) -> Result<Self, Self::Error> {
        if v == &OID_SHA1_RSA {
            Ok(Self::RsaSha1)
        } else if v == &OID_SHA256_RSA {
            Ok(Self::RsaSha256)
        } else if v == &OID_SHA384_RSA {
            Ok(Self::RsaSha384)
        } else if v == &OID_SHA512_RSA {
            Ok(Self::RsaSha512)
        } else if v == &OID_ECDSA_SHA256 {
            Ok(Self::EcdsaSha256)
        } else if v == &OID_ECDSA_SHA384 {
            Ok(Self::EcdsaSha384)
        } else if v == &OID_ED25519_SIGNATURE_ALGORITHM {
            Ok(Self::Ed25519)
        } else {
            Err(Error::UnknownSignatureAlgorithm(format!("{}", v)))
        }
    }
}

impl TryFrom<&AlgorithmIdentifier> for SignatureAlgorithm {
    type Error = Error;

    fn try_from(v: &AlgorithmIdentifier) -> Result<Self, Self::Error> {
        Self::try_from(&v.algorithm)
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifier {
    /// RSA identifiers carry an explicit `NULL` parameter (RFC 4055). ECDSA
    /// and EdDSA identifiers omit parameters (RFC 5758, RFC 8410).
    fn from(alg: SignatureAlgorithm) -> Self {
        let parameters = match alg {
            SignatureAlgorithm::RsaSha1
            | SignatureAlgorithm::RsaSha256
            | SignatureAlgorithm::RsaSha384
            | SignatureAlgorithm::RsaSha512 => Some(AlgorithmParameter::null()),
            SignatureAlgorithm::EcdsaSha256
            | SignatureAlgorithm::EcdsaSha384
            | SignatureAlgorithm::Ed25519 => None,
        };

        Self {
            algorithm: alg.into(),
            parameters,
        }
    }
}

impl SignatureAlgorithm {
    /// Resolve the [signature::VerificationAlgorithm] verifying this signature
    /// made by a key of the given algorithm.
    ///
    /// ECDSA verification depends on the curve of the signing key, so the
    /// signature algorithm alone is not sufficient.
    pub fn resolve_verification_algorithm(
        &self,
        key_algorithm: KeyAlgorithm,
    ) -> Result<&'static dyn signature::VerificationAlgorithm, Error> {
        match (self, key_algorithm) {
            (Self::RsaSha1, KeyAlgorithm::Rsa) => {
                Ok(&signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY)
            }
            (Self::RsaSha256, KeyAlgorithm::Rsa) => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
            (Self::RsaSha384, KeyAlgorithm::Rsa) => Ok(&signature::RSA_PKCS1_2048_8192_SHA384),
            (Self::RsaSha512, KeyAlgorithm::Rsa) => Ok(&signature::RSA_PKCS1_2048_8192_SHA512),
            (Self::EcdsaSha256, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp256r1)) => {
                Ok(&signature::ECDSA_P256_SHA256_ASN1)
            }
            (Self::EcdsaSha256, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp384r1)) => {
                Ok(&signature::ECDSA_P384_SHA256_ASN1)
            }
            (Self::EcdsaSha384, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp256r1)) => {
                Ok(&signature::ECDSA_P256_SHA384_ASN1)
            }
            (Self::EcdsaSha384, KeyAlgorithm::Ecdsa(EcdsaCurve::Secp384r1)) => {
                Ok(&signature::ECDSA_P384_SHA384_ASN1)
            }
            (Self::Ed25519, KeyAlgorithm::Ed25519) => Ok(&signature::ED25519),
            (alg, key) => Err(Error::UnsupportedKeyType(format!(
                "{:?} signatures cannot be made by {:?} keys",
                alg, key
            ))),
        }
    }
}

/// Cryptographic algorithm used by a private key.
///
/// Instances can be converted to/from the underlying ASN.1 type and
/// OIDs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyAlgorithm {
    /// RSA
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.1.
    Rsa,

    /// Corresponds to OID 1.2.840.10045.2.1, with the curve as parameter.
    Ecdsa(EcdsaCurve),

    /// Corresponds to OID 1.3.101.110
    Ed25519,
}

impl From<KeyAlgorithm> for Oid {
    fn from(alg: KeyAlgorithm) -> Self {
        Oid(match alg {
            KeyAlgorithm::Rsa => OID_RSA.as_ref(),
            KeyAlgorithm::Ecdsa(_) => OID_EC_PUBLIC_KEY.as_ref(),
            KeyAlgorithm::Ed25519 => OID_ED25519_SIGNATURE_ALGORITHM.as_ref(),
        }
        .into())
    }
}

impl TryFrom<&AlgorithmIdentifier> for KeyAlgorithm {
    type Error = Error;

    fn try_from(v: &AlgorithmIdentifier) -> Result<Self, Self::Error> {
        if v.algorithm == OID_RSA {
            Ok(Self::Rsa)
        } else if v.algorithm == OID_EC_PUBLIC_KEY {
            let curve = v
                .parameters
                .as_ref()
                .ok_or_else(|| Error::UnknownEllipticCurve("missing curve parameter".into()))?
                .decode_oid()
                .map_err(|e| Error::UnknownEllipticCurve(format!("{}", e)))?;

            Ok(Self::Ecdsa(EcdsaCurve::try_from(&curve)?))
        // ED25519 appears to use the signature algorithm OID for private key
        // identification, so we need to accept both.
        } else if v.algorithm == OID_ED25519_KEY_AGREEMENT
            || v.algorithm == OID_ED25519_SIGNATURE_ALGORITHM
        {
            Ok(Self::Ed25519)
        } else {
            Err(Error::UnknownKeyAlgorithm(format!("{}", v.algorithm)))
        }
    }
}

impl From<KeyAlgorithm> for AlgorithmIdentifier {
    fn from(alg: KeyAlgorithm) -> Self {
        let parameters = match alg {
            KeyAlgorithm::Rsa => Some(AlgorithmParameter::null()),
            KeyAlgorithm::Ecdsa(curve) => Some(AlgorithmParameter::from_oid(curve.into())),
            KeyAlgorithm::Ed25519 => None,
        };

        Self {
            algorithm: alg.into(),
            parameters,
        }
    }
}
