// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-sign X.509 certificate authorities.
//!
//! This crate re-signs existing X.509 certificates with a different issuer
//! while leaving every other field of the certificate untouched, byte for
//! byte. On top of that primitive, it can retrofit a DNS name constraint onto
//! an already-deployed root certificate authority without needing access to
//! that CA's private key.
//!
//! The retrofit produces a 3 certificate chain:
//!
//! 1. A freshly generated, self-signed root CA whose common name embeds the
//!    SHA-256 fingerprint of the original root.
//! 2. An intermediate CA, signed by the new root, carrying a critical
//!    `NameConstraints` extension excluding a single DNS subtree.
//! 3. A *cross-signed* certificate, signed by the intermediate, which is
//!    otherwise identical to the original root CA (subject, public key,
//!    validity, extensions).
//!
//! Relying parties trusting the new root (instead of the original) can then
//! validate everything the original root could, except names falling under
//! the excluded domain.
//!
//! The main entry points are [cross_sign()] for re-signing an arbitrary
//! certificate and [get_cross_signed_der()] / [generate_chain_files()] for the
//! full name constraint retrofit.
//!
//! Low-level ASN.1 primitives are defined in modules having the name of the
//! RFC in which they are defined. The [raw] module holds the raw-preserving
//! certificate model the cross-signing engine operates on.

pub mod algorithm;
pub use algorithm::*;
pub mod asn1time;
mod certificate;
pub use certificate::*;
mod chain;
pub use chain::*;
mod cross_sign;
pub use cross_sign::*;
mod intermediate;
pub use intermediate::*;
mod private_key;
pub mod raw;
pub mod rfc3280;
pub mod rfc5280;
mod root;
pub use root::*;
mod signing;
pub use signing::*;

#[cfg(test)]
mod testutil;

use {
    bcder::decode::DecodeError,
    std::{
        convert::Infallible,
        fmt::{Display, Formatter},
    },
    thiserror::Error,
};

/// Identifies which certificate an operation was looking at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CertificateRole {
    /// The pre-existing root CA the chain is derived from.
    Original,
    /// The certificate whose body is being re-signed.
    ToEndorse,
    /// The certificate whose subject becomes the new issuer.
    Signer,
}

impl Display for CertificateRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Original => "original root CA certificate",
            Self::ToEndorse => "certificate to sign",
            Self::Signer => "signer certificate",
        })
    }
}

/// A step of the name constraint chain pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    RootCa,
    IntermediateCa,
    CrossSignedCa,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::RootCa => "error generating root CA",
            Self::IntermediateCa => "error generating intermediate CA",
            Self::CrossSignedCa => "error generating cross-signed CA",
        })
    }
}

/// Unified error type for this crate.
#[derive(Debug, Error)]
pub enum CrossSignError {
    #[error("malformed {0}: {1}")]
    MalformedInput(CertificateRole, DecodeError<Infallible>),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("error generating key pair")]
    KeyGeneration,

    #[error("error producing signature: {0}")]
    Signing(String),

    #[error("error generating serial number")]
    SerialNumberGeneration,

    #[error("unable to obtain {field} from {role}: {reason}")]
    ParseField {
        role: CertificateRole,
        field: &'static str,
        reason: String,
    },

    #[error("signer private key does not match the public key of the signer certificate")]
    SignerKeyMismatch,

    #[error("invalid name attribute: {0}")]
    InvalidNameAttribute(String),

    #[error("unknown signature algorithm: {0}")]
    UnknownSignatureAlgorithm(String),

    #[error("unknown key algorithm: {0}")]
    UnknownKeyAlgorithm(String),

    #[error("unknown elliptic curve: {0}")]
    UnknownEllipticCurve(String),

    #[error("certificate signature verification failed")]
    CertificateSignatureVerificationFailed,

    #[error("PEM decode error: {0}")]
    PemDecode(pem::PemError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        source: Box<CrossSignError>,
    },
}

impl CrossSignError {
    /// Wrap this error with the pipeline stage that produced it.
    pub fn in_stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The outermost pipeline stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with all stage context peeled off.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            _ => self,
        }
    }

    /// Whether the underlying cause is unparsable input.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self.root_cause(), Self::MalformedInput(..))
    }
}
