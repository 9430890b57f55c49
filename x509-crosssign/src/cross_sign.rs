// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Re-signing of existing certificates by a different issuer.

use {
    crate::{
        algorithm::SignatureAlgorithm,
        raw::{RawCertificate, RawTbsCertificate},
        signing::KeyInfoSigner,
        CertificateRole, CrossSignError as Error,
    },
    bcder::{BitString, Captured, Integer},
    bytes::Bytes,
    log::{debug, warn},
    ring::rand::{SecureRandom, SystemRandom},
    std::convert::TryFrom,
};

/// Generate a certificate serial number.
///
/// The value is drawn uniformly from `[0, 2^128)`. No attempt is made to
/// detect collisions with previously issued serial numbers.
pub fn random_serial_number() -> Result<Integer, Error> {
    let mut data = [0u8; 16];

    SystemRandom::new()
        .fill(&mut data)
        .map_err(|_| Error::SerialNumberGeneration)?;

    Ok(Integer::from(u128::from_be_bytes(data)))
}

/// Ensure a key signs with SHA-256, the only digest certificates are signed with.
fn require_sha256_signer(signer: &dyn KeyInfoSigner) -> Result<SignatureAlgorithm, Error> {
    let algorithm = signer.signature_algorithm()?;

    match algorithm {
        SignatureAlgorithm::EcdsaSha256 | SignatureAlgorithm::RsaSha256 => Ok(algorithm),
        _ => Err(Error::UnsupportedKeyType(format!(
            "{:?} keys cannot produce SHA-256 certificate signatures",
            signer.key_algorithm()
        ))),
    }
}

/// Sign a TBS certificate and wrap it into a certificate.
///
/// `signature_algorithm` is the encoded `AlgorithmIdentifier` placed in the
/// outer certificate. It is written as given.
///
/// The returned certificate has [RawTbsCertificate::raw_data] set to the
/// signed bytes.
pub fn sign_tbs_certificate(
    mut tbs_certificate: RawTbsCertificate,
    signature_algorithm: Captured,
    signer: &dyn KeyInfoSigner,
) -> Result<RawCertificate, Error> {
    require_sha256_signer(signer)?;

    let tbs_der = tbs_certificate.encode_der();

    let signature = signer
        .try_sign(&tbs_der)
        .map_err(|e| Error::Signing(format!("{}", e)))?;

    tbs_certificate.raw_data = Bytes::from(tbs_der);

    Ok(RawCertificate {
        tbs_certificate,
        signature_algorithm,
        signature: BitString::new(0, Bytes::from(Vec::<u8>::from(signature))),
    })
}

/// Re-sign a parsed certificate with another certificate's key.
///
/// The issuer and both signature algorithm identifiers are taken from
/// `signer`. A new serial number is generated. All other fields of
/// `to_endorse` are carried over as encoded.
pub fn cross_sign_certificate(
    to_endorse: &RawCertificate,
    signer: &RawCertificate,
    signer_key: &dyn KeyInfoSigner,
) -> Result<RawCertificate, Error> {
    let key_signature_algorithm = require_sha256_signer(signer_key)?;

    let signer_spki = signer
        .tbs_certificate
        .decode_subject_public_key_info()
        .map_err(|e| Error::MalformedInput(CertificateRole::Signer, e))?;

    if signer_spki.subject_public_key.octet_bytes() != signer_key.public_key_data() {
        return Err(Error::SignerKeyMismatch);
    }

    match signer
        .decode_signature_algorithm()
        .map_err(|e| Error::MalformedInput(CertificateRole::Signer, e))
        .and_then(|alg| SignatureAlgorithm::try_from(&alg))
    {
        Ok(declared) if declared == key_signature_algorithm => {}
        Ok(declared) => {
            warn!(
                "signer certificate declares {:?} but its key signs with {:?}; keeping declared identifier",
                declared, key_signature_algorithm
            );
        }
        Err(e) => {
            warn!(
                "unable to interpret signer certificate signature algorithm ({}); keeping declared identifier",
                e
            );
        }
    }

    let serial_number = random_serial_number()?;
    debug!(
        "cross-signing with serial number {}",
        hex::encode(serial_number.as_slice())
    );

    let tbs_certificate = RawTbsCertificate {
        serial_number,
        signature: signer.tbs_certificate.signature.clone(),
        issuer: signer.subject().clone(),
        raw_data: Bytes::new(),
        ..to_endorse.tbs_certificate.clone()
    };

    sign_tbs_certificate(
        tbs_certificate,
        signer.signature_algorithm.clone(),
        signer_key,
    )
}

/// Re-sign the DER certificate `to_endorse_der` by the issuer `signer_der`.
///
/// `signer_key` must be the private key of `signer_der`. The result is the
/// DER encoding of a certificate which is identical to `to_endorse_der`
/// except for its serial number, issuer, signature algorithms and signature.
pub fn cross_sign(
    to_endorse_der: &[u8],
    signer_der: &[u8],
    signer_key: &dyn KeyInfoSigner,
) -> Result<Vec<u8>, Error> {
    let to_endorse = RawCertificate::from_der(Bytes::copy_from_slice(to_endorse_der))
        .map_err(|e| Error::MalformedInput(CertificateRole::ToEndorse, e))?;
    let signer = RawCertificate::from_der(Bytes::copy_from_slice(signer_der))
        .map_err(|e| Error::MalformedInput(CertificateRole::Signer, e))?;

    let cert = cross_sign_certificate(&to_endorse, &signer, signer_key)?;

    Ok(cert.encode_der())
}
