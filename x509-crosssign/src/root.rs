// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generation of the self-signed root CA of a name constraint chain.

use {
    crate::{
        algorithm::{DigestAlgorithm, EcdsaCurve, KeyAlgorithm},
        cross_sign::{random_serial_number, sign_tbs_certificate},
        raw::RawTbsCertificate,
        rfc3280::Name,
        rfc5280::{
            AlgorithmIdentifier, AuthorityKeyIdentifier, BasicConstraints, Extension, Extensions,
            KeyUsage, KeyUsageFlag, NameConstraints, SubjectPublicKeyInfo, TbsCertificate,
            Validity, Version, OID_AUTHORITY_KEY_IDENTIFIER, OID_BASIC_CONSTRAINTS,
            OID_KEY_USAGE, OID_NAME_CONSTRAINTS, OID_SUBJECT_KEY_IDENTIFIER,
        },
        signing::{InMemorySigningKeyPair, Sign},
        CertificateRole, CrossSignError as Error, X509Certificate,
    },
    bcder::{encode::Values, BitString, Mode, OctetString},
    bytes::Bytes,
    log::debug,
};

/// Subject serialNumber attribute of generated certificates.
pub const PROVENANCE_NOTICE: &str = "This certificate was generated locally to apply a name \
    constraint to an existing root CA. Its private key was destroyed immediately after the \
    existing root CA was cross-signed. For more information, see \
    https://github.com/namecoin/crosssignnameconstraint";

/// A generated CA certificate and its private key.
///
/// The key is only needed to sign the next certificate in the chain. It is
/// never serialized and is gone once this value is dropped.
#[derive(Debug)]
pub struct GeneratedCa {
    pub certificate_der: Vec<u8>,
    pub key_pair: InMemorySigningKeyPair,
}

/// Compute the RFC 5280 method 1 key identifier of a public key.
pub(crate) fn key_identifier(public_key_data: &[u8]) -> OctetString {
    OctetString::new(Bytes::from(
        DigestAlgorithm::Sha1.digest_data(public_key_data),
    ))
}

/// Derive the subject of a generated certificate from the original root.
///
/// The common name is `prefix`, the original common name and the uppercase
/// SHA-256 fingerprint of the original. A serialNumber attribute carries
/// [PROVENANCE_NOTICE].
pub(crate) fn derived_subject(cn_prefix: &str, original: &X509Certificate) -> Result<Name, Error> {
    let original_cn = original
        .subject_common_name()
        .map_err(|e| Error::ParseField {
            role: CertificateRole::Original,
            field: "subject common name",
            reason: e.to_string(),
        })?
        .ok_or_else(|| Error::ParseField {
            role: CertificateRole::Original,
            field: "subject common name",
            reason: "attribute not present".into(),
        })?;

    let common_name = format!(
        "{}{} {}",
        cn_prefix,
        original_cn,
        original.sha256_fingerprint_hex()
    );

    let mut name = Name::default();
    name.append_common_name_utf8_string(&common_name)
        .map_err(|_| Error::InvalidNameAttribute(common_name.clone()))?;
    name.append_serial_number_printable_string(PROVENANCE_NOTICE)
        .map_err(|_| Error::InvalidNameAttribute(PROVENANCE_NOTICE.into()))?;

    Ok(name)
}

/// Extensions of a generated CA certificate.
pub(crate) fn ca_extensions(
    public_key_data: &[u8],
    authority_key_identifier: Option<OctetString>,
    name_constraints: Option<&NameConstraints>,
) -> Extensions {
    let mut extensions = vec![
        Extension::new(OID_BASIC_CONSTRAINTS, true, BasicConstraints::ca().encode()),
        Extension::new(
            OID_KEY_USAGE,
            true,
            KeyUsage::from_flags([KeyUsageFlag::KeyCertSign]).encode_ref(),
        ),
        Extension::new(
            OID_SUBJECT_KEY_IDENTIFIER,
            false,
            key_identifier(public_key_data).encode(),
        ),
    ];

    if let Some(key_id) = authority_key_identifier {
        extensions.push(Extension::new(
            OID_AUTHORITY_KEY_IDENTIFIER,
            false,
            AuthorityKeyIdentifier::from_key_identifier(key_id).encode_ref(),
        ));
    }

    if let Some(constraints) = name_constraints {
        extensions.push(Extension::new(
            OID_NAME_CONSTRAINTS,
            true,
            constraints.encode_ref(),
        ));
    }

    extensions
}

/// Generate a fresh P-256 key pair for a CA certificate.
pub(crate) fn generate_ca_key_pair() -> Result<InMemorySigningKeyPair, Error> {
    let (key_pair, _) =
        InMemorySigningKeyPair::generate_random(KeyAlgorithm::Ecdsa(EcdsaCurve::Secp256r1))?;

    Ok(key_pair)
}

/// Value-level TBS certificate for a CA certificate issued to `key_pair`.
pub(crate) fn ca_tbs_certificate(
    subject: Name,
    issuer: Name,
    signature: AlgorithmIdentifier,
    validity: Validity,
    key_pair: &InMemorySigningKeyPair,
    extensions: Extensions,
) -> Result<TbsCertificate, Error> {
    let key_algorithm = key_pair
        .key_algorithm()
        .ok_or_else(|| Error::UnsupportedKeyType("key algorithm not recognized".into()))?;

    Ok(TbsCertificate {
        version: Some(Version::V3),
        serial_number: random_serial_number()?,
        signature,
        issuer,
        validity,
        subject,
        subject_public_key_info: SubjectPublicKeyInfo {
            algorithm: key_algorithm.into(),
            subject_public_key: BitString::new(0, key_pair.public_key_data()),
        },
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
        raw_data: None,
    })
}

/// Generate a self-signed root CA derived from `original_der`.
///
/// The subject is derived as described by [PROVENANCE_NOTICE] and
/// `cn_prefix`. The validity period is copied from the original so the new
/// root never outlives it. The root may only sign certificates.
pub fn generate_root_ca(cn_prefix: &str, original_der: &[u8]) -> Result<GeneratedCa, Error> {
    let original = X509Certificate::from_der_as(original_der, CertificateRole::Original)?;
    let subject = derived_subject(cn_prefix, &original)?;

    let key_pair = generate_ca_key_pair()?;
    let signature_algorithm = AlgorithmIdentifier::from(key_pair.signature_algorithm()?);

    let tbs_certificate = ca_tbs_certificate(
        subject.clone(),
        subject,
        signature_algorithm.clone(),
        original.validity().clone(),
        &key_pair,
        ca_extensions(&key_pair.public_key_data(), None, None),
    )?;

    let cert = sign_tbs_certificate(
        RawTbsCertificate::from(&tbs_certificate),
        signature_algorithm.to_captured(Mode::Der),
        &key_pair,
    )?;

    debug!(
        "generated root CA with serial number {}",
        hex::encode(cert.tbs_certificate.serial_number.as_slice())
    );

    Ok(GeneratedCa {
        certificate_der: cert.encode_der(),
        key_pair,
    })
}
