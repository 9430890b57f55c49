// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generation of the name constrained intermediate CA.

use {
    crate::{
        cross_sign::sign_tbs_certificate,
        raw::{RawCertificate, RawTbsCertificate},
        rfc5280::NameConstraints,
        root::{ca_extensions, ca_tbs_certificate, derived_subject, generate_ca_key_pair},
        signing::{KeyInfoSigner, Sign},
        CertificateRole, CrossSignError as Error, GeneratedCa, X509Certificate,
    },
    bytes::Bytes,
    log::debug,
};

/// Generate an intermediate CA signed by a generated root.
///
/// The intermediate gets its own P-256 key, a subject derived from the
/// original root like [crate::generate_root_ca()] does, the validity of the
/// original root and a critical `NameConstraints` extension excluding the
/// single DNS subtree `excluded_domain`.
///
/// The issuer and signature algorithm identifiers are copied from `root_der`
/// as encoded. `root_key` must be the private key of `root_der`.
pub fn generate_intermediate_ca(
    cn_prefix: &str,
    excluded_domain: &str,
    original_der: &[u8],
    root_der: &[u8],
    root_key: &dyn KeyInfoSigner,
) -> Result<GeneratedCa, Error> {
    let original = X509Certificate::from_der_as(original_der, CertificateRole::Original)?;
    let root = X509Certificate::from_der_as(root_der, CertificateRole::Signer)?;
    let root_raw = RawCertificate::from_der(Bytes::copy_from_slice(root_der))
        .map_err(|e| Error::MalformedInput(CertificateRole::Signer, e))?;

    if root.public_key_data() != root_key.public_key_data() {
        return Err(Error::SignerKeyMismatch);
    }

    let name_constraints = NameConstraints::exclude_dns_name(excluded_domain)
        .map_err(|_| Error::InvalidNameAttribute(excluded_domain.to_string()))?;

    let authority_key_identifier = root
        .subject_key_identifier()
        .map_err(|e| Error::MalformedInput(CertificateRole::Signer, e))?;

    let subject = derived_subject(cn_prefix, &original)?;
    let key_pair = generate_ca_key_pair()?;

    let tbs_certificate = ca_tbs_certificate(
        subject,
        root.subject_name().clone(),
        root.as_ref().tbs_certificate.signature.clone(),
        original.validity().clone(),
        &key_pair,
        ca_extensions(
            &key_pair.public_key_data(),
            authority_key_identifier,
            Some(&name_constraints),
        ),
    )?;

    let tbs_certificate = RawTbsCertificate {
        signature: root_raw.tbs_certificate.signature.clone(),
        issuer: root_raw.subject().clone(),
        ..RawTbsCertificate::from(&tbs_certificate)
    };

    let cert = sign_tbs_certificate(
        tbs_certificate,
        root_raw.signature_algorithm.clone(),
        root_key,
    )?;

    debug!(
        "generated intermediate CA excluding {} with serial number {}",
        excluded_domain,
        hex::encode(cert.tbs_certificate.serial_number.as_slice())
    );

    Ok(GeneratedCa {
        certificate_der: cert.encode_der(),
        key_pair,
    })
}
