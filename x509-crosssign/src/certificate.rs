// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Defines high-level interface to X.509 certificates.

use {
    crate::{
        algorithm::{DigestAlgorithm, KeyAlgorithm, SignatureAlgorithm},
        raw::decode_exact,
        rfc3280::Name,
        rfc5280::{
            BasicConstraints, Certificate, Extension, KeyUsage, NameConstraints,
            SubjectKeyIdentifier, Validity, OID_BASIC_CONSTRAINTS, OID_KEY_USAGE,
            OID_NAME_CONSTRAINTS, OID_SUBJECT_KEY_IDENTIFIER,
        },
        CertificateRole, CrossSignError as Error,
    },
    bcder::{decode::DecodeError, ConstOid, OctetString},
    bytes::Bytes,
    ring::signature,
    std::convert::{Infallible, TryFrom},
};

/// A parsed X.509 certificate which remembers the DER it came from.
///
/// Fields are exposed through the value-level [Certificate] type, which is
/// what the certificate generators in this crate read from. Anything
/// depending on exact bytes (fingerprints, signature verification) is
/// computed from the original DER instead.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct X509Certificate {
    certificate: Certificate,
    original: Bytes,
}

impl X509Certificate {
    /// Construct an instance by parsing DER encoded ASN.1 data.
    ///
    /// Trailing data after the certificate is rejected. Decode failures are
    /// attributed to [CertificateRole::Original].
    pub fn from_der(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        Self::from_der_as(data, CertificateRole::Original)
    }

    /// Like [Self::from_der] but attributing decode failures to `role`.
    pub fn from_der_as(data: impl AsRef<[u8]>, role: CertificateRole) -> Result<Self, Error> {
        let original = Bytes::copy_from_slice(data.as_ref());

        let certificate = decode_exact(original.clone(), Certificate::take_from)
            .map_err(|e| Error::MalformedInput(role, e))?;

        Ok(Self {
            certificate,
            original,
        })
    }

    /// Construct an instance from a PEM encoded `CERTIFICATE` document.
    pub fn from_pem(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let data = pem::parse(data.as_ref()).map_err(Error::PemDecode)?;

        Self::from_der(&data.contents)
    }

    /// Construct an instance from DER or PEM data.
    ///
    /// PEM is detected by its `-----BEGIN` armor.
    pub fn from_der_or_pem(data: impl AsRef<[u8]>) -> Result<Self, Error> {
        let data = data.as_ref();

        if data.starts_with(b"-----BEGIN") {
            Self::from_pem(data)
        } else {
            Self::from_der(data)
        }
    }

    pub fn subject_name(&self) -> &Name {
        &self.certificate.tbs_certificate.subject
    }

    pub fn issuer_name(&self) -> &Name {
        &self.certificate.tbs_certificate.issuer
    }

    /// Obtain the first common name of the subject, if there is one.
    pub fn subject_common_name(&self) -> Result<Option<String>, DecodeError<Infallible>> {
        self.subject_name().common_name()
    }

    pub fn validity(&self) -> &Validity {
        &self.certificate.tbs_certificate.validity
    }

    pub fn iter_extensions(&self) -> impl Iterator<Item = &Extension> {
        self.certificate.iter_extensions()
    }

    /// Find the first extension having the given OID.
    pub fn find_extension(&self, oid: ConstOid) -> Option<&Extension> {
        self.iter_extensions().find(|extension| extension.id == oid)
    }

    pub fn name_constraints(&self) -> Result<Option<NameConstraints>, DecodeError<Infallible>> {
        self.find_extension(OID_NAME_CONSTRAINTS)
            .map(|extension| extension.decode_value(NameConstraints::take_from))
            .transpose()
    }

    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>, DecodeError<Infallible>> {
        self.find_extension(OID_BASIC_CONSTRAINTS)
            .map(|extension| extension.decode_value(BasicConstraints::take_from))
            .transpose()
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>, DecodeError<Infallible>> {
        self.find_extension(OID_KEY_USAGE)
            .map(|extension| extension.decode_value(KeyUsage::take_from))
            .transpose()
    }

    pub fn subject_key_identifier(
        &self,
    ) -> Result<Option<SubjectKeyIdentifier>, DecodeError<Infallible>> {
        self.find_extension(OID_SUBJECT_KEY_IDENTIFIER)
            .map(|extension| extension.decode_value(OctetString::take_from))
            .transpose()
    }

    /// Uppercase hex SHA-256 digest of the DER this instance was parsed from.
    pub fn sha256_fingerprint_hex(&self) -> String {
        hex::encode_upper(DigestAlgorithm::Sha256.digest_data(&self.original))
    }

    /// Attempt to resolve a known [KeyAlgorithm] used by the private key associated with this certificate.
    ///
    /// If this crate isn't aware of the OID associated with the key algorithm,
    /// `None` is returned.
    pub fn key_algorithm(&self) -> Option<KeyAlgorithm> {
        KeyAlgorithm::try_from(
            &self
                .certificate
                .tbs_certificate
                .subject_public_key_info
                .algorithm,
        )
        .ok()
    }

    /// Obtain the raw data constituting this certificate's public key.
    pub fn public_key_data(&self) -> Bytes {
        self.certificate
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .octet_bytes()
    }

    /// The algorithm the issuer signed this certificate with.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, Error> {
        SignatureAlgorithm::try_from(&self.certificate.signature_algorithm)
    }

    /// Obtain the DER data that was used to construct this instance.
    pub fn constructed_data(&self) -> &[u8] {
        &self.original
    }

    pub fn encode_der(&self) -> Vec<u8> {
        self.original.to_vec()
    }

    /// Encode the original contents of this certificate to PEM.
    pub fn encode_pem(&self) -> String {
        pem::encode(&pem::Pem {
            tag: "CERTIFICATE".to_string(),
            contents: self.encode_der(),
        })
    }

    /// Verify that another certificate, `other`, signed this certificate.
    ///
    /// If this is a self-signed certificate, you can pass `self`.
    pub fn verify_signed_by_certificate(&self, other: &X509Certificate) -> Result<(), Error> {
        let key_algorithm = other.key_algorithm().ok_or_else(|| {
            Error::UnknownKeyAlgorithm(format!(
                "{}",
                other
                    .certificate
                    .tbs_certificate
                    .subject_public_key_info
                    .algorithm
                    .algorithm
            ))
        })?;

        self.verify_signed_by_public_key(key_algorithm, other.public_key_data())
    }

    /// Verifies that this certificate was cryptographically signed using raw public key data from a signing key.
    ///
    /// Verification is performed over the signed body exactly as it appeared
    /// in the original DER.
    pub fn verify_signed_by_public_key(
        &self,
        key_algorithm: KeyAlgorithm,
        public_key_data: impl AsRef<[u8]>,
    ) -> Result<(), Error> {
        let signed_data = self
            .certificate
            .tbs_certificate
            .raw_data
            .as_ref()
            .ok_or(Error::CertificateSignatureVerificationFailed)?;
        let signature = self.certificate.signature.octet_bytes();

        let verify_algorithm = self
            .signature_algorithm()?
            .resolve_verification_algorithm(key_algorithm)?;

        let public_key = signature::UnparsedPublicKey::new(verify_algorithm, public_key_data);

        public_key
            .verify(signed_data, &signature)
            .map_err(|_| Error::CertificateSignatureVerificationFailed)
    }
}

impl AsRef<Certificate> for X509Certificate {
    fn as_ref(&self) -> &Certificate {
        &self.certificate
    }
}

impl From<X509Certificate> for Certificate {
    fn from(cert: X509Certificate) -> Self {
        cert.certificate
    }
}
