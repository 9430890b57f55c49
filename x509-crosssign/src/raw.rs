// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw-preserving certificate model.
//!
//! The types in this module split a certificate into its top-level fields
//! but keep every field except the serial number as the exact bytes it was
//! decoded from. Re-encoding a decoded value therefore reproduces the input
//! exactly, regardless of how the fields would be canonicalized by a full
//! decoder. This is what allows re-signing a certificate without altering its
//! subject, public key, validity, or extensions.

use {
    crate::{
        rfc3280::Name,
        rfc5280::{AlgorithmIdentifier, SubjectPublicKeyInfo, TbsCertificate, Validity},
    },
    bcder::{
        decode::{BytesSource, Constructed, DecodeError, Pos, Source},
        encode,
        encode::{PrimitiveContent, Values},
        BitString, Captured, Integer, Mode, Tag,
    },
    bytes::Bytes,
    std::{
        convert::Infallible,
        fmt::{Debug, Formatter},
    },
};

/// Decode a single DER value which must span all of `data`.
pub(crate) fn decode_exact<T>(
    data: Bytes,
    op: impl FnOnce(&mut Constructed<BytesSource>) -> Result<T, DecodeError<Infallible>>,
) -> Result<T, DecodeError<Infallible>> {
    let captured = Constructed::decode(data.clone(), Mode::Der, |cons| cons.capture_one())?;

    if captured.len() != data.len() {
        return Err(DecodeError::content(
            "trailing data after certificate",
            Pos::from(captured.len()),
        ));
    }

    captured.decode(op)
}

/// Capture a mandatory `SEQUENCE` verbatim.
fn capture_sequence<S: Source>(cons: &mut Constructed<S>) -> Result<Captured, DecodeError<S::Error>> {
    cons.capture(|cons| cons.take_sequence(|cons| cons.skip_all()))
}

fn non_empty(captured: Captured) -> Option<Captured> {
    if captured.is_empty() {
        None
    } else {
        Some(captured)
    }
}

/// An X.509 certificate holding its fields as encoded.
///
/// ```ASN.1
/// Certificate  ::=  SEQUENCE  {
///   tbsCertificate       TBSCertificate,
///   signatureAlgorithm   AlgorithmIdentifier,
///   signature            BIT STRING  }
/// ```
#[derive(Clone)]
pub struct RawCertificate {
    pub tbs_certificate: RawTbsCertificate,
    /// Encoded `AlgorithmIdentifier`.
    pub signature_algorithm: Captured,
    pub signature: BitString,
}

impl Debug for RawCertificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("RawCertificate");
        s.field("tbs_certificate", &self.tbs_certificate);
        s.field(
            "signature_algorithm",
            &format_args!("{}", hex::encode(self.signature_algorithm.as_slice())),
        );
        s.field(
            "signature",
            &format_args!(
                "{} (unused {})",
                hex::encode(self.signature.octet_bytes()),
                self.signature.unused()
            ),
        );
        s.finish()
    }
}

impl PartialEq for RawCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.tbs_certificate == other.tbs_certificate
            && self.signature_algorithm.as_slice() == other.signature_algorithm.as_slice()
            && self.signature == other.signature
    }
}

impl Eq for RawCertificate {}

impl RawCertificate {
    /// Parse DER data into an instance.
    ///
    /// The data must consist of exactly one certificate. Trailing bytes are
    /// an error.
    pub fn from_der(data: impl Into<Bytes>) -> Result<Self, DecodeError<Infallible>> {
        decode_exact(data.into(), Self::take_from)
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let tbs_certificate = RawTbsCertificate::take_from(cons)?;
            let signature_algorithm = capture_sequence(cons)?;
            let signature = BitString::take_from(cons)?;

            Ok(Self {
                tbs_certificate,
                signature_algorithm,
                signature,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.tbs_certificate.encode_ref(),
            &self.signature_algorithm,
            self.signature.encode_ref(),
        ))
    }

    /// Obtain the DER encoding of this certificate.
    pub fn encode_der(&self) -> Vec<u8> {
        self.encode_ref().to_captured(Mode::Der).to_vec()
    }

    /// The encoded `subject` field.
    pub fn subject(&self) -> &Captured {
        &self.tbs_certificate.subject
    }

    /// The encoded `subjectPublicKeyInfo` field.
    pub fn subject_public_key_info(&self) -> &Captured {
        &self.tbs_certificate.subject_public_key_info
    }

    /// Decode the outer signature algorithm.
    pub fn decode_signature_algorithm(&self) -> Result<AlgorithmIdentifier, DecodeError<Infallible>> {
        self.signature_algorithm
            .clone()
            .decode(AlgorithmIdentifier::take_from)
    }
}

/// TBS certificate holding its fields as encoded.
///
/// Only the serial number is interpreted, since it is the one field
/// cross-signing replaces that isn't copied from another certificate.
#[derive(Clone)]
pub struct RawTbsCertificate {
    /// Encoded `[0] EXPLICIT Version`, if present.
    pub version: Option<Captured>,
    pub serial_number: Integer,
    /// Encoded `AlgorithmIdentifier`.
    pub signature: Captured,
    /// Encoded issuer `Name`.
    pub issuer: Captured,
    /// Encoded `Validity`.
    pub validity: Captured,
    /// Encoded subject `Name`.
    pub subject: Captured,
    /// Encoded `SubjectPublicKeyInfo`.
    pub subject_public_key_info: Captured,
    /// Encoded `[1] IMPLICIT UniqueIdentifier`, if present.
    pub issuer_unique_id: Option<Captured>,
    /// Encoded `[2] IMPLICIT UniqueIdentifier`, if present.
    pub subject_unique_id: Option<Captured>,
    /// Each encoded `Extension`, in order.
    pub extensions: Option<Vec<Captured>>,

    /// Raw bytes this instance was decoded from.
    ///
    /// Empty for instances assembled in memory.
    pub raw_data: Bytes,
}

impl Debug for RawTbsCertificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let encoded = |c: &Captured| hex::encode(c.as_slice());

        let mut s = f.debug_struct("RawTbsCertificate");
        s.field("version", &self.version.as_ref().map(encoded));
        s.field("serial_number", &self.serial_number);
        s.field("signature", &encoded(&self.signature));
        s.field("issuer", &encoded(&self.issuer));
        s.field("validity", &encoded(&self.validity));
        s.field("subject", &encoded(&self.subject));
        s.field(
            "subject_public_key_info",
            &encoded(&self.subject_public_key_info),
        );
        s.field("issuer_unique_id", &self.issuer_unique_id.as_ref().map(encoded));
        s.field(
            "subject_unique_id",
            &self.subject_unique_id.as_ref().map(encoded),
        );
        s.field(
            "extensions",
            &self
                .extensions
                .as_ref()
                .map(|e| e.iter().map(encoded).collect::<Vec<_>>()),
        );
        s.finish()
    }
}

impl PartialEq for RawTbsCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.encode_der() == other.encode_der()
    }
}

impl Eq for RawTbsCertificate {}

impl RawTbsCertificate {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let mut res = None;

        let captured = cons.capture(|cons| {
            res = Some(Self::take_sequence(cons)?);
            Ok(())
        })?;

        let mut res = res.ok_or_else(|| cons.content_err("missing TBSCertificate"))?;
        res.raw_data = captured.into_bytes();

        Ok(res)
    }

    fn take_sequence<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let version = non_empty(cons.capture(|cons| {
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| cons.skip_all())?;
                Ok(())
            })?);
            let serial_number = Integer::take_from(cons)?;
            let signature = capture_sequence(cons)?;
            let issuer = capture_sequence(cons)?;
            let validity = capture_sequence(cons)?;
            let subject = capture_sequence(cons)?;
            let subject_public_key_info = capture_sequence(cons)?;
            let issuer_unique_id = non_empty(cons.capture(|cons| {
                cons.take_opt_value_if(Tag::CTX_1, |content| BitString::from_content(content))?;
                Ok(())
            })?);
            let subject_unique_id = non_empty(cons.capture(|cons| {
                cons.take_opt_value_if(Tag::CTX_2, |content| BitString::from_content(content))?;
                Ok(())
            })?);
            let extensions = cons.take_opt_constructed_if(Tag::CTX_3, |cons| {
                cons.take_sequence(|cons| {
                    let mut extensions = Vec::new();

                    loop {
                        let extension = cons.capture(|cons| {
                            cons.take_opt_sequence(|cons| cons.skip_all())?;
                            Ok(())
                        })?;

                        if extension.is_empty() {
                            break;
                        }

                        extensions.push(extension);
                    }

                    Ok(extensions)
                })
            })?;

            Ok(Self {
                version,
                serial_number,
                signature,
                issuer,
                validity,
                subject,
                subject_public_key_info,
                issuer_unique_id,
                subject_unique_id,
                extensions,
                raw_data: Bytes::new(),
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.version.as_ref(),
            (&self.serial_number).encode(),
            &self.signature,
            &self.issuer,
            &self.validity,
            &self.subject,
            &self.subject_public_key_info,
            self.issuer_unique_id.as_ref(),
            self.subject_unique_id.as_ref(),
            self.extensions
                .as_ref()
                .map(|e| encode::Constructed::new(Tag::CTX_3, encode::sequence(e))),
        ))
    }

    /// The DER encoding of this structure, i.e. the bytes to be signed.
    ///
    /// For a decoded instance this equals [Self::raw_data].
    pub fn encode_der(&self) -> Vec<u8> {
        self.encode_ref().to_captured(Mode::Der).to_vec()
    }

    /// Decode the signature algorithm declared inside the signed body.
    pub fn decode_signature(&self) -> Result<AlgorithmIdentifier, DecodeError<Infallible>> {
        self.signature.clone().decode(AlgorithmIdentifier::take_from)
    }

    pub fn decode_issuer(&self) -> Result<Name, DecodeError<Infallible>> {
        self.issuer.clone().decode(Name::take_from)
    }

    pub fn decode_subject(&self) -> Result<Name, DecodeError<Infallible>> {
        self.subject.clone().decode(Name::take_from)
    }

    pub fn decode_validity(&self) -> Result<Validity, DecodeError<Infallible>> {
        self.validity.clone().decode(Validity::take_from)
    }

    pub fn decode_subject_public_key_info(
        &self,
    ) -> Result<SubjectPublicKeyInfo, DecodeError<Infallible>> {
        self.subject_public_key_info
            .clone()
            .decode(SubjectPublicKeyInfo::take_from)
    }
}

/// Encode each field of a value-level TBS certificate.
impl From<&TbsCertificate> for RawTbsCertificate {
    fn from(tbs: &TbsCertificate) -> Self {
        Self {
            version: tbs
                .version
                .map(|v| encode::Constructed::new(Tag::CTX_0, v.encode()).to_captured(Mode::Der)),
            serial_number: tbs.serial_number.clone(),
            signature: tbs.signature.encode_ref().to_captured(Mode::Der),
            issuer: tbs.issuer.encode_ref().to_captured(Mode::Der),
            validity: tbs.validity.encode_ref().to_captured(Mode::Der),
            subject: tbs.subject.encode_ref().to_captured(Mode::Der),
            subject_public_key_info: tbs.subject_public_key_info.encode_ref().to_captured(Mode::Der),
            issuer_unique_id: tbs
                .issuer_unique_id
                .as_ref()
                .map(|id| id.encode_ref_as(Tag::CTX_1).to_captured(Mode::Der)),
            subject_unique_id: tbs
                .subject_unique_id
                .as_ref()
                .map(|id| id.encode_ref_as(Tag::CTX_2).to_captured(Mode::Der)),
            extensions: tbs.extensions.as_ref().map(|extensions| {
                extensions
                    .iter()
                    .map(|extension| extension.encode_ref().to_captured(Mode::Der))
                    .collect()
            }),
            raw_data: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{testutil::*, X509Certificate},
    };

    #[test]
    fn reencode_is_identity() {
        let der = unit_tester_certificate_der();
        let cert = RawCertificate::from_der(der.clone()).unwrap();

        assert_eq!(cert.encode_der(), der);
        assert!(cert.tbs_certificate.version.is_some());
        assert!(cert.tbs_certificate.issuer_unique_id.is_none());
        assert_eq!(cert.tbs_certificate.extensions.as_ref().map(|e| e.len()), Some(3));
        assert_eq!(
            cert.tbs_certificate.raw_data.to_vec(),
            cert.tbs_certificate.encode_der()
        );
    }

    #[test]
    fn decode_captured_fields() {
        let cert = RawCertificate::from_der(unit_tester_certificate_der()).unwrap();
        let tbs = &cert.tbs_certificate;

        assert_eq!(
            tbs.decode_subject().unwrap().common_name().unwrap().as_deref(),
            Some("Unit Tester")
        );
        assert_eq!(tbs.decode_issuer().unwrap(), tbs.decode_subject().unwrap());
        assert_eq!(
            tbs.decode_signature().unwrap(),
            cert.decode_signature_algorithm().unwrap()
        );
        assert!(tbs.decode_validity().is_ok());
        assert!(tbs.decode_subject_public_key_info().is_ok());
    }

    #[test]
    fn subject_matches_issuer_for_self_signed() {
        let cert = RawCertificate::from_der(unit_tester_certificate_der()).unwrap();

        assert_eq!(
            cert.tbs_certificate.issuer.as_slice(),
            cert.subject().as_slice()
        );
    }

    #[test]
    fn trailing_data_rejected() {
        let mut der = unit_tester_certificate_der();
        der.push(0);

        assert!(RawCertificate::from_der(der).is_err());
    }

    #[test]
    fn truncated_data_rejected() {
        let der = unit_tester_certificate_der();

        assert!(RawCertificate::from_der(der[0..der.len() - 1].to_vec()).is_err());
        assert!(RawCertificate::from_der(Vec::new()).is_err());
        assert!(RawCertificate::from_der(b"\x04\x00".to_vec()).is_err());
    }

    #[test]
    fn encoded_values_match_value_encoding() {
        let der = unit_tester_certificate_der();
        let value = X509Certificate::from_der(&der).unwrap();
        let tbs = &value.as_ref().tbs_certificate;

        let raw = RawTbsCertificate::from(tbs);
        assert_eq!(raw.encode_der(), tbs.raw_data.clone().unwrap());
    }

    #[test]
    fn unique_identifiers_preserved() {
        let der = certificate_with_unique_ids_der();
        let cert = RawCertificate::from_der(der.clone()).unwrap();

        assert_eq!(
            cert.tbs_certificate.issuer_unique_id.as_ref().map(|c| c.to_vec()),
            Some(b"\x81\x02\x00\xaa".to_vec())
        );
        assert_eq!(
            cert.tbs_certificate.subject_unique_id.as_ref().map(|c| c.to_vec()),
            Some(b"\x82\x02\x00\xbb".to_vec())
        );
        assert!(cert.tbs_certificate.extensions.is_none());
        assert_eq!(cert.encode_der(), der);
    }
}
