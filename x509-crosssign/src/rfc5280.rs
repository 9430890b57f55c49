// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 types defined in RFC 5280.

use {
    crate::{asn1time::*, rfc3280::*},
    bcder::{
        decode::{BytesSource, Constructed, DecodeError, IntoSource, Source},
        encode,
        encode::{PrimitiveContent, Values},
        BitString, Captured, ConstOid, Integer, Mode, OctetString, Oid, Tag, Unsigned,
    },
    bytes::Bytes,
    std::io::Write,
};

/// Subject key identifier extension.
///
/// 2.5.29.14
pub const OID_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);

/// Key usage extension.
///
/// 2.5.29.15
pub const OID_KEY_USAGE: ConstOid = Oid(&[85, 29, 15]);

/// Basic constraints extension.
///
/// 2.5.29.19
pub const OID_BASIC_CONSTRAINTS: ConstOid = Oid(&[85, 29, 19]);

/// Name constraints extension.
///
/// 2.5.29.30
pub const OID_NAME_CONSTRAINTS: ConstOid = Oid(&[85, 29, 30]);

/// Authority key identifier extension.
///
/// 2.5.29.35
pub const OID_AUTHORITY_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 35]);

/// Algorithm identifier.
///
/// ```ASN.1
/// AlgorithmIdentifier  ::=  SEQUENCE  {
///   algorithm               OBJECT IDENTIFIER,
///   parameters              ANY DEFINED BY algorithm OPTIONAL  }
/// ```
///
/// Parameters are kept exactly as encoded. An absent field and an explicit
/// `NULL` are distinct values and encode differently.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlgorithmIdentifier {
    pub algorithm: Oid,
    pub parameters: Option<AlgorithmParameter>,
}

impl AlgorithmIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let algorithm = Oid::take_from(cons)?;
            let parameters = cons.capture_all()?;

            Ok(Self {
                algorithm,
                parameters: if parameters.is_empty() {
                    None
                } else {
                    Some(AlgorithmParameter(parameters))
                },
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((self.algorithm.encode_ref(), self.parameters.as_ref()))
    }
}

impl Values for AlgorithmIdentifier {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// Encoded algorithm parameters, compared by their bytes.
#[derive(Clone, Debug)]
pub struct AlgorithmParameter(Captured);

impl AlgorithmParameter {
    /// Construct a new instance consisting of a single OID.
    pub fn from_oid(oid: Oid) -> Self {
        Self(Captured::from_values(Mode::Der, oid.encode()))
    }

    /// Construct a new instance holding an ASN.1 `NULL`.
    pub fn null() -> Self {
        Self(Captured::from_values(Mode::Der, ().encode_as(Tag::NULL)))
    }

    /// Attempt to decode a single OID from the captured value.
    pub fn decode_oid(&self) -> Result<Oid, DecodeError<<BytesSource as Source>::Error>> {
        self.0.clone().decode(|cons| Oid::take_from(cons))
    }
}

impl PartialEq for AlgorithmParameter {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for AlgorithmParameter {}

impl Values for AlgorithmParameter {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.0.encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.0.write_encoded(mode, target)
    }
}

/// An X.509 certificate.
///
/// This is the fully interpreted form of a certificate. Use it to inspect or
/// to build certificates. Code which must not alter any byte of an existing
/// certificate should use [crate::raw::RawCertificate] instead.
///
/// ```ASN.1
/// Certificate  ::=  SEQUENCE  {
///   tbsCertificate       TBSCertificate,
///   signatureAlgorithm   AlgorithmIdentifier,
///   signature            BIT STRING  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Certificate {
    pub tbs_certificate: TbsCertificate,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature: BitString,
}

impl Certificate {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(Self {
                tbs_certificate: TbsCertificate::take_from(cons)?,
                signature_algorithm: AlgorithmIdentifier::take_from(cons)?,
                signature: BitString::take_from(cons)?,
            })
        })
    }

    /// Iterate over extensions defined on this certificate.
    pub fn iter_extensions(&self) -> impl Iterator<Item = &Extension> {
        self.tbs_certificate
            .extensions
            .iter()
            .flat_map(|x| x.iter())
    }
}

/// TBS Certificate.
///
/// This holds most of the metadata within an X.509 certificate.
///
/// ```ASN.1
/// TBSCertificate  ::=  SEQUENCE  {
///      version         [0]  Version DEFAULT v1,
///      serialNumber         CertificateSerialNumber,
///      signature            AlgorithmIdentifier,
///      issuer               Name,
///      validity             Validity,
///      subject              Name,
///      subjectPublicKeyInfo SubjectPublicKeyInfo,
///      issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///                           -- If present, version MUST be v2 or v3
///      subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///                           -- If present, version MUST be v2 or v3
///      extensions      [3]  Extensions OPTIONAL
///                           -- If present, version MUST be v3 --  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TbsCertificate {
    pub version: Option<Version>,
    pub serial_number: Integer,
    pub signature: AlgorithmIdentifier,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfo,
    pub issuer_unique_id: Option<BitString>,
    pub subject_unique_id: Option<BitString>,
    pub extensions: Option<Extensions>,

    /// The encoding this instance was decoded from, which is what the
    /// issuer signed.
    pub raw_data: Option<Vec<u8>>,
}

impl TbsCertificate {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let mut res = None;

        let captured = cons.capture(|cons| {
            cons.take_sequence(|cons| {
                let version = cons.take_opt_constructed_if(Tag::CTX_0, Version::take_from)?;
                let serial_number = Integer::take_from(cons)?;
                let signature = AlgorithmIdentifier::take_from(cons)?;
                let issuer = Name::take_from(cons)?;
                let validity = Validity::take_from(cons)?;
                let subject = Name::take_from(cons)?;
                let subject_public_key_info = SubjectPublicKeyInfo::take_from(cons)?;
                let issuer_unique_id =
                    cons.take_opt_value_if(Tag::CTX_1, BitString::from_content)?;
                let subject_unique_id =
                    cons.take_opt_value_if(Tag::CTX_2, BitString::from_content)?;
                let extensions = cons.take_opt_constructed_if(Tag::CTX_3, |cons| {
                    cons.take_sequence(|cons| {
                        let mut extensions = Vec::new();
                        while let Some(extension) = Extension::take_opt_from(cons)? {
                            extensions.push(extension);
                        }
                        Ok(extensions)
                    })
                })?;

                res = Some(Self {
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
                    raw_data: None,
                });

                Ok(())
            })
        })?;

        let mut res = res.ok_or_else(|| cons.content_err("missing TBSCertificate"))?;
        res.raw_data = Some(captured.to_vec());

        Ok(res)
    }
}

/// `Version ::= INTEGER { v1(0), v2(1), v3(2) }`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Version {
    V1 = 0,
    V2 = 1,
    V3 = 2,
}

impl Version {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        match cons.take_primitive_if(Tag::INTEGER, Integer::i8_from_primitive)? {
            0 => Ok(Self::V1),
            1 => Ok(Self::V2),
            2 => Ok(Self::V3),
            _ => Err(cons.content_err("unexpected Version value")),
        }
    }

    pub fn encode(self) -> impl Values {
        u8::from(self).encode()
    }
}

impl From<Version> for u8 {
    fn from(v: Version) -> Self {
        match v {
            Version::V1 => 0,
            Version::V2 => 1,
            Version::V3 => 2,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Validity {
    pub not_before: Time,
    pub not_after: Time,
}

impl Validity {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let not_before = Time::take_from(cons)?;
            let not_after = Time::take_from(cons)?;

            Ok(Self {
                not_before,
                not_after,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((self.not_before.encode_ref(), self.not_after.encode_ref()))
    }
}

/// Subject public key info.
///
/// ```ASN.1
/// SubjectPublicKeyInfo  ::=  SEQUENCE  {
///   algorithm            AlgorithmIdentifier,
///   subjectPublicKey     BIT STRING  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: AlgorithmIdentifier,
    pub subject_public_key: BitString,
}

impl SubjectPublicKeyInfo {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let algorithm = AlgorithmIdentifier::take_from(cons)?;
            let subject_public_key = BitString::take_from(cons)?;

            Ok(Self {
                algorithm,
                subject_public_key,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((&self.algorithm, self.subject_public_key.encode_ref()))
    }
}

/// ```ASN.1
/// Extensions  ::=  SEQUENCE SIZE (1..MAX) OF Extension
/// ```
pub type Extensions = Vec<Extension>;

/// Extension.
///
/// ```ASN.1
/// Extension  ::=  SEQUENCE  {
///      extnID      OBJECT IDENTIFIER,
///      critical    BOOLEAN DEFAULT FALSE,
///      extnValue   OCTET STRING
///                  -- contains the DER encoding of an ASN.1 value
///                  -- corresponding to the extension type identified
///                  -- by extnID
///      }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extension {
    pub id: Oid,
    pub critical: Option<bool>,
    pub value: OctetString,
}

impl Extension {
    /// Construct an extension from an OID and a value to encode as DER.
    pub fn new(id: ConstOid, critical: bool, value: impl Values) -> Self {
        Self {
            id: Oid(Bytes::copy_from_slice(id.as_ref())),
            critical: Some(critical),
            value: OctetString::new(value.to_captured(Mode::Der).into_bytes()),
        }
    }

    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            Ok(Self {
                id: Oid::take_from(cons)?,
                critical: cons.take_opt_bool()?,
                value: OctetString::take_from(cons)?,
            })
        })
    }

    /// Encode the extension, omitting `critical` unless it is TRUE.
    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.id.encode_ref(),
            if self.critical == Some(true) {
                Some(true.encode())
            } else {
                None
            },
            self.value.encode_ref(),
        ))
    }

    /// Whether the extension is marked critical.
    pub fn is_critical(&self) -> bool {
        self.critical == Some(true)
    }

    /// Decode the inner value of this extension with a function.
    ///
    /// The entire value must be consumed by `op`.
    pub fn decode_value<F, T>(&self, op: F) -> Result<T, DecodeError<<BytesSource as Source>::Error>>
    where
        F: FnOnce(&mut Constructed<BytesSource>) -> Result<T, DecodeError<<BytesSource as Source>::Error>>,
    {
        Constructed::decode(self.value.to_bytes().into_source(), Mode::Der, op)
    }
}

impl Values for Extension {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// Basic constraints.
///
/// ```ASN.1
/// BasicConstraints ::= SEQUENCE {
///      cA                      BOOLEAN DEFAULT FALSE,
///      pathLenConstraint       INTEGER (0..MAX) OPTIONAL }
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len_constraint: Option<u32>,
}

impl BasicConstraints {
    /// Constraints for a certificate authority without a path length limit.
    pub fn ca() -> Self {
        Self {
            ca: true,
            path_len_constraint: None,
        }
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let ca = cons.take_opt_bool()?.unwrap_or(false);
            let path_len_constraint =
                cons.take_opt_primitive_if(Tag::INTEGER, Unsigned::u32_from_primitive)?;

            Ok(Self {
                ca,
                path_len_constraint,
            })
        })
    }

    pub fn encode(self) -> impl Values {
        encode::sequence((
            if self.ca { Some(true.encode()) } else { None },
            self.path_len_constraint.map(|v| v.encode()),
        ))
    }
}

/// A named bit of the key usage extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyUsageFlag {
    DigitalSignature = 0,
    NonRepudiation = 1,
    KeyEncipherment = 2,
    DataEncipherment = 3,
    KeyAgreement = 4,
    KeyCertSign = 5,
    CrlSign = 6,
    EncipherOnly = 7,
    DecipherOnly = 8,
}

/// Key usage.
///
/// ```ASN.1
/// KeyUsage ::= BIT STRING {
///      digitalSignature        (0),
///      nonRepudiation          (1), -- recent editions of X.509 have
///                           -- renamed this bit to contentCommitment
///      keyEncipherment         (2),
///      dataEncipherment        (3),
///      keyAgreement            (4),
///      keyCertSign             (5),
///      cRLSign                 (6),
///      encipherOnly            (7),
///      decipherOnly            (8) }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyUsage(BitString);

impl KeyUsage {
    /// Construct an instance having the given bits set.
    ///
    /// Trailing zero bits are dropped, as DER requires for named bit lists.
    pub fn from_flags(flags: impl IntoIterator<Item = KeyUsageFlag>) -> Self {
        let mut value = 0u16;
        for flag in flags {
            value |= 0x8000 >> (flag as u16);
        }

        if value == 0 {
            return Self(BitString::new(0, Bytes::new()));
        }

        let last_bit = 15 - value.trailing_zeros() as usize;
        let octets = value.to_be_bytes();

        Self(BitString::new(
            (7 - last_bit % 8) as u8,
            Bytes::copy_from_slice(&octets[..last_bit / 8 + 1]),
        ))
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        Ok(Self(BitString::take_from(cons)?))
    }

    /// Whether a given usage is asserted.
    pub fn contains(&self, flag: KeyUsageFlag) -> bool {
        self.0.bit(flag as usize)
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        self.0.encode_ref()
    }
}

/// Name constraints.
///
/// ```ASN.1
/// NameConstraints ::= SEQUENCE {
///      permittedSubtrees       [0]     GeneralSubtrees OPTIONAL,
///      excludedSubtrees        [1]     GeneralSubtrees OPTIONAL }
///
/// GeneralSubtrees ::= SEQUENCE SIZE (1..MAX) OF GeneralSubtree
/// ```
///
/// The module is tagged IMPLICIT, so each context tag replaces the
/// `SEQUENCE` tag of the subtree list.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NameConstraints {
    pub permitted_subtrees: Option<Vec<GeneralSubtree>>,
    pub excluded_subtrees: Option<Vec<GeneralSubtree>>,
}

impl NameConstraints {
    /// Constraints excluding a single DNS subtree and permitting everything else.
    pub fn exclude_dns_name(name: &str) -> Result<Self, bcder::string::CharSetError> {
        Ok(Self {
            permitted_subtrees: None,
            excluded_subtrees: Some(vec![GeneralSubtree::new(GeneralName::dns_name(name)?)]),
        })
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let permitted_subtrees =
                cons.take_opt_constructed_if(Tag::CTX_0, GeneralSubtree::take_all)?;
            let excluded_subtrees =
                cons.take_opt_constructed_if(Tag::CTX_1, GeneralSubtree::take_all)?;

            Ok(Self {
                permitted_subtrees,
                excluded_subtrees,
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.permitted_subtrees
                .as_ref()
                .map(|subtrees| encode::sequence_as(Tag::CTX_0, subtrees)),
            self.excluded_subtrees
                .as_ref()
                .map(|subtrees| encode::sequence_as(Tag::CTX_1, subtrees)),
        ))
    }
}

/// General subtree.
///
/// ```ASN.1
/// GeneralSubtree ::= SEQUENCE {
///      base                    GeneralName,
///      minimum         [0]     BaseDistance DEFAULT 0,
///      maximum         [1]     BaseDistance OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralSubtree {
    pub base: GeneralName,
    pub minimum: u32,
    pub maximum: Option<u32>,
}

impl GeneralSubtree {
    pub fn new(base: GeneralName) -> Self {
        Self {
            base,
            minimum: 0,
            maximum: None,
        }
    }

    fn take_all<S: Source>(cons: &mut Constructed<S>) -> Result<Vec<Self>, DecodeError<S::Error>> {
        let mut subtrees = Vec::new();

        while let Some(subtree) = cons.take_opt_sequence(|cons| {
            let base = GeneralName::take_from(cons)?;
            let minimum = cons
                .take_opt_primitive_if(Tag::CTX_0, Unsigned::u32_from_primitive)?
                .unwrap_or(0);
            let maximum = cons.take_opt_primitive_if(Tag::CTX_1, Unsigned::u32_from_primitive)?;

            Ok(Self {
                base,
                minimum,
                maximum,
            })
        })? {
            subtrees.push(subtree);
        }

        Ok(subtrees)
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.base.encode_ref(),
            if self.minimum != 0 {
                Some(self.minimum.encode_as(Tag::CTX_0))
            } else {
                None
            },
            self.maximum.map(|v| v.encode_as(Tag::CTX_1)),
        ))
    }
}

impl Values for GeneralSubtree {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// Subject key identifier.
///
/// ```ASN.1
/// SubjectKeyIdentifier ::= KeyIdentifier
///
/// KeyIdentifier ::= OCTET STRING
/// ```
pub type SubjectKeyIdentifier = OctetString;

/// Authority key identifier.
///
/// ```ASN.1
/// AuthorityKeyIdentifier ::= SEQUENCE {
///     keyIdentifier             [0] KeyIdentifier           OPTIONAL,
///     authorityCertIssuer       [1] GeneralNames            OPTIONAL,
///     authorityCertSerialNumber [2] CertificateSerialNumber OPTIONAL  }
/// ```
///
/// Only the key identifier is interpreted. The other fields are retained as
/// encoded.
#[derive(Clone, Debug, Default)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Option<OctetString>,
    pub other: Option<Captured>,
}

impl AuthorityKeyIdentifier {
    pub fn from_key_identifier(key_identifier: OctetString) -> Self {
        Self {
            key_identifier: Some(key_identifier),
            other: None,
        }
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let key_identifier = cons.take_opt_value_if(Tag::CTX_0, OctetString::from_content)?;
            let other = cons.capture_all()?;

            Ok(Self {
                key_identifier,
                other: if other.is_empty() { None } else { Some(other) },
            })
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence((
            self.key_identifier
                .as_ref()
                .map(|id| id.encode_ref_as(Tag::CTX_0)),
            self.other.as_ref(),
        ))
    }
}
