// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 types defined in RFC 3280, with the attribute types of RFC 4519
//! this crate reads and writes.

use {
    bcder::{
        decode::{Constructed, DecodeError, Source},
        encode,
        encode::{PrimitiveContent, Values},
        string::{CharSetError, Ia5String, PrintableString, Utf8String},
        Captured, ConstOid, Mode, OctetString, Oid, Tag,
    },
    bytes::Bytes,
    std::{
        convert::Infallible,
        fmt::{Debug, Formatter},
        io::Write,
        str::FromStr,
    },
};

/// commonName (2.5.4.3)
pub const OID_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]);

/// serialNumber (2.5.4.5)
pub const OID_SERIAL_NUMBER: ConstOid = Oid(&[85, 4, 5]);

/// countryName (2.5.4.6)
pub const OID_COUNTRY_NAME: ConstOid = Oid(&[85, 4, 6]);

/// organizationName (2.5.4.10)
pub const OID_ORGANIZATION_NAME: ConstOid = Oid(&[85, 4, 10]);

/// General name.
///
/// ```ASN.1
/// GeneralName ::= CHOICE {
///   otherName                       [0]     AnotherName,
///   rfc822Name                      [1]     IA5String,
///   dNSName                         [2]     IA5String,
///   x400Address                     [3]     ORAddress,
///   directoryName                   [4]     Name,
///   ediPartyName                    [5]     EDIPartyName,
///   uniformResourceIdentifier       [6]     IA5String,
///   iPAddress                       [7]     OCTET STRING,
///   registeredID                    [8]     OBJECT IDENTIFIER }
/// ```
///
/// The module is tagged IMPLICIT, except `directoryName`, which is a CHOICE
/// and therefore always explicitly tagged. Arms this crate never interprets
/// (`otherName`, `x400Address`, `ediPartyName`) are retained as captured
/// values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GeneralName {
    Rfc822Name(Ia5String),
    DnsName(Ia5String),
    DirectoryName(Name),
    UniformResourceIdentifier(Ia5String),
    IpAddress(OctetString),
    RegisteredId(Oid),
    Other(OpaqueGeneralName),
}

impl GeneralName {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        if let Some(name) = cons.take_opt_value_if(Tag::CTX_1, Ia5String::from_content)? {
            Ok(Some(Self::Rfc822Name(name)))
        } else if let Some(name) = cons.take_opt_value_if(Tag::CTX_2, Ia5String::from_content)? {
            Ok(Some(Self::DnsName(name)))
        } else if let Some(name) = cons.take_opt_constructed_if(Tag::CTX_4, Name::take_from)? {
            Ok(Some(Self::DirectoryName(name)))
        } else if let Some(name) = cons.take_opt_value_if(Tag::CTX_6, Ia5String::from_content)? {
            Ok(Some(Self::UniformResourceIdentifier(name)))
        } else if let Some(address) =
            cons.take_opt_value_if(Tag::ctx(7), OctetString::from_content)?
        {
            Ok(Some(Self::IpAddress(address)))
        } else if let Some(oid) = cons.take_opt_primitive_if(Tag::ctx(8), Oid::from_primitive)? {
            Ok(Some(Self::RegisteredId(oid)))
        } else {
            let captured = cons.capture(|cons| {
                for tag in [Tag::CTX_0, Tag::CTX_3, Tag::CTX_5] {
                    if cons.take_opt_constructed_if(tag, |cons| cons.skip_all())?.is_some() {
                        break;
                    }
                }

                Ok(())
            })?;

            if captured.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Self::Other(OpaqueGeneralName(captured))))
            }
        }
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        match Self::take_opt_from(cons)? {
            Some(name) => Ok(name),
            None => Err(cons.content_err("unexpected GeneralName variant")),
        }
    }

    /// Construct a `dNSName` from a Rust string.
    pub fn dns_name(name: &str) -> Result<Self, CharSetError> {
        Ok(Self::DnsName(Ia5String::from_str(name)?))
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::Rfc822Name(name) => (
                Some(name.encode_ref_as(Tag::CTX_1)),
                None,
                None,
                None,
                None,
                None,
                None,
            ),
            Self::DnsName(name) => (
                None,
                Some(name.encode_ref_as(Tag::CTX_2)),
                None,
                None,
                None,
                None,
                None,
            ),
            Self::DirectoryName(name) => (
                None,
                None,
                Some(encode::Constructed::new(Tag::CTX_4, name.encode_ref())),
                None,
                None,
                None,
                None,
            ),
            Self::UniformResourceIdentifier(name) => (
                None,
                None,
                None,
                Some(name.encode_ref_as(Tag::CTX_6)),
                None,
                None,
                None,
            ),
            Self::IpAddress(address) => (
                None,
                None,
                None,
                None,
                Some(address.encode_ref_as(Tag::ctx(7))),
                None,
                None,
            ),
            Self::RegisteredId(oid) => (
                None,
                None,
                None,
                None,
                None,
                Some(oid.encode_ref_as(Tag::ctx(8))),
                None,
            ),
            Self::Other(captured) => (None, None, None, None, None, None, Some(&captured.0)),
        }
    }
}

impl Values for GeneralName {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.encode_ref().encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.encode_ref().write_encoded(mode, target)
    }
}

/// A [GeneralName] arm retained as its encoded form.
#[derive(Clone)]
pub struct OpaqueGeneralName(Captured);

impl Debug for OpaqueGeneralName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}", hex::encode(self.0.as_slice())))
    }
}

impl PartialEq for OpaqueGeneralName {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Eq for OpaqueGeneralName {}

/// Name, restricted to its only defined arm, `rdnSequence`.
///
/// ```ASN.1
/// Name ::= CHOICE { rdnSequence  RDNSequence }
///
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
/// ```
///
/// Attribute values are kept as encoded. They are only interpreted when a
/// caller asks for one as a string.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Name(Vec<RelativeDistinguishedName>);

impl Name {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut rdns = Vec::new();

            while let Some(rdn) = RelativeDistinguishedName::take_opt_from(cons)? {
                rdns.push(rdn);
            }

            Ok(Self(rdns))
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::sequence(&self.0)
    }

    pub fn rdns(&self) -> &[RelativeDistinguishedName] {
        &self.0
    }

    /// Decode the first attribute of type `oid` as a string.
    pub fn attribute_string(&self, oid: ConstOid) -> Result<Option<String>, DecodeError<Infallible>> {
        self.0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .find(|atv| atv.typ == oid)
            .map(|atv| directory_string(&atv.value))
            .transpose()
    }

    /// Obtain the first Common Name (CN) as a Rust string.
    pub fn common_name(&self) -> Result<Option<String>, DecodeError<Infallible>> {
        self.attribute_string(OID_COMMON_NAME)
    }

    fn push_single(&mut self, oid: ConstOid, value: Captured) {
        self.0.push(RelativeDistinguishedName(vec![AttributeTypeAndValue {
            typ: Oid(Bytes::from_static(oid.0)),
            value,
        }]));
    }

    /// Append a PrintableString attribute in a new RDN.
    pub fn append_printable_string(&mut self, oid: ConstOid, value: &str) -> Result<(), CharSetError> {
        let value = PrintableString::from_str(value)?;
        self.push_single(oid, Captured::from_values(Mode::Der, value.encode_ref()));

        Ok(())
    }

    /// Append a UTF8String attribute in a new RDN.
    pub fn append_utf8_string(&mut self, oid: ConstOid, value: &str) -> Result<(), CharSetError> {
        let value = Utf8String::from_str(value)?;
        self.push_single(oid, Captured::from_values(Mode::Der, value.encode_ref()));

        Ok(())
    }

    pub fn append_common_name_utf8_string(&mut self, value: &str) -> Result<(), CharSetError> {
        self.append_utf8_string(OID_COMMON_NAME, value)
    }

    /// Append a serialNumber attribute, which X.520 defines as a PrintableString.
    pub fn append_serial_number_printable_string(
        &mut self,
        value: &str,
    ) -> Result<(), CharSetError> {
        self.append_printable_string(OID_SERIAL_NUMBER, value)
    }
}

/// `RelativeDistinguishedName ::= SET OF AttributeTypeAndValue`
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RelativeDistinguishedName(Vec<AttributeTypeAndValue>);

impl RelativeDistinguishedName {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_set(|cons| {
            let mut attributes = Vec::new();

            while let Some(atv) = cons.take_opt_sequence(|cons| {
                Ok(AttributeTypeAndValue {
                    typ: Oid::take_from(cons)?,
                    value: cons.capture_all()?,
                })
            })? {
                attributes.push(atv);
            }

            Ok(Self(attributes))
        })
    }
}

impl Values for RelativeDistinguishedName {
    fn encoded_len(&self, mode: Mode) -> usize {
        encode::set(&self.0).encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        encode::set(&self.0).write_encoded(mode, target)
    }
}

/// `AttributeTypeAndValue ::= SEQUENCE { type OBJECT IDENTIFIER, value ANY }`
#[derive(Clone)]
pub struct AttributeTypeAndValue {
    pub typ: Oid,
    pub value: Captured,
}

impl Debug for AttributeTypeAndValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.typ, hex::encode(self.value.as_slice()))
    }
}

impl PartialEq for AttributeTypeAndValue {
    fn eq(&self, other: &Self) -> bool {
        self.typ == other.typ && self.value.as_slice() == other.value.as_slice()
    }
}

impl Eq for AttributeTypeAndValue {}

impl Values for AttributeTypeAndValue {
    fn encoded_len(&self, mode: Mode) -> usize {
        encode::sequence((self.typ.encode_ref(), &self.value)).encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        encode::sequence((self.typ.encode_ref(), &self.value)).write_encoded(mode, target)
    }
}

/// Decode UTF-16BE (BMPString) or UTF-32BE (UniversalString) data.
fn decode_wide_string(data: &[u8], width: usize) -> Option<String> {
    if data.len() % width != 0 {
        return None;
    }

    if width == 2 {
        let units = data
            .chunks(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect::<Vec<_>>();

        String::from_utf16(&units).ok()
    } else {
        data.chunks(4)
            .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
            .collect()
    }
}

/// Interpret an encoded attribute value as a string.
///
/// All the string types allowed by `DirectoryString` are recognized, plus
/// IA5String, NumericString and VisibleString. TeletexString is read as
/// Latin-1, which is how it is used in practice.
fn directory_string(value: &Captured) -> Result<String, DecodeError<Infallible>> {
    value.clone().decode(|cons| {
        cons.take_value(|tag, content| {
            let data = OctetString::from_content(content)?.into_bytes();

            let value = if tag == Tag::UTF8_STRING {
                String::from_utf8(data.to_vec()).ok()
            } else if tag == Tag::PRINTABLE_STRING
                || tag == Tag::IA5_STRING
                || tag == Tag::NUMERIC_STRING
                || tag == Tag::VISIBLE_STRING
            {
                if data.is_ascii() {
                    String::from_utf8(data.to_vec()).ok()
                } else {
                    None
                }
            } else if tag == Tag::TELETEX_STRING {
                Some(data.iter().map(|b| char::from(*b)).collect())
            } else if tag == Tag::BMP_STRING {
                decode_wide_string(&data, 2)
            } else if tag == Tag::UNIVERSAL_STRING {
                decode_wide_string(&data, 4)
            } else {
                return Err(content.content_err("attribute value is not a string"));
            };

            value.ok_or_else(|| content.content_err("invalid characters in string attribute"))
        })
    })
}
