// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Private key containers inspected when loading signing keys.
//!
//! Only the fields needed to pick a ring key constructor are decoded. The
//! key material itself is handed to ring.

use {
    crate::rfc5280::AlgorithmIdentifier,
    bcder::{
        decode::{Constructed, DecodeError, Source},
        BitString, Integer, Oid, OctetString, Tag,
    },
};

/// A PKCS#8 private key.
///
/// ```ASN.1
/// OneAsymmetricKey ::= SEQUENCE {
///   version                   Version,
///   privateKeyAlgorithm       PrivateKeyAlgorithmIdentifier,
///   privateKey                PrivateKey,
///   attributes            [0] Attributes OPTIONAL,
///   ...,
///   [[2: publicKey        [1] PublicKey OPTIONAL ]],
///   ...
/// }
/// ```
///
/// Attributes and the public key are skipped.
#[derive(Clone, Debug)]
pub struct Pkcs8PrivateKey {
    pub algorithm: AlgorithmIdentifier,
    pub private_key: OctetString,
}

impl Pkcs8PrivateKey {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            match cons.take_primitive_if(Tag::INTEGER, Integer::i8_from_primitive)? {
                0 | 1 => {}
                _ => return Err(cons.content_err("unexpected PKCS#8 version")),
            }

            let algorithm = AlgorithmIdentifier::take_from(cons)?;
            let private_key = OctetString::take_from(cons)?;
            cons.skip_all()?;

            Ok(Self {
                algorithm,
                private_key,
            })
        })
    }
}

/// An elliptic curve private key as written by OpenSSL under an
/// `EC PRIVATE KEY` PEM label.
///
/// ```ASN.1
/// ECPrivateKey ::= SEQUENCE {
///   version        INTEGER { ecPrivkeyVer1(1) } (ecPrivkeyVer1),
///   privateKey     OCTET STRING,
///   parameters [0] ECParameters {{ NamedCurve }} OPTIONAL,
///   publicKey  [1] BIT STRING OPTIONAL
/// }
/// ```
///
/// Only the `namedCurve` arm of `ECParameters` is accepted.
#[derive(Clone, Debug)]
pub struct EcPrivateKey {
    pub private_key: OctetString,
    pub named_curve: Option<Oid>,
    pub public_key: Option<BitString>,
}

impl EcPrivateKey {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            if cons.take_primitive_if(Tag::INTEGER, Integer::i8_from_primitive)? != 1 {
                return Err(cons.content_err("unexpected ECPrivateKey version"));
            }

            let private_key = OctetString::take_from(cons)?;
            let named_curve = cons.take_opt_constructed_if(Tag::CTX_0, Oid::take_from)?;
            let public_key = cons.take_opt_constructed_if(Tag::CTX_1, BitString::take_from)?;

            Ok(Self {
                private_key,
                named_curve,
                public_key,
            })
        })
    }
}
