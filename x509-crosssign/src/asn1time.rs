// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 primitives related to time types.

use {
    bcder::{
        decode::{Constructed, DecodeError, Primitive, Source},
        encode::{PrimitiveContent, Values},
        Mode, Tag,
    },
    chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc},
    std::{io::Write, ops::Deref, str::FromStr},
};

/// Time.
///
/// ```ASN.1
/// Time ::= CHOICE {
///   utcTime        UTCTime,
///   generalTime    GeneralizedTime }
/// ```
///
/// The CHOICE arm is retained so a decoded value encodes back to the same
/// form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Time {
    UtcTime(UtcTime),
    GeneralTime(GeneralizedTime),
}

impl Time {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive(|tag, prim| {
            if tag == Tag::UTC_TIME {
                Ok(Self::UtcTime(UtcTime::from_primitive(prim)?))
            } else if tag == Tag::GENERALIZED_TIME {
                Ok(Self::GeneralTime(GeneralizedTime::from_primitive(prim)?))
            } else {
                Err(prim.content_err("expected UTCTime or GeneralizedTime"))
            }
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::UtcTime(utc) => (Some(utc.encode_ref()), None),
            Self::GeneralTime(gt) => (None, Some(gt.encode_ref())),
        }
    }

    /// The instant this value represents.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::UtcTime(t) => t.0,
            Self::GeneralTime(t) => t.0,
        }
    }
}

impl From<DateTime<Utc>> for Time {
    /// UTCTime is used through 2049, GeneralizedTime afterwards (RFC 5280 4.1.2.5).
    fn from(t: DateTime<Utc>) -> Self {
        if (1950..2050).contains(&t.year()) {
            Self::UtcTime(UtcTime(t))
        } else {
            Self::GeneralTime(GeneralizedTime(t))
        }
    }
}

/// Parse a run of ASCII digits.
fn parse_digits<T: FromStr>(data: &[u8]) -> Option<T> {
    if !data.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }

    T::from_str(std::str::from_utf8(data).ok()?).ok()
}

fn utc_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    Some(Utc.from_utc_datetime(&naive))
}

/// Parse `MMDDHHMMSSZ`, the part shared by both time encodings.
fn parse_after_year(year: i32, data: &[u8]) -> Option<DateTime<Utc>> {
    if data.len() != "MMDDHHMMSSZ".len() || data[10] != b'Z' {
        return None;
    }

    utc_datetime(
        year,
        parse_digits(&data[0..2])?,
        parse_digits(&data[2..4])?,
        parse_digits(&data[4..6])?,
        parse_digits(&data[6..8])?,
        parse_digits(&data[8..10])?,
    )
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralizedTime(DateTime<Utc>);

impl GeneralizedTime {
    pub fn from_primitive<S: Source>(
        prim: &mut Primitive<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let data = prim.take_all()?;

        Self::parse(data.as_ref()).ok_or_else(|| prim.content_err("invalid GeneralizedTime"))
    }

    /// Parse GeneralizedTime string data.
    ///
    /// Only the DER form `YYYYMMDDHHMMSSZ` is accepted.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() != "YYYYMMDDHHMMSSZ".len() {
            return None;
        }

        let year = parse_digits::<i32>(&data[0..4])?;

        Some(Self(parse_after_year(year, &data[4..])?))
    }
}

impl ToString for GeneralizedTime {
    fn to_string(&self) -> String {
        format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second(),
        )
    }
}

impl Deref for GeneralizedTime {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PrimitiveContent for GeneralizedTime {
    const TAG: Tag = Tag::GENERALIZED_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        self.to_string().len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UtcTime(DateTime<Utc>);

impl UtcTime {
    pub fn from_primitive<S: Source>(
        prim: &mut Primitive<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let data = prim.take_all()?;

        Self::parse(data.as_ref()).ok_or_else(|| prim.content_err("invalid UTCTime"))
    }

    /// Parse UTCTime string data of the form `YYMMDDHHMMSSZ`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() != "YYMMDDHHMMSSZ".len() {
            return None;
        }

        let year = parse_digits::<i32>(&data[0..2])?;
        let year = if year >= 50 { year + 1900 } else { year + 2000 };

        Some(Self(parse_after_year(year, &data[2..])?))
    }
}

impl ToString for UtcTime {
    fn to_string(&self) -> String {
        format!(
            "{:02}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year() % 100,
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

impl Deref for UtcTime {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PrimitiveContent for UtcTime {
    const TAG: Tag = Tag::UTC_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        self.to_string().len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}

#[cfg(test)]
mod test {
    use {super::*, bcder::encode::Values};

    fn encode(time: &Time) -> Vec<u8> {
        let mut buffer = Vec::new();
        time.encode_ref()
            .write_encoded(Mode::Der, &mut buffer)
            .unwrap();
        buffer
    }

    #[test]
    fn generalized_time() {
        let gt = GeneralizedTime::parse(b"20520129133742Z").unwrap();
        assert_eq!(gt.year(), 2052);
        assert_eq!(gt.month(), 1);
        assert_eq!(gt.day(), 29);
        assert_eq!(gt.hour(), 13);
        assert_eq!(gt.minute(), 37);
        assert_eq!(gt.second(), 42);
        assert_eq!(gt.to_string(), "20520129133742Z");

        // Fractional seconds and offsets are not DER.
        assert!(GeneralizedTime::parse(b"20220129133742.333Z").is_none());
        assert!(GeneralizedTime::parse(b"20220129133742-0800").is_none());
        assert!(GeneralizedTime::parse(b"20220129133742+1000").is_none());
    }

    #[test]
    fn generalized_time_invalid() {
        assert!(GeneralizedTime::parse(b"").is_none());
        assert!(GeneralizedTime::parse(b"abcd").is_none());
        assert!(GeneralizedTime::parse(b"20220130").is_none());
        assert!(GeneralizedTime::parse(b"20220130123015").is_none());
        assert!(GeneralizedTime::parse(b"20220130123015a").is_none());
        assert!(GeneralizedTime::parse(b"20221330123015Z").is_none());
        assert!(GeneralizedTime::parse(b"2022+130123015Z").is_none());
    }

    #[test]
    fn utc_time_century() {
        let t = UtcTime::parse(b"491231235959Z").unwrap();
        assert_eq!(t.year(), 2049);

        let t = UtcTime::parse(b"500101000000Z").unwrap();
        assert_eq!(t.year(), 1950);
        assert_eq!(t.to_string(), "500101000000Z");

        assert!(UtcTime::parse(b"5001010000Z").is_none());
        assert!(UtcTime::parse(b"500101000000+0100").is_none());
    }

    #[test]
    fn from_datetime_picks_encoding() {
        let t = Time::from(Utc.with_ymd_and_hms(2049, 12, 31, 23, 59, 59).unwrap());
        assert!(matches!(t, Time::UtcTime(_)));
        assert_eq!(encode(&t), b"\x17\x0d491231235959Z");

        let t = Time::from(Utc.with_ymd_and_hms(2050, 1, 1, 0, 0, 0).unwrap());
        assert!(matches!(t, Time::GeneralTime(_)));
        assert_eq!(encode(&t), b"\x18\x0f20500101000000Z");
    }

    #[test]
    fn decode_preserves_choice() {
        let der = b"\x18\x0f20300101000000Z";
        let t = bcder::decode::Constructed::decode(&der[..], Mode::Der, Time::take_from)
            .unwrap();
        assert!(matches!(t, Time::GeneralTime(_)));
        assert_eq!(encode(&t), der.to_vec());
        assert_eq!(
            t.to_datetime(),
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
