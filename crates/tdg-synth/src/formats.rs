//! Values for `format`-annotated strings

use crate::vocab;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use rand::Rng;
use std::net::{Ipv4Addr, Ipv6Addr};

/// 2020-01-01T00:00:00Z
const EPOCH_2020: i64 = 1_577_836_800;

/// Five years of seconds
const SPAN_SECS: i64 = 5 * 365 * 24 * 3600;

/// Generate a value for `format`, or `None` for unknown formats
pub fn generate<R: Rng + ?Sized>(format: &str, rng: &mut R) -> Option<String> {
    let value = match format {
        "date" => date(rng),
        "date-time" => date_time(rng),
        "time" => time(rng),
        "email" | "idn-email" => vocab::email(rng),
        "hostname" | "idn-hostname" => vocab::hostname(rng),
        "ipv4" => Ipv4Addr::new(
            rng.gen_range(1..=223),
            rng.gen(),
            rng.gen(),
            rng.gen_range(1..=254),
        )
        .to_string(),
        "ipv6" => {
            let segments: [u16; 8] = rng.gen();
            Ipv6Addr::new(
                0x2001,
                0x0db8,
                segments[2],
                segments[3],
                segments[4],
                segments[5],
                segments[6],
                segments[7],
            )
            .to_string()
        }
        "uri" | "url" | "iri" | "uri-reference" => {
            format!("https://{}/{}", vocab::hostname(rng), vocab::word(rng))
        }
        "uuid" => uuid::Builder::from_random_bytes(rng.gen())
            .into_uuid()
            .to_string(),
        "password" => password(rng),
        "byte" => {
            let len = rng.gen_range(8..24);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            base64::engine::general_purpose::STANDARD.encode(bytes)
        }
        "phone" => vocab::phone(rng),
        _ => return None,
    };
    Some(value)
}

/// An invalid value for `format`, or `None` when any string would do
#[must_use]
pub fn invalid(format: &str) -> Option<&'static str> {
    match format {
        "date" => Some("2023-13-45"),
        "date-time" => Some("not-a-date-time"),
        "time" => Some("25:61:00"),
        "email" | "idn-email" => Some("not-an-email"),
        "ipv4" => Some("999.1.1.1"),
        "ipv6" => Some("not:an:ipv6"),
        "uri" | "url" | "iri" => Some("not a uri"),
        "uuid" => Some("not-a-uuid"),
        "hostname" | "idn-hostname" => Some("-invalid-.host-"),
        _ => None,
    }
}

fn date<R: Rng + ?Sized>(rng: &mut R) -> String {
    let day = rng.gen_range(0..(SPAN_SECS / 86_400));
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.checked_add_days(chrono::Days::new(day.unsigned_abs())))
        .map_or_else(|| "2020-01-01".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

fn date_time<R: Rng + ?Sized>(rng: &mut R) -> String {
    let secs = EPOCH_2020 + rng.gen_range(0..SPAN_SECS);
    DateTime::from_timestamp(secs, 0).map_or_else(
        || "2020-01-01T00:00:00Z".to_string(),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn time<R: Rng + ?Sized>(rng: &mut R) -> String {
    NaiveTime::from_num_seconds_from_midnight_opt(rng.gen_range(0..86_400), 0)
        .map_or_else(|| "00:00:00".to_string(), |t| t.format("%H:%M:%S").to_string())
}

fn password<R: Rng + ?Sized>(rng: &mut R) -> String {
    const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
    const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"23456789";
    const SYMBOLS: &[u8] = b"!@#$%^&*";
    let classes = [LOWER, UPPER, DIGITS, SYMBOLS];
    (0..12)
        .map(|i| {
            let class = classes[i % classes.len()];
            char::from(class[rng.gen_range(0..class.len())])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_known_formats_parse_back() {
        let mut rng = StdRng::seed_from_u64(42);
        let date = generate("date", &mut rng).unwrap();
        assert!(NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
        let dt = generate("date-time", &mut rng).unwrap();
        assert!(DateTime::parse_from_rfc3339(&dt).is_ok());
        let ip = generate("ipv4", &mut rng).unwrap();
        assert!(ip.parse::<Ipv4Addr>().is_ok());
        let ip = generate("ipv6", &mut rng).unwrap();
        assert!(ip.parse::<Ipv6Addr>().is_ok());
        let id = generate("uuid", &mut rng).unwrap();
        assert_eq!(uuid::Uuid::parse_str(&id).unwrap().get_version_num(), 4);
        let bytes = generate("byte", &mut rng).unwrap();
        assert!(base64::engine::general_purpose::STANDARD.decode(bytes).is_ok());
        assert_eq!(generate("password", &mut rng).unwrap().len(), 12);
    }

    #[test]
    fn test_unknown_format() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate("x-custom", &mut rng).is_none());
        assert!(invalid("x-custom").is_none());
        assert_eq!(invalid("email"), Some("not-an-email"));
    }
}
