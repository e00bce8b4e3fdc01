//! Generators for well-known string `format` tags

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use fake::faker::address::en::{
    CityName, CountryCode, CountryName, PostCode, StateAbbr, StreetName, TimeZone,
};
use fake::faker::company::en::CompanyName;
use fake::faker::creditcard::en::CreditCardNumber;
use fake::faker::currency::en::CurrencyCode;
use fake::faker::internet::en::{
    DomainSuffix, IPv4, IPv6, MACAddress, Password, SafeEmail, Username,
};
use fake::faker::lorem::en::Word;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use uuid::{Builder, Uuid, Version};

use super::pattern::alphanumeric;

/// Produce a value for `format`, or `None` when the tag is not recognized
pub fn generate<R: Rng + ?Sized>(format: &str, rng: &mut R) -> Option<String> {
    let value: String = match format.to_ascii_lowercase().as_str() {
        "email" | "idn-email" => SafeEmail().fake_with_rng(rng),
        "uuid" | "uuid4" => Builder::from_random_bytes(rng.gen()).into_uuid().to_string(),
        "uuid1" => Builder::from_random_bytes(rng.gen())
            .with_version(Version::Mac)
            .into_uuid()
            .to_string(),
        "uuid3" => Uuid::new_v3(&Uuid::NAMESPACE_DNS, hostname(rng).as_bytes()).to_string(),
        "uuid5" => Uuid::new_v5(&Uuid::NAMESPACE_DNS, hostname(rng).as_bytes()).to_string(),
        "date" => date(rng).format("%Y-%m-%d").to_string(),
        "date-time" => date_time(rng),
        "hostname" | "idn-hostname" => hostname(rng),
        "ipv4" => IPv4().fake_with_rng(rng),
        "ipv6" => IPv6().fake_with_rng(rng),
        "ipv4-cidr" | "ipv4-network" => {
            let address: String = IPv4().fake_with_rng(rng);
            format!("{}/{}", address, rng.gen_range(8..=32))
        }
        "ipv6-cidr" | "ipv6-network" => {
            let address: String = IPv6().fake_with_rng(rng);
            format!("{}/{}", address, rng.gen_range(16..=128))
        }
        "uri" | "url" | "iri" => format!("https://{}/{}", hostname(rng), slug(rng)),
        "password" => Password(8..16).fake_with_rng(rng),
        "phone" | "phone-number" => PhoneNumber().fake_with_rng(rng),
        "credit-card" | "payment-card" => CreditCardNumber().fake_with_rng(rng),
        "country-code" => CountryCode().fake_with_rng(rng),
        "currency-code" | "currency" => CurrencyCode().fake_with_rng(rng),
        "timezone" => TimeZone().fake_with_rng(rng),
        "postal-code" | "zip" => PostCode().fake_with_rng(rng),
        "slug" => slug(rng),
        "username" => Username().fake_with_rng(rng),
        "mac-address" | "mac" => MACAddress().fake_with_rng(rng),
        "iban" => iban(rng),
        "bic" | "swift" => bic(rng),
        "hex-color" | "color" => format!("#{:06x}", rng.gen_range(0..=0xFF_FFFFu32)),
        "rgb-color" => format!(
            "rgb({}, {}, {})",
            rng.gen::<u8>(),
            rng.gen::<u8>(),
            rng.gen::<u8>()
        ),
        "street-address" => {
            let street: String = StreetName().fake_with_rng(rng);
            format!("{} {}", rng.gen_range(1..=9999), street)
        }
        "city" => CityName().fake_with_rng(rng),
        "state" => StateAbbr().fake_with_rng(rng),
        "country" => CountryName().fake_with_rng(rng),
        "company" => CompanyName().fake_with_rng(rng),
        _ => return None,
    };
    Some(value)
}

fn date<R: Rng + ?Sized>(rng: &mut R) -> NaiveDate {
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
    epoch + Duration::days(rng.gen_range(0..365 * 30))
}

/// RFC 3339, UTC, second precision
fn date_time<R: Rng + ?Sized>(rng: &mut R) -> String {
    // 2000-01-01T00:00:00Z .. 2030-01-01T00:00:00Z
    let seconds = rng.gen_range(946_684_800i64..1_893_456_000);
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn hostname<R: Rng + ?Sized>(rng: &mut R) -> String {
    let label: String = Word().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    format!("{}.{}", label.to_lowercase(), suffix)
}

fn slug<R: Rng + ?Sized>(rng: &mut R) -> String {
    let words: Vec<String> = (0..rng.gen_range(2..=4))
        .map(|_| Word().fake_with_rng::<String, _>(rng).to_lowercase())
        .collect();
    words.join("-")
}

/// German-layout IBAN with valid mod-97 check digits
fn iban<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bban: String = (0..18)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();

    // Move the country code and "00" to the end, letters become two digits (D=13, E=14)
    let rearranged = format!("{}131400", bban);
    let remainder = rearranged
        .bytes()
        .fold(0u32, |acc, digit| (acc * 10 + u32::from(digit - b'0')) % 97);

    format!("DE{:02}{}", 98 - remainder, bban)
}

fn bic<R: Rng + ?Sized>(rng: &mut R) -> String {
    let letters = |rng: &mut R, n: usize| -> String {
        (0..n)
            .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
            .collect()
    };
    let bank = letters(rng, 4);
    let location = alphanumeric(2, rng).to_uppercase();
    format!("{}DE{}", bank, location)
}
