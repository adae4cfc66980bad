//! Word lists and field-name heuristics
//!
//! Free-text values are built from small embedded vocabularies. A domain
//! hint (`"pet store"`, `"banking"`) selects themed nouns; a field name or
//! description (`email`, `firstName`, `city`) selects a realistic shape.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chen", "Dana", "Elif", "Farah", "Gabriel", "Hana", "Ivan", "Jonas",
    "Kofi", "Lena", "Mateo", "Nadia", "Omar", "Priya", "Quinn", "Rosa", "Sven", "Tariq",
];

const LAST_NAMES: &[&str] = &[
    "Anders", "Baker", "Costa", "Diaz", "Evans", "Fischer", "Garcia", "Haddad", "Ito",
    "Jensen", "Khan", "Lopez", "Moreau", "Novak", "Okafor", "Patel", "Rossi", "Silva",
];

const CITIES: &[&str] = &[
    "Springfield", "Riverton", "Lakeside", "Fairview", "Greenville", "Maplewood", "Brookfield",
    "Oakridge",
];

const STREETS: &[&str] = &[
    "Main St", "Oak Ave", "Pine Rd", "Cedar Ln", "Elm St", "Harbor Way", "Hillcrest Dr",
];

const COUNTRIES: &[&str] = &["US", "DE", "FR", "JP", "BR", "IN", "CA", "GB"];

const COMPANIES: &[&str] = &[
    "Acme Corp", "Globex", "Initech", "Umbrella Labs", "Stark Industries", "Wayne Holdings",
    "Hooli", "Vandelay Imports",
];

const LOREM: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.io"];

/// Application domain inferred from a free-form hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Pets, animals, veterinary
    Pet,
    /// Shops, products, orders
    Ecommerce,
    /// Accounts and profiles
    User,
    /// Payments and banking
    Finance,
    /// Patients and clinics
    Healthcare,
    /// Posts, feeds, followers
    Social,
}

impl Domain {
    /// Infer a domain from a hint such as `"online pet store"`
    #[must_use]
    pub fn detect(hint: &str) -> Option<Self> {
        let hint = hint.to_ascii_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| hint.contains(w));
        if has(&["pet", "animal", "vet", "dog", "cat"]) {
            Some(Self::Pet)
        } else if has(&["shop", "commerce", "store", "product", "cart", "order", "retail"]) {
            Some(Self::Ecommerce)
        } else if has(&["bank", "financ", "payment", "money", "invoice", "account balance"]) {
            Some(Self::Finance)
        } else if has(&["health", "medical", "patient", "clinic", "hospital"]) {
            Some(Self::Healthcare)
        } else if has(&["social", "post", "feed", "friend", "follower", "comment"]) {
            Some(Self::Social)
        } else if has(&["user", "account", "profile", "member", "auth"]) {
            Some(Self::User)
        } else {
            None
        }
    }

    /// Canonical lower-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pet => "pet",
            Self::Ecommerce => "ecommerce",
            Self::User => "user",
            Self::Finance => "finance",
            Self::Healthcare => "healthcare",
            Self::Social => "social",
        }
    }

    /// Names of things in this domain
    #[must_use]
    pub fn entity_names(self) -> &'static [&'static str] {
        match self {
            Self::Pet => &["Buddy", "Luna", "Max", "Bella", "Charlie", "Daisy", "Rocky", "Milo"],
            Self::Ecommerce => &[
                "Wireless Mouse", "Espresso Maker", "Running Shoes", "Desk Lamp", "Backpack",
                "Bluetooth Speaker",
            ],
            Self::User => &["jdoe", "asmith", "mchen", "lgarcia", "kpatel", "rsilva"],
            Self::Finance => &[
                "Checking Account", "Savings Plan", "Quarterly Invoice", "Wire Transfer",
                "Credit Line",
            ],
            Self::Healthcare => &[
                "Annual Checkup", "Blood Panel", "Physiotherapy", "Dental Cleaning",
                "Vaccination",
            ],
            Self::Social => &[
                "Weekend hike photos", "Book club notes", "Launch day!", "Recipe share",
                "Travel diary",
            ],
        }
    }

    /// Nouns used in free text for this domain
    #[must_use]
    pub fn nouns(self) -> &'static [&'static str] {
        match self {
            Self::Pet => &["dog", "cat", "parrot", "kennel", "leash", "treat", "vet", "collar"],
            Self::Ecommerce => &["order", "cart", "product", "shipment", "discount", "checkout"],
            Self::User => &["profile", "account", "preference", "session", "avatar", "role"],
            Self::Finance => &["balance", "transfer", "ledger", "payment", "statement", "fee"],
            Self::Healthcare => &["patient", "appointment", "dosage", "clinic", "record", "lab"],
            Self::Social => &["post", "comment", "follower", "feed", "like", "story"],
        }
    }

    /// Plausible status values for this domain
    #[must_use]
    pub fn statuses(self) -> &'static [&'static str] {
        match self {
            Self::Pet => &["available", "pending", "sold"],
            Self::Ecommerce => &["placed", "approved", "shipped", "delivered"],
            Self::User | Self::Social => &["active", "inactive", "suspended"],
            Self::Finance => &["pending", "settled", "failed"],
            Self::Healthcare => &["scheduled", "completed", "cancelled"],
        }
    }
}

/// Shape suggested by a field name or description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Email address
    Email,
    /// Given name
    FirstName,
    /// Family name
    LastName,
    /// Full or entity name
    Name,
    /// Login handle
    Username,
    /// Phone number
    Phone,
    /// Street address
    Address,
    /// City
    City,
    /// ISO country code
    Country,
    /// Postal code
    PostalCode,
    /// Company name
    Company,
    /// Web address
    Url,
    /// Short title
    Title,
    /// Longer prose
    Description,
    /// Lifecycle status
    Status,
    /// ISO currency code
    Currency,
}

impl FieldKind {
    /// Classify a field by name, then by description
    #[must_use]
    pub fn detect(name: Option<&str>, description: Option<&str>) -> Option<Self> {
        name.and_then(Self::from_text)
            .or_else(|| description.and_then(Self::from_text))
    }

    fn from_text(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        let has = |w: &str| lower.contains(w);
        let kind = if has("email") || has("e-mail") {
            Self::Email
        } else if has("firstname") || has("first_name") || has("given") {
            Self::FirstName
        } else if has("lastname") || has("last_name") || has("surname") || has("family") {
            Self::LastName
        } else if has("username") || has("user_name") || has("login") || has("handle") {
            Self::Username
        } else if has("phone") || has("mobile") || has("tel") {
            Self::Phone
        } else if has("street") || has("address") {
            Self::Address
        } else if has("city") || has("town") {
            Self::City
        } else if has("country") {
            Self::Country
        } else if has("zip") || has("postal") || has("postcode") {
            Self::PostalCode
        } else if has("company") || has("organization") || has("employer") {
            Self::Company
        } else if has("url") || has("website") || has("link") || has("homepage") {
            Self::Url
        } else if has("currency") {
            Self::Currency
        } else if has("status") || has("state") {
            Self::Status
        } else if has("title") || has("subject") || has("headline") {
            Self::Title
        } else if has("description") || has("comment") || has("note") || has("bio") || has("summary") {
            Self::Description
        } else if has("name") {
            Self::Name
        } else {
            return None;
        };
        Some(kind)
    }
}

/// Pick one element of a non-empty slice
pub fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// A single lorem word
pub fn word<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, LOREM)
}

/// `First Last`
pub fn full_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

/// `first.last@example.com`
pub fn email<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}.{}@{}",
        pick(rng, FIRST_NAMES).to_ascii_lowercase(),
        pick(rng, LAST_NAMES).to_ascii_lowercase(),
        pick(rng, EMAIL_DOMAINS)
    )
}

/// Host name under a reserved example domain
pub fn hostname<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{}.{}", word(rng), pick(rng, EMAIL_DOMAINS))
}

/// North-American style test number
pub fn phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "+1-555-{:03}-{:04}",
        rng.gen_range(100..1000),
        rng.gen_range(0..10_000)
    )
}

/// Sentence of `words` words, capitalized, with a full stop
pub fn sentence<R: Rng + ?Sized>(rng: &mut R, words: usize, domain: Option<Domain>) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(words);
    for i in 0..words.max(1) {
        let themed = domain.filter(|_| i % 3 == 1).map(|d| pick(rng, d.nouns()));
        parts.push(themed.unwrap_or_else(|| word(rng)));
    }
    let mut text = parts.join(" ");
    if let Some(first) = text.get(..1) {
        let upper = first.to_ascii_uppercase();
        text.replace_range(..1, &upper);
    }
    text.push('.');
    text
}

/// Value for a recognized field kind
pub fn for_field<R: Rng + ?Sized>(rng: &mut R, kind: FieldKind, domain: Option<Domain>) -> String {
    match kind {
        FieldKind::Email => email(rng),
        FieldKind::FirstName => pick(rng, FIRST_NAMES).to_string(),
        FieldKind::LastName => pick(rng, LAST_NAMES).to_string(),
        FieldKind::Name => match domain {
            Some(Domain::User) | None => full_name(rng),
            Some(d) => pick(rng, d.entity_names()).to_string(),
        },
        FieldKind::Username => format!(
            "{}{}",
            pick(rng, FIRST_NAMES).to_ascii_lowercase(),
            rng.gen_range(1..1000)
        ),
        FieldKind::Phone => phone(rng),
        FieldKind::Address => format!("{} {}", rng.gen_range(1..9999), pick(rng, STREETS)),
        FieldKind::City => pick(rng, CITIES).to_string(),
        FieldKind::Country => pick(rng, COUNTRIES).to_string(),
        FieldKind::PostalCode => format!("{:05}", rng.gen_range(10_000..99_999)),
        FieldKind::Company => pick(rng, COMPANIES).to_string(),
        FieldKind::Url => format!("https://{}/{}", hostname(rng), word(rng)),
        FieldKind::Title => match domain {
            Some(d) => pick(rng, d.entity_names()).to_string(),
            None => sentence(rng, 3, None).trim_end_matches('.').to_string(),
        },
        FieldKind::Description => {
            let words = rng.gen_range(6..14);
            sentence(rng, words, domain)
        }
        FieldKind::Status => pick(rng, domain.unwrap_or(Domain::User).statuses()).to_string(),
        FieldKind::Currency => pick(rng, &["USD", "EUR", "GBP", "JPY"]).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_domain_detection() {
        assert_eq!(Domain::detect("Online Pet Store"), Some(Domain::Pet));
        assert_eq!(Domain::detect("e-commerce checkout"), Some(Domain::Ecommerce));
        assert_eq!(Domain::detect("banking API"), Some(Domain::Finance));
        assert_eq!(Domain::detect("clinic scheduling"), Some(Domain::Healthcare));
        assert_eq!(Domain::detect("user profiles"), Some(Domain::User));
        assert_eq!(Domain::detect("weather"), None);
    }

    #[test]
    fn test_field_detection() {
        assert_eq!(FieldKind::detect(Some("contactEmail"), None), Some(FieldKind::Email));
        assert_eq!(FieldKind::detect(Some("first_name"), None), Some(FieldKind::FirstName));
        assert_eq!(FieldKind::detect(Some("petName"), None), Some(FieldKind::Name));
        assert_eq!(
            FieldKind::detect(Some("x"), Some("The customer's phone number")),
            Some(FieldKind::Phone)
        );
        assert_eq!(FieldKind::detect(Some("count"), None), None);
    }

    #[test]
    fn test_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(email(&mut rng).contains('@'));
        assert!(phone(&mut rng).starts_with("+1-555-"));
        let s = sentence(&mut rng, 5, Some(Domain::Pet));
        assert!(s.ends_with('.'));
        assert!(s.chars().next().is_some_and(|c| c.is_ascii_uppercase()));
        let name = for_field(&mut rng, FieldKind::Name, Some(Domain::Pet));
        assert!(Domain::Pet.entity_names().contains(&name.as_str()));
    }
}
