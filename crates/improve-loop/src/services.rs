//! Known third-party services and how change requests mention them.

/// One service the generated apps commonly integrate, with the lower-cased
/// phrases a change request uses to refer to it.
#[derive(Debug)]
pub struct ServiceDef {
    /// Key used for credential-store lookups and operator messages.
    pub key: &'static str,
    pub aliases: &'static [&'static str],
}

pub const KNOWN_SERVICES: &[ServiceDef] = &[
    ServiceDef {
        key: "openai",
        aliases: &["openai", "open ai", "gpt"],
    },
    ServiceDef {
        key: "stripe",
        aliases: &["stripe"],
    },
    ServiceDef {
        key: "twilio",
        aliases: &["twilio", "text message"],
    },
    ServiceDef {
        key: "sendgrid",
        aliases: &["sendgrid", "send grid"],
    },
    ServiceDef {
        key: "google-maps",
        aliases: &["google maps", "maps api"],
    },
    ServiceDef {
        key: "slack",
        aliases: &["slack"],
    },
    ServiceDef {
        key: "github",
        aliases: &["github", "git hub"],
    },
    ServiceDef {
        key: "openweather",
        aliases: &["openweather", "open weather", "weather api"],
    },
];

/// Service keys a change request mentions, in table order, each at most once.
pub fn detect_services(text: &str) -> Vec<&'static str> {
    let haystack = text.to_lowercase();
    KNOWN_SERVICES
        .iter()
        .filter(|service| service.aliases.iter().any(|alias| haystack.contains(alias)))
        .map(|service| service.key)
        .collect()
}
