//! Request parameters for the linking service.

use std::collections::BTreeMap;
use std::str::FromStr;

use super::DejureError;

/// Caller-supplied filter parameters, keyed by option name.
pub type FilterParams = BTreeMap<String, String>;

/// Form field carrying the text to annotate.
pub const TEXT_FIELD: &str = "Originaltext";

/// Form field carrying the caller identity.
pub const PROVIDER_FIELD: &str = "Anbieterkennung";

/// Form field the `noheadings` option maps to.
pub const NO_HEADINGS_FIELD: &str = "ohneUeberschriften";

/// Keys the client sets itself; caller values for them are dropped.
/// Headings are controlled through `noheadings` only.
const RESERVED_KEYS: &[&str] = &["version", PROVIDER_FIELD, TEXT_FIELD, NO_HEADINGS_FIELD, "cache_days"];

/// Layout of the generated links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Weit,
    Schmal,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Weit => "weit",
            Format::Schmal => "schmal",
        }
    }
}

impl FromStr for Format {
    type Err = DejureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weit" | "wide" => Ok(Format::Weit),
            "schmal" | "narrow" => Ok(Format::Schmal),
            _ => Err(DejureError::InvalidParam { key: "format".into(), value: s.to_string() }),
        }
    }
}

/// Parameters for one call to the linking service.
///
/// Built fresh for every call; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateRequest {
    /// Link layout (default `weit`).
    pub format: Format,

    /// Fall back to buzer.de for norms dejure.org does not know (default on).
    pub buzer: bool,

    /// Leave headings unlinked (default off).
    pub noheadings: bool,

    /// `target` attribute for generated anchors.
    pub target: Option<String>,

    /// `class` attribute for generated anchors.
    pub class: Option<String>,

    /// Protocol version tag.
    pub version: String,

    /// Caller identity, sent as `Anbieterkennung` and in the User-Agent.
    pub provider_id: String,

    /// Unrecognized options, passed through verbatim.
    pub extra: BTreeMap<String, String>,
}

impl AnnotateRequest {
    /// Request with default options.
    pub fn new(version: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            format: Format::default(),
            buzer: true,
            noheadings: false,
            target: None,
            class: None,
            version: version.into(),
            provider_id: provider_id.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Merge caller parameters over the defaults.
    ///
    /// Returns an error if `format`, `buzer` or `noheadings` has an unrecognized value.
    pub fn from_params(params: &FilterParams, version: &str, provider_id: &str) -> Result<Self, DejureError> {
        let mut req = Self::new(version, provider_id);

        for (key, value) in params {
            match key.as_str() {
                "format" => req.format = value.parse()?,
                "buzer" => req.buzer = parse_flag(key, value)?,
                "noheadings" => req.noheadings = parse_flag(key, value)?,
                "target" => req.target = non_empty(value),
                "class" => req.class = non_empty(value),
                k if RESERVED_KEYS.contains(&k) => {
                    tracing::debug!("ignoring reserved parameter {}", k);
                }
                _ => {
                    req.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(req)
    }

    /// Value of the User-Agent header.
    pub fn user_agent(&self) -> String {
        format!("{} (vernetzen/{})", self.provider_id, self.version)
    }

    /// Form body for `text`, with the text last.
    pub fn form_fields<'a>(&'a self, text: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut fields = vec![
            ("version", self.version.as_str()),
            (PROVIDER_FIELD, self.provider_id.as_str()),
            ("format", self.format.as_str()),
            ("buzer", if self.buzer { "1" } else { "0" }),
        ];

        if self.noheadings {
            fields.push((NO_HEADINGS_FIELD, "1"));
        }
        if let Some(target) = &self.target {
            fields.push(("target", target.as_str()));
        }
        if let Some(class) = &self.class {
            fields.push(("class", class.as_str()));
        }

        fields.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fields.push((TEXT_FIELD, text));
        fields
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, DejureError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DejureError::InvalidParam { key: key.to_string(), value: value.to_string() }),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}
