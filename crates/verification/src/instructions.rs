//! Claimant-facing instructions for each verification method

use crate::dns::txt_host;
use crate::meta_tag::META_TAG_NAME;
use crate::well_known::{VERIFICATION_FIELD, WELL_KNOWN_PATH};
use serde::{Deserialize, Serialize};

/// Where and how to publish the token, one entry per method. Serialized
/// with the method names as keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationInstructions {
    pub dns: DnsInstructions,
    pub meta_tag: MetaTagInstructions,
    pub file: FileInstructions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsInstructions {
    pub record: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTagInstructions {
    pub tag: String,
    pub location: String,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInstructions {
    pub path: String,
    pub content: String,
    pub instructions: String,
}

impl VerificationInstructions {
    pub fn for_registration(domain: &str, token: &str) -> Self {
        let record = txt_host(domain);
        let mut file_body = serde_json::Map::new();
        file_body.insert(VERIFICATION_FIELD.to_string(), token.into());
        let content = serde_json::to_string_pretty(&file_body).unwrap_or_default();

        Self {
            dns: DnsInstructions {
                instructions: format!(
                    "Add a TXT record for {record} with the value {token}. DNS changes can take a while to propagate."
                ),
                record,
                record_type: "TXT".to_string(),
                value: token.to_string(),
            },
            meta_tag: MetaTagInstructions {
                tag: format!(r#"<meta name="{META_TAG_NAME}" content="{token}">"#),
                location: "HTML <head> section".to_string(),
                instructions: format!(
                    "Add this meta tag to the <head> of the page served at https://{domain}/"
                ),
            },
            file: FileInstructions {
                path: WELL_KNOWN_PATH.to_string(),
                content,
                instructions: format!(
                    "Serve this JSON at https://{domain}{WELL_KNOWN_PATH}"
                ),
            },
        }
    }
}
