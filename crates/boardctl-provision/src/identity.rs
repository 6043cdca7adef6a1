use std::collections::BTreeMap;

use boardctl_types::model::Agent;
use boardctl_types::Json;

const DEFAULT_ROLE: &str = "Generalist";
const DEFAULT_COMMUNICATION_STYLE: &str = "direct, concise, practical";
const DEFAULT_EMOJI: &str = ":gear:";

/// Normalized template variables derived from an agent's free-form
/// `identity_profile` map, with defaults for the fields every template
/// renders unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    pub role: String,
    pub communication_style: String,
    pub emoji: String,
    pub autonomy_level: String,
    pub verbosity: String,
    pub output_format: String,
    pub update_cadence: String,
    pub purpose: String,
    pub personality: String,
    pub custom_instructions: String,
}

fn normalize(value: &Json) -> Option<String> {
    match value {
        Json::Null => None,
        Json::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Json::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(normalize).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Json::Bool(b) => Some(b.to_string()),
        Json::Number(n) => Some(n.to_string()),
        Json::Object(_) => None,
    }
}

/// Builds template variables from `agent.identity_profile`, falling back
/// to the documented defaults for role/communication_style/emoji and to
/// empty strings for the optional charter fields.
pub fn build_identity_context(profile: &BTreeMap<String, Json>) -> IdentityContext {
    let get = |key: &str| profile.get(key).and_then(normalize);

    IdentityContext {
        role: get("role").unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        communication_style: get("communication_style")
            .unwrap_or_else(|| DEFAULT_COMMUNICATION_STYLE.to_string()),
        emoji: get("emoji").unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
        autonomy_level: get("autonomy_level").unwrap_or_default(),
        verbosity: get("verbosity").unwrap_or_default(),
        output_format: get("output_format").unwrap_or_default(),
        update_cadence: get("update_cadence").unwrap_or_default(),
        purpose: get("purpose").unwrap_or_default(),
        personality: get("personality").unwrap_or_default(),
        custom_instructions: get("custom_instructions").unwrap_or_default(),
    }
}

pub fn build_identity_context_for_agent(agent: &Agent) -> IdentityContext {
    build_identity_context(&agent.identity_profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_documented_defaults() {
        let ctx = build_identity_context(&BTreeMap::new());
        assert_eq!(ctx.role, DEFAULT_ROLE);
        assert_eq!(ctx.communication_style, DEFAULT_COMMUNICATION_STYLE);
        assert_eq!(ctx.emoji, DEFAULT_EMOJI);
        assert_eq!(ctx.purpose, "");
    }

    #[test]
    fn list_values_are_joined_with_commas() {
        let mut profile = BTreeMap::new();
        profile.insert(
            "personality".to_string(),
            Json::Array(vec![
                Json::String("curious".to_string()),
                Json::String("terse".to_string()),
            ]),
        );
        let ctx = build_identity_context(&profile);
        assert_eq!(ctx.personality, "curious, terse");
    }

    #[test]
    fn blank_strings_are_treated_as_absent() {
        let mut profile = BTreeMap::new();
        profile.insert("role".to_string(), Json::String("   ".to_string()));
        let ctx = build_identity_context(&profile);
        assert_eq!(ctx.role, DEFAULT_ROLE);
    }
}
