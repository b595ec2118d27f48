const ROUTE_PREFIXES: &[&str] = &["bedrock/", "converse/", "invoke/"];
const CROSS_REGION_PREFIXES: &[&str] = &["us-gov.", "us.", "eu.", "apac.", "global."];

const CONVERSE_PARAMS: &[&str] = &[
    "max_tokens",
    "max_completion_tokens",
    "stream",
    "stream_options",
    "stop",
    "temperature",
    "top_p",
    "extra_headers",
    "response_format",
];

const TOOL_CAPABLE_FAMILIES: &[&str] = &[
    "anthropic.",
    "amazon.nova",
    "mistral.mistral-large",
    "cohere.command-r",
    "meta.llama3-1",
    "meta.llama3-2",
    "meta.llama3-3",
    "meta.llama4",
];

const THINKING_MODELS: &[&str] = &["claude-3-7", "claude-sonnet-4", "claude-opus-4"];

/// Strips gateway routing and cross-region inference prefixes.
///
/// `bedrock/us.anthropic.claude-3-5-sonnet-20241022-v2:0` becomes
/// `anthropic.claude-3-5-sonnet-20241022-v2:0`.
pub fn base_model(model: &str) -> &str {
    let id = provider_model_id(model);
    CROSS_REGION_PREFIXES
        .iter()
        .find_map(|p| id.strip_prefix(p))
        .unwrap_or(id)
}

/// The model id as Bedrock expects it in the request path.
pub fn provider_model_id(model: &str) -> &str {
    let mut rest = model.trim();
    loop {
        match ROUTE_PREFIXES.iter().find_map(|p| rest.strip_prefix(p)) {
            Some(stripped) => rest = stripped,
            None => return rest,
        }
    }
}

pub fn is_anthropic(model: &str) -> bool {
    base_model(model).starts_with("anthropic")
}

pub fn supports_tools(model: &str) -> bool {
    let base = base_model(model);
    TOOL_CAPABLE_FAMILIES.iter().any(|f| base.starts_with(f))
}

/// OpenAI-style parameter names the Converse mapping accepts for `model`.
pub fn supported_params(model: &str) -> Vec<&'static str> {
    let mut params = CONVERSE_PARAMS.to_vec();
    if supports_tools(model) {
        params.extend(["tools", "tool_choice"]);
    }
    let base = base_model(model);
    if is_anthropic(model) && THINKING_MODELS.iter().any(|m| base.contains(m)) {
        params.extend(["thinking", "reasoning_effort"]);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_route_and_region_prefixes() {
        assert_eq!(
            base_model("bedrock/us.anthropic.claude-3-5-sonnet-20241022-v2:0"),
            "anthropic.claude-3-5-sonnet-20241022-v2:0"
        );
        assert_eq!(
            base_model("bedrock/converse/eu.anthropic.claude-3-haiku-20240307-v1:0"),
            "anthropic.claude-3-haiku-20240307-v1:0"
        );
        assert_eq!(base_model("us-gov.anthropic.claude-3-haiku"), "anthropic.claude-3-haiku");
        assert_eq!(base_model("amazon.nova-pro-v1:0"), "amazon.nova-pro-v1:0");
    }

    #[test]
    fn provider_model_keeps_inference_profile() {
        assert_eq!(
            provider_model_id("bedrock/us.anthropic.claude-3-5-sonnet-20241022-v2:0"),
            "us.anthropic.claude-3-5-sonnet-20241022-v2:0"
        );
    }

    #[test]
    fn anthropic_models_get_tool_params() {
        let params = supported_params("bedrock/us.anthropic.claude-3-5-sonnet-20241022-v2:0");
        assert!(params.contains(&"tools"));
        assert!(params.contains(&"tool_choice"));
        assert!(!params.contains(&"thinking"));
        assert!(is_anthropic("bedrock/us.anthropic.claude-3-5-sonnet-20241022-v2:0"));
    }

    #[test]
    fn thinking_only_for_newer_claude() {
        let params = supported_params("bedrock/us.anthropic.claude-3-7-sonnet-20250219-v1:0");
        assert!(params.contains(&"thinking"));
    }

    #[test]
    fn text_only_families_have_no_tools() {
        let params = supported_params("bedrock/amazon.titan-text-express-v1");
        assert!(!params.contains(&"tools"));
        assert!(params.contains(&"temperature"));
    }
}
