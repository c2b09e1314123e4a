//! Model name resolution and queue endpoint construction.

/// Default queue application.
pub const DEFAULT_MODEL: &str = "fal-ai/nano-banana-pro";

/// Short name aliases for queue applications.
const ALIASES: &[(&str, &str)] = &[
    ("nano-banana-pro", "fal-ai/nano-banana-pro"),
    ("nano-banana", "fal-ai/nano-banana"),
    ("pro", "fal-ai/nano-banana-pro"),
];

/// Resolve a model name (alias or exact application id) to the application id.
#[must_use]
pub fn resolve_model(name: &str) -> String {
    for &(alias, full) in ALIASES {
        if name == alias {
            return full.to_string();
        }
    }
    name.trim_matches('/').to_string()
}

/// Build the queue endpoint for an application id.
///
/// # Errors
///
/// Returns an error if the application id is not of the form `owner/app`.
pub fn queue_endpoint(queue_base: &str, model: &str) -> Result<String, String> {
    let mut segments = model.split('/');
    let well_formed = match (segments.next(), segments.next()) {
        (Some(owner), Some(app)) => !owner.is_empty() && !app.is_empty(),
        _ => false,
    };
    if !well_formed || model.contains(char::is_whitespace) {
        return Err(format!(
            "Unknown model '{model}'. Expected an alias or an 'owner/app' id such as \
             '{DEFAULT_MODEL}'."
        ));
    }
    Ok(format!("{}/{model}", queue_base.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_aliases() {
        assert_eq!(resolve_model("nano-banana-pro"), "fal-ai/nano-banana-pro");
        assert_eq!(resolve_model("nano-banana"), "fal-ai/nano-banana");
        assert_eq!(resolve_model("pro"), "fal-ai/nano-banana-pro");
    }

    #[test]
    fn resolve_exact_name_passthrough() {
        assert_eq!(resolve_model("fal-ai/flux/dev"), "fal-ai/flux/dev");
        assert_eq!(resolve_model("/fal-ai/nano-banana/"), "fal-ai/nano-banana");
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let endpoint = queue_endpoint("https://queue.fal.run/", "fal-ai/nano-banana-pro");
        assert_eq!(
            endpoint.unwrap(),
            "https://queue.fal.run/fal-ai/nano-banana-pro"
        );
    }

    #[test]
    fn endpoint_rejects_bare_names() {
        let err = queue_endpoint("https://queue.fal.run", "dall-e-3").unwrap_err();
        assert!(err.contains("Unknown model"));
        assert!(queue_endpoint("https://queue.fal.run", "fal-ai/").is_err());
        assert!(queue_endpoint("https://queue.fal.run", "fal ai/x").is_err());
    }
}
