//! Base prompt and prompt composition.

use std::path::Path;

use anyhow::Context;

/// Built-in instructions sent with every piece of media.
pub const BASE_PROMPT: &str = include_str!("../prompts/ad_copy.md");

/// Separator placed between the base prompt and caller-supplied instructions.
pub const CONTEXT_SEPARATOR: &str = "\n\nFurther specific instructions: ";

/// Load the base prompt, preferring `override_path` when one is configured.
pub fn load_base_prompt(override_path: Option<&str>) -> anyhow::Result<String> {
    match override_path {
        Some(path) => {
            let text = std::fs::read_to_string(Path::new(path))
                .with_context(|| format!("Failed to read prompt file {}", path))?;
            if text.trim().is_empty() {
                anyhow::bail!("Prompt file {} is empty", path);
            }
            tracing::info!(path = %path, chars = text.len(), "Loaded base prompt override");
            Ok(text)
        }
        None => Ok(BASE_PROMPT.to_string()),
    }
}

/// Append additional context to the base prompt. Blank context is ignored.
pub fn compose_prompt(base: &str, additional_context: Option<&str>) -> String {
    match additional_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("{}{}{}", base, CONTEXT_SEPARATOR, context),
        None => base.to_string(),
    }
}
