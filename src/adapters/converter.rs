use anyhow::Context;
use serde_json::Value;
use std::path::Path;

/// Render a JSON document as YAML. Object keys keep their document order.
pub fn json_to_yaml(json: &str) -> anyhow::Result<String> {
    let value: Value = serde_json::from_str(json)?;
    Ok(serde_yaml::to_string(&value)?)
}

pub fn convert_file(input: &Path, output: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let yaml = json_to_yaml(&json).with_context(|| format!("Invalid JSON in {}", input.display()))?;
    std::fs::write(output, yaml).with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Converted {} to {}", input.display(), output.display());
    Ok(())
}
