use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::model::{Dimensions, DEFAULT_REACTION_HEIGHT, DEFAULT_REACTION_WIDTH};

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub reaction_width: f64,
    pub reaction_height: f64,
    /// Axis distance below which a neighbour does not count as left/above.
    pub orientation_epsilon: f64,
    pub layer_gap: f64,
    pub node_gap: f64,
    pub compartment_padding: f64,
    pub group_gap: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            reaction_width: DEFAULT_REACTION_WIDTH,
            reaction_height: DEFAULT_REACTION_HEIGHT,
            orientation_epsilon: 5.0,
            layer_gap: 60.0,
            node_gap: 30.0,
            compartment_padding: 20.0,
            group_gap: 80.0,
        }
    }
}

impl CompletionConfig {
    pub fn reaction_dimensions(&self) -> Dimensions {
        Dimensions::new(self.reaction_width, self.reaction_height)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    reaction_width: Option<f64>,
    reaction_height: Option<f64>,
    orientation_epsilon: Option<f64>,
    layer_gap: Option<f64>,
    node_gap: Option<f64>,
    compartment_padding: Option<f64>,
    group_gap: Option<f64>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<CompletionConfig> {
    let Some(path) = path else {
        return Ok(CompletionConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<CompletionConfig> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    let mut config = CompletionConfig::default();
    if let Some(v) = parsed.reaction_width {
        config.reaction_width = v;
    }
    if let Some(v) = parsed.reaction_height {
        config.reaction_height = v;
    }
    if let Some(v) = parsed.orientation_epsilon {
        config.orientation_epsilon = v;
    }
    if let Some(v) = parsed.layer_gap {
        config.layer_gap = v;
    }
    if let Some(v) = parsed.node_gap {
        config.node_gap = v;
    }
    if let Some(v) = parsed.compartment_padding {
        config.compartment_padding = v;
    }
    if let Some(v) = parsed.group_gap {
        config.group_gap = v;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::LayoutCompletion;
    use crate::model::{Glyph, PartialBounds};

    #[test]
    fn empty_file_keeps_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, CompletionConfig::default());
        assert_eq!(config.reaction_dimensions(), Dimensions::new(20.0, 10.0));
    }

    #[test]
    fn camel_case_keys_override() {
        let config = parse_config(r#"{"layerGap": 90, "orientationEpsilon": 2.5}"#).unwrap();
        assert_eq!(config.layer_gap, 90.0);
        assert_eq!(config.orientation_epsilon, 2.5);
        assert_eq!(config.node_gap, 30.0);
    }

    #[test]
    fn configured_reaction_size_reaches_completion() {
        let config = parse_config(r#"{"reactionWidth": 30, "reactionHeight": 12}"#).unwrap();
        let mut run = LayoutCompletion::new(config);
        run.add_unlayouted_glyph(Glyph::reaction("r1")).unwrap();
        run.add_unlayouted_glyph(Glyph::reaction("r2").with_bounds(PartialBounds {
            height: Some(16.0),
            ..PartialBounds::unset()
        }))
        .unwrap();
        let done = run.complete().unwrap();
        assert_eq!(
            done.glyph("r1").unwrap().bbox().unwrap().dimensions(),
            Dimensions::new(30.0, 12.0)
        );
        assert_eq!(
            done.glyph("r2").unwrap().bbox().unwrap().dimensions(),
            Dimensions::new(30.0, 16.0)
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_config("{ layerGap: }").is_err());
    }
}
