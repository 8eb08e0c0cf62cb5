#![forbid(unsafe_code)]

//! `pasport.toml` discovery and resolution.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use miette::{Diagnostic, NamedSource, SourceSpan};
use pasport_core::{EffectRule, EffectRules, LoweringOptions};
use pasport_parse::Strategy;
use thiserror::Error;

pub const CONFIG_FILE: &str = "pasport.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(pasport::config))]
pub struct ConfigError {
    pub message: String,
    #[source_code]
    pub src: Option<NamedSource<String>>,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            src: None,
            span: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub project_root: PathBuf,
    pub strategy: Strategy,
    /// Source file extensions without the dot, lowercased.
    pub extensions: Vec<String>,
    pub rules: EffectRules,
    pub lowering: LoweringOptions,
    pub output_dir: PathBuf,
}

impl ResolvedConfig {
    pub fn defaults(project_root: PathBuf) -> Self {
        Self {
            config_path: None,
            output_dir: project_root.join("ir"),
            project_root,
            strategy: Strategy::default(),
            extensions: vec!["pas".to_string()],
            rules: EffectRules::default(),
            lowering: LoweringOptions::default(),
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    frontend: RawFrontend,
    #[serde(default)]
    effects: RawEffects,
    #[serde(default)]
    entities: RawEntities,
    #[serde(default)]
    backend: RawBackend,
    #[serde(default)]
    ui: RawUi,
    #[serde(default)]
    output: RawOutput,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFrontend {
    strategy: Option<String>,
    extensions: Option<Vec<String>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEffects {
    #[serde(default)]
    writes: Vec<RawWrite>,
    #[serde(default)]
    creates: Vec<RawCreate>,
    #[serde(default)]
    ui_markers: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWrite {
    marker: String,
    resource: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCreate {
    marker: String,
    class: String,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntities {
    // Replaces the default list when present.
    exclusions: Option<Vec<String>>,
    #[serde(default)]
    types: IndexMap<String, String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBackend {
    #[serde(default)]
    actions: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUi {
    // Replaces the default denylist when present.
    identity_fields: Option<Vec<String>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    dir: Option<String>,
}

/// Walks up from `start` looking for `pasport.toml`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };
    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = cur.parent()?.to_path_buf();
    }
}

/// Resolves the configuration that applies to `start`. No config file means defaults.
pub fn load_config(start: &Path) -> Result<ResolvedConfig, ConfigError> {
    match find_config(start) {
        Some(path) => load_config_file(&path),
        None => {
            let root = if start.is_file() {
                start.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
            } else {
                start.to_path_buf()
            };
            Ok(ResolvedConfig::defaults(root))
        }
    }
}

pub fn load_config_file(path: &Path) -> Result<ResolvedConfig, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|e| ConfigError::new(format!("failed to read {}: {e}", path.display())))?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = parse_config(&text, &path.display().to_string(), root)?;
    config.config_path = Some(path.to_path_buf());
    Ok(config)
}

/// Parses config text; relative paths resolve against `project_root`.
pub fn parse_config(text: &str, name: &str, project_root: PathBuf) -> Result<ResolvedConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(text).map_err(|e| ConfigError {
        message: e.message().to_string(),
        span: e.span().map(SourceSpan::from),
        src: Some(NamedSource::new(name, text.to_string())),
    })?;

    let mut out = ResolvedConfig::defaults(project_root);

    if let Some(strategy) = raw.frontend.strategy {
        out.strategy = strategy.parse::<Strategy>().map_err(ConfigError::new)?;
    }
    if let Some(extensions) = raw.frontend.extensions {
        let extensions: Vec<String> = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            return Err(ConfigError::new("frontend.extensions must name at least one extension"));
        }
        out.extensions = extensions;
    }

    for w in raw.effects.writes {
        require("effects.writes.marker", &w.marker)?;
        out.rules.push(EffectRule::write(w.marker, w.resource));
    }
    for c in raw.effects.creates {
        require("effects.creates.marker", &c.marker)?;
        out.rules.push(EffectRule::create(c.marker, c.class));
    }
    if !raw.effects.ui_markers.is_empty() {
        for m in &raw.effects.ui_markers {
            require("effects.ui_markers", m)?;
        }
        out.rules.push(EffectRule::ui(raw.effects.ui_markers));
    }

    if let Some(exclusions) = raw.entities.exclusions {
        out.lowering.exclusions = exclusions;
    }
    for (source, target) in raw.entities.types {
        out.lowering.type_map.insert(&source, &target);
    }
    for (token, actions) in raw.backend.actions {
        out.lowering.actions.insert(token, actions);
    }
    if let Some(identity) = raw.ui.identity_fields {
        out.lowering.identity_fields = identity;
    }
    if let Some(dir) = raw.output.dir {
        let dir = PathBuf::from(dir);
        out.output_dir = if dir.is_absolute() {
            dir
        } else {
            out.project_root.join(dir)
        };
    }
    Ok(out)
}

// Empty markers would match every body.
fn require(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::new(format!("{key} must not be empty")));
    }
    Ok(())
}
