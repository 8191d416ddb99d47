use crate::config::CopilotConfigOverrides;
use anyhow::{anyhow, bail, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    autowire: Option<bool>,
    partial_merge: Option<bool>,
    asset_root: Option<String>,
}

impl CliOverrides {
    pub fn into_config_overrides(self) -> CopilotConfigOverrides {
        CopilotConfigOverrides { autowire: self.autowire, partial_merge: self.partial_merge, asset_root: self.asset_root }
    }

    #[cfg(test)]
    pub fn as_tuple(&self) -> (Option<bool>, Option<bool>, Option<&str>) {
        (self.autowire, self.partial_merge, self.asset_root.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyArgs {
    pub project_root: PathBuf,
    pub scene: PathBuf,
    pub reply: PathBuf,
    pub config: Option<PathBuf>,
    /// Where the edited scene is written; defaults to `scene`.
    pub output: Option<PathBuf>,
    /// Answer for every approval prompt on the code-edit path.
    pub approve: bool,
    pub overrides: CliOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Extract { reply: PathBuf },
    Apply(ApplyArgs),
    Summary { scene: PathBuf },
    /// Builds a primitive from a plain-language request and saves the scene.
    Create { scene: PathBuf, request: String },
    Help,
}

impl CliCommand {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut iter = args.into_iter().map(|arg| arg.as_ref().to_string());
        let _ = iter.next(); // skip program name if present
        let Some(command) = iter.next() else {
            return Ok(CliCommand::Help);
        };
        let mut positional = Vec::new();
        let mut apply = ApplyArgs {
            project_root: PathBuf::new(),
            scene: PathBuf::new(),
            reply: PathBuf::new(),
            config: None,
            output: None,
            approve: true,
            overrides: CliOverrides::default(),
        };
        while let Some(arg) = iter.next() {
            let Some(key) = arg.strip_prefix("--") else {
                positional.push(arg);
                continue;
            };
            if command != "apply" {
                bail!("Flag '{arg}' is only valid for the apply command.");
            }
            let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '{arg}'"))?;
            match key {
                "config" => apply.config = Some(PathBuf::from(value)),
                "out" => apply.output = Some(PathBuf::from(value)),
                "approve" => apply.approve = parse_bool_flag("approve", &value)?,
                "autowire" => apply.overrides.autowire = Some(parse_bool_flag("autowire", &value)?),
                "partial-merge" => apply.overrides.partial_merge = Some(parse_bool_flag("partial-merge", &value)?),
                "asset-root" => apply.overrides.asset_root = Some(value),
                _ => bail!(
                    "Unknown flag '{arg}'. Supported flags: --config, --out, --approve, --autowire, --partial-merge, --asset-root."
                ),
            }
        }

        let mut positional = positional.into_iter();
        let mut next = |what: &str, usage: &str| {
            positional.next().map(PathBuf::from).ok_or_else(|| anyhow!("{command} missing {what}: {usage}"))
        };
        let parsed = match command.as_str() {
            "extract" => CliCommand::Extract { reply: next("reply path", "copilot_tool extract <reply>")? },
            "summary" => CliCommand::Summary { scene: next("scene path", "copilot_tool summary <scene>")? },
            "apply" => {
                let usage = "copilot_tool apply <project_root> <scene> <reply> [flags]";
                apply.project_root = next("project root", usage)?;
                apply.scene = next("scene path", usage)?;
                apply.reply = next("reply path", usage)?;
                CliCommand::Apply(apply)
            }
            "create" => {
                let usage = "copilot_tool create <scene> \"<request>\"";
                let scene = next("scene path", usage)?;
                let request = next("request text", usage)?.to_string_lossy().into_owned();
                CliCommand::Create { scene, request }
            }
            "help" | "-h" => CliCommand::Help,
            other => bail!("unknown command '{other}'"),
        };
        if let Some(extra) = positional.next() {
            bail!("Unexpected argument '{extra}'.");
        }
        Ok(parsed)
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
