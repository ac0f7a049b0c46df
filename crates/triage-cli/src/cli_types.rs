use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CliMode {
    Validate,
    Monitor,
    Roast,
    Summary,
    Progress,
    All,
    #[value(alias = "mcp")]
    Agents,
}

impl CliMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Monitor => "monitor",
            Self::Roast => "roast",
            Self::Summary => "summary",
            Self::Progress => "progress",
            Self::All => "all",
            Self::Agents => "agents",
        }
    }
}

impl std::fmt::Display for CliMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
