use std::collections::BTreeMap;

use maestro_core::config::{Linter, StageSpec, ToolKind, ToolchainConfig};

/// The independent checks that gate the test stage.
pub const CHECK_STAGES: [&str; 4] = ["format", "imports", "lint", "typecheck"];

/// Group that always names every stage.
pub const ALL_GROUP: &str = "all";

/// format, imports, lint, typecheck -> test -> package
pub fn default_stages(cfg: &ToolchainConfig) -> Vec<StageSpec> {
    let linter = match cfg.linter {
        Linter::Ruff => ToolKind::Ruff,
        Linter::Flake8 => ToolKind::Flake8,
    };
    vec![
        StageSpec::tool("format", ToolKind::Black),
        StageSpec::tool("imports", ToolKind::Isort),
        StageSpec::tool("lint", linter),
        StageSpec::tool("typecheck", ToolKind::Mypy),
        StageSpec::tool("test", ToolKind::Pytest).depends_on(CHECK_STAGES),
        StageSpec::tool("package", ToolKind::Wheel).depends_on(["test"]),
    ]
}

/// Groups available for `stages`: the built-in ones when the built-in graph
/// is in use, `all`, then the configured groups on top.
pub fn groups(
    stages: &[StageSpec],
    builtin: bool,
    configured: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Vec<String>> {
    let mut groups = BTreeMap::new();
    if builtin {
        groups.insert(
            "lint".to_string(),
            CHECK_STAGES.iter().map(|s| s.to_string()).collect(),
        );
        groups.insert("test".to_string(), vec!["test".to_string()]);
        groups.insert("package".to_string(), vec!["package".to_string()]);
    }
    groups.insert(
        ALL_GROUP.to_string(),
        stages.iter().map(|s| s.id.clone()).collect(),
    );
    for (name, members) in configured {
        groups.insert(name.clone(), members.clone());
    }
    groups
}
