//! Config command handler

use crate::commands::ConfigArgs;
use crate::error::{CliError, CliResult};
use sdt_site::harness::SnapConfig;
use std::path::Path;

/// Execute the config command; with no flags it behaves like `--show`
pub fn execute_config(config_path: &Path, args: &ConfigArgs) -> CliResult<()> {
    if args.init {
        init_config(config_path, args.force)?;
        println!("Wrote {}", config_path.display());
    }
    if args.show || !args.init {
        print!("{}", effective_config(config_path)?);
    }
    Ok(())
}

/// YAML of the configuration a run would use, before command-line flags
pub fn effective_config(config_path: &Path) -> CliResult<String> {
    Ok(SnapConfig::load(config_path)?.with_env().to_yaml()?)
}

/// Write the default configuration to `path`
pub fn init_config(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, SnapConfig::default().to_yaml()?)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/sdt-snap.yaml");
        init_config(&path, false).unwrap();
        assert_eq!(SnapConfig::load(&path).unwrap(), SnapConfig::default());
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sdt-snap.yaml");
        std::fs::write(&path, "settle_ms: 10\n").unwrap();

        let err = init_config(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "settle_ms: 10\n");

        init_config(&path, true).unwrap();
        assert_eq!(SnapConfig::load(&path).unwrap().settle_ms, 500);
    }

    #[test]
    fn test_effective_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sdt-snap.yaml");
        std::fs::write(&path, "base_url: http://localhost:4000\n").unwrap();
        let yaml = effective_config(&path).unwrap();
        assert!(yaml.contains("base_url: http://localhost:4000"));
        assert!(yaml.contains("overlay_close_ms"));
    }
}
