//! icon-chooser: developer harness for the icon chooser core
//!
//! Parses and renders icon payloads, prints family/style availability and
//! asset URLs, and checks configuration files.

use clap::Parser;
use icon_chooser::config::{self, ChooserConfig};
use icon_chooser::family::FamilyStyleTable;
use icon_chooser::icon::{IconDefinition, IconGeometry};
use icon_chooser::license::LicenseContext;
use icon_chooser::parser::{parse_icon_json, parse_svg_text};
use icon_chooser::render::{IconSize, render_svg};
use icon_chooser::technology;
use icon_chooser::{ChooserError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "icon-chooser", about = "Icon chooser core harness")]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Parse an SVG (or JSON) icon file and print its geometry
    Parse {
        file: PathBuf,
    },
    /// Render an icon file as normalized SVG markup
    Render {
        file: PathBuf,
        /// Size modifier: xs, sm, lg, 1x..10x
        #[arg(long, default_value = "1x")]
        size: IconSize,
        #[arg(long, default_value = "fas")]
        prefix: String,
        /// Icon name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the family/style matrix available for a version and tier
    Families {
        #[arg(long)]
        version: String,
        #[arg(long)]
        pro: bool,
    },
    /// Print the script, stylesheet and kit loader URLs for a version
    Urls {
        #[arg(long)]
        version: String,
        #[arg(long)]
        pro: bool,
        #[arg(long)]
        kit_token: Option<String>,
    },
    /// Load and validate a config file
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a default config file
    InitConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("ICON_CHOOSER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_geometry(file: &Path) -> Result<IconGeometry> {
    let text = std::fs::read_to_string(file).map_err(|e| {
        ChooserError::Configuration(format!("cannot read {}: {e}", file.display()))
    })?;
    debug!(file = %file.display(), bytes = text.len(), "read icon file");
    if file.extension().is_some_and(|ext| ext == "json") {
        parse_icon_json(&text)
    } else {
        parse_svg_text(&text)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ChooserError::Configuration(format!("cannot serialize output: {e}")))
}

fn resolve_config_path(path: Option<PathBuf>) -> Result<PathBuf> {
    path.or_else(config::config_path)
        .ok_or_else(|| ChooserError::Configuration("no config directory available".into()))
}

fn run(command: Command) -> Result<String> {
    match command {
        Command::Parse { file } => to_json(&read_geometry(&file)?),
        Command::Render {
            file,
            size,
            prefix,
            name,
        } => {
            let geometry = read_geometry(&file)?;
            let name = name
                .or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "icon".to_string());
            Ok(render_svg(&IconDefinition::new(prefix, name, geometry), size))
        }
        Command::Families { version, pro } => {
            let context = LicenseContext::new(&version, pro, None)?;
            let available = FamilyStyleTable::defaults().filtered(|fs| context.is_available(fs));
            let mut matrix: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
            for (family_style, prefix) in available.entries() {
                matrix
                    .entry(family_style.family)
                    .or_default()
                    .insert(family_style.style, prefix.to_string());
            }
            to_json(&matrix)
        }
        Command::Urls {
            version,
            pro,
            kit_token,
        } => {
            let context = LicenseContext::new(&version, pro, kit_token)?;
            let version = context.version_string();
            let token = context.kit_token.as_deref();
            let base_url = technology::cdn_base_url(pro);
            let mut urls = BTreeMap::new();
            urls.insert(
                "script",
                technology::library_script_url(&base_url, &version, pro, token),
            );
            urls.insert("stylesheet", technology::cdn_stylesheet_url(&version, pro));
            if let Some(token) = token {
                urls.insert("kit", technology::kit_script_url(token));
            }
            to_json(&urls)
        }
        Command::CheckConfig { config: path } => {
            let path = resolve_config_path(path)?;
            let loaded = config::load_config_from(&path);
            loaded.validate()?;
            Ok(format!("{}: ok", path.display()))
        }
        Command::InitConfig { config: path } => {
            let path = resolve_config_path(path)?;
            config::save_config_to(&ChooserConfig::default(), &path).map_err(|e| {
                ChooserError::Configuration(format!("cannot write {}: {e}", path.display()))
            })?;
            Ok(format!("wrote {}", path.display()))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["icon-chooser"]).is_err());
    }

    #[test]
    fn cli_verbose_three() {
        let cli = Cli::try_parse_from(["icon-chooser", "-vvv", "parse", "a.svg"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn cli_render_options() {
        let cli = Cli::try_parse_from([
            "icon-chooser",
            "render",
            "house.svg",
            "--size",
            "2x",
            "--prefix",
            "far",
        ])
        .unwrap();
        match cli.command {
            Command::Render {
                size, prefix, name, ..
            } => {
                assert_eq!(size, IconSize::Multiple(2));
                assert_eq!(prefix, "far");
                assert!(name.is_none());
            }
            _ => panic!("expected Render command"),
        }
    }

    #[test]
    fn cli_rejects_bad_size() {
        assert!(
            Cli::try_parse_from(["icon-chooser", "render", "a.svg", "--size", "huge"]).is_err()
        );
    }

    #[test]
    fn cli_families() {
        let cli =
            Cli::try_parse_from(["icon-chooser", "families", "--version", "6.x", "--pro"]).unwrap();
        match cli.command {
            Command::Families { version, pro } => {
                assert_eq!(version, "6.x");
                assert!(pro);
            }
            _ => panic!("expected Families command"),
        }
    }

    #[test]
    fn families_output_is_gated() {
        let output = run(Command::Families {
            version: "6.2.0".into(),
            pro: true,
        })
        .unwrap();
        let matrix: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(matrix["sharp"]["solid"], "fass");
        assert!(matrix["sharp"].get("regular").is_none());
        assert_eq!(matrix["duotone"]["solid"], "fad");
    }

    #[test]
    fn urls_resolve_version_alias() {
        let output = run(Command::Urls {
            version: "5.x".into(),
            pro: false,
            kit_token: None,
        })
        .unwrap();
        let urls: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            urls["script"],
            "https://use.fontawesome.com/releases/v5.15.3/js/all.js"
        );
        assert_eq!(
            urls["stylesheet"],
            "https://use.fontawesome.com/releases/v5.15.3/css/all.css"
        );
        assert!(urls.get("kit").is_none());
    }

    #[test]
    fn urls_for_pro_kit() {
        let cli = Cli::try_parse_from([
            "icon-chooser",
            "urls",
            "--version",
            "6.4.0",
            "--pro",
            "--kit-token",
            "deadbeef00",
        ])
        .unwrap();
        let urls: serde_json::Value = serde_json::from_str(&run(cli.command).unwrap()).unwrap();
        assert_eq!(
            urls["script"],
            "https://pro.fontawesome.com/releases/v6.4.0/js/pro.min.js?token=deadbeef00"
        );
        assert_eq!(urls["kit"], "https://kit.fontawesome.com/deadbeef00.js");
    }

    #[test]
    fn render_uses_file_stem_as_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("house.svg");
        fs::write(&file, r#"<svg viewBox="0 0 576 512"><path d="M1"/></svg>"#).unwrap();

        let output = run(Command::Render {
            file,
            size: IconSize::Normal,
            prefix: "fas".into(),
            name: None,
        })
        .unwrap();
        assert!(output.contains("fa-house"));
        assert!(output.contains(r#"viewBox="0 0 576 512""#));
    }

    #[test]
    fn init_then_check_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        run(Command::InitConfig {
            config: Some(path.clone()),
        })
        .unwrap();
        // Defaults carry neither a kit token nor a version.
        let err = run(Command::CheckConfig { config: Some(path) }).unwrap_err();
        assert!(matches!(err, ChooserError::Configuration(_)));
    }
}
