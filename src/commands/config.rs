use crate::cli::ConfigCommands;
use crate::commands::helpers;
use crate::config::{self, Config, CONFIG_FILE_NAME};
use crate::error::Result;
use crate::manifest::ResourceKind;
use crate::plan::Action;
use crate::template;
use std::path::{Path, PathBuf};

pub fn execute(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { file } => validate(file.as_deref()),
        ConfigCommands::Show { dir } => show(&project_dir(dir.as_deref())?),
    }
}

fn project_dir(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

fn validate(file: Option<&Path>) -> Result<()> {
    if let Some(path) = file {
        println!("Validating {}...", path.display());
        let result = Config::from_file(path).and_then(|c| c.validate());
        return report_validation(result);
    }

    let project_dir = std::env::current_dir()?;
    let project_config = project_dir.join(CONFIG_FILE_NAME);
    let global_config =
        config::global_config_path().unwrap_or_else(|| PathBuf::from("~").join(CONFIG_FILE_NAME));

    println!("Validating configuration files...\n");

    if global_config.exists() {
        println!("  Global config: {}", global_config.display());
    } else {
        println!(
            "  Global config: {} - not found (optional)",
            global_config.display()
        );
    }

    if project_config.exists() {
        println!("  Project config: {}", project_config.display());
    } else {
        println!(
            "  Project config: {} - not found (optional)",
            project_config.display()
        );
    }

    println!("\nLoading and validating configuration...");
    report_validation(Config::load(&project_dir).map(|_| ()))
}

fn report_validation(result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            println!("✓ Configuration is valid!");
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration is invalid!");
            Err(e)
        }
    }
}

fn show(project_dir: &Path) -> Result<()> {
    let config = Config::load(project_dir)?;

    println!("Effective Configuration:");
    println!("(CLI > Environment > Project config > Global config > Defaults)\n");

    println!("CLI:");
    let found = match helpers::find_program(&config.cli.program) {
        Some(path) => format!("found at {}", path.display()),
        None => "not found".to_string(),
    };
    println!("  program: {} ({})", config.cli.program, found);
    println!(
        "  environment: {}",
        config.cli.environment.as_deref().unwrap_or("(none)")
    );
    if config.cli.activate.is_empty() {
        println!("  activate: (disabled)");
    } else {
        println!("  activate: {}", config.cli.activate.join(" "));
    }
    match config.cli.timeout_secs {
        Some(secs) => println!("  timeout: {}s", secs),
        None => println!("  timeout: (none)"),
    }
    if !config.cli.vars.is_empty() {
        println!("  vars:");
        for key in config.cli.vars.keys() {
            println!("    - {}", key);
        }
    }

    println!("\nPolicy:");
    println!("  import: {}", config.policy.for_action(Action::Import));
    println!("  remove: {}", config.policy.for_action(Action::Remove));
    println!("  missing_ok:");
    for pattern in &config.policy.missing_ok {
        println!("    - {:?}", pattern);
    }

    println!("\nTemplates:");
    for kind in ResourceKind::ALL {
        for action in [Action::Import, Action::Remove] {
            let configured = config
                .templates
                .get(kind.as_str())
                .and_then(|t| t.get(action))
                .is_some();
            let line = match template::resolve(&config.templates, kind, action) {
                Ok(args) if configured => format!("{} (configured)", args.join(" ")),
                Ok(args) => args.join(" "),
                Err(e) => format!("✗ {}", e),
            };
            println!("  {:<14} {:<6} {}", kind.as_str(), action.as_str(), line);
        }
    }

    Ok(())
}
