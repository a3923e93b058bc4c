//! Skill Engine - Command Line Front End
//!
//! Commands:
//! - list: installed skills plus the pending-proposal count
//! - show <name>: skill details
//! - delete <name> [--yes]: remove a skill and its script

use std::io::{self, Write};

use skill_engine::{display_value, EngineConfig, ProposalStore, SkillStore, UsageExample};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().skip(1).collect();
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode || args.is_empty() {
        print_usage();
        return Ok(());
    }

    // Logging goes to stderr so command output stays clean
    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        })
        .unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = EngineConfig::from_env()?;

    match args[0].as_str() {
        "list" => list_skills(&config),
        "show" => {
            let name = positional_arg(&args, "show <name>")?;
            show_skill(&config, &name)
        }
        "delete" => {
            let yes = args.iter().any(|a| a == "--yes" || a == "-y");
            let name = positional_arg(&args, "delete <name> [--yes]")?;
            delete_skill(&config, &name, yes)
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    println!("Skill Engine v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: skill-engine <COMMAND>");
    println!();
    println!("Commands:");
    println!("  list                   List installed skills");
    println!("  show <name>            Show skill details");
    println!("  delete <name> [--yes]  Delete a skill and its script");
    println!("  --help, -h             Show this help");
    println!();
    println!("Environment variables:");
    println!("  SKILL_ENGINE_ROOT    Project root holding .skill-engine/ (default: .)");
}

/// First non-flag argument after the command name.
fn positional_arg(args: &[String], usage: &str) -> anyhow::Result<String> {
    args[1..]
        .iter()
        .find(|a| !a.starts_with('-'))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Usage: skill-engine {}", usage))
}

fn list_skills(config: &EngineConfig) -> anyhow::Result<()> {
    let store = SkillStore::open(config.skills_dir())?;
    let skills = store.list()?;

    if skills.is_empty() {
        println!("No skills found.");
        println!();
        println!("Skills are proposed by extraction and installed once approved.");
    } else {
        println!("Available Skills ({}):", skills.len());
        println!();
        for skill in &skills {
            println!("• {} (v{})", skill.display_name(), skill.version);
            println!("  Name: {}", skill.name);
            println!("  {}", skill.description);
            println!();
        }
    }

    let proposals = ProposalStore::open(config.proposals_dir())?;
    let pending = proposals.pending_count()?;
    if pending > 0 {
        println!("{} proposal(s) pending review.", pending);
    }

    Ok(())
}

fn show_skill(config: &EngineConfig, name: &str) -> anyhow::Result<()> {
    let store = SkillStore::open(config.skills_dir())?;
    let skill = match store.get(name)? {
        Some(skill) => skill,
        None => {
            eprintln!("Skill not found: {}", name);
            std::process::exit(1);
        }
    };

    println!("{} (v{})", skill.display_name(), skill.version);
    println!();
    println!("Description:");
    println!("  {}", skill.description);

    if !skill.parameters.is_empty() {
        println!();
        println!("Parameters:");
        for parameter in &skill.parameters {
            let marker = if parameter.required { "*" } else { " " };
            let default = match &parameter.default {
                Some(value) => format!(" (default: {})", display_value(value)),
                None => String::new(),
            };
            println!("  {} {}: {}{}", marker, parameter.name, parameter.kind, default);
            if let Some(description) = &parameter.description {
                println!("    {}", description);
            }
        }
    }

    if !skill.examples.is_empty() {
        println!();
        println!("Examples:");
        for example in &skill.examples {
            match example {
                UsageExample::Line(command) => println!("  $ {}", command),
                UsageExample::Hint {
                    command,
                    description,
                } => {
                    if let Some(description) = description {
                        println!("  {}", description);
                    }
                    if let Some(command) = command {
                        println!("  $ {}", command);
                    }
                }
            }
        }
    }

    Ok(())
}

fn delete_skill(config: &EngineConfig, name: &str, yes: bool) -> anyhow::Result<()> {
    let store = SkillStore::open(config.skills_dir())?;
    if !store.exists(name) {
        eprintln!("Skill not found: {}", name);
        std::process::exit(1);
    }

    if !yes {
        print!("Delete skill '{}'? (y/N): ", name);
        io::stdout().flush()?;
        let mut confirm = String::new();
        io::stdin().read_line(&mut confirm)?;
        if confirm.trim().to_lowercase() != "y" {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if store.delete(name)? {
        println!("Skill deleted: {}", name);
    } else {
        eprintln!("Failed to delete skill: {}", name);
        std::process::exit(1);
    }

    Ok(())
}
