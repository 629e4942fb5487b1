use anyhow::{bail, Context, Result};
use multilingual_metadata::config::Config;
use multilingual_metadata::db::Database;
use multilingual_metadata::i18n::TagValidator;
use multilingual_metadata::multi::MultiField;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, PartialEq, Eq)]
struct ValidateArgs {
    sample_text: Option<String>,
    json: bool,
    tags: Vec<String>,
}

fn print_usage() {
    println!("Usage:");
    println!("  multilingual-metadata validate [--text SAMPLE] [--json] TAG...");
    println!("      Validate language tags against the subtag database");
    println!("  multilingual-metadata unpack PACKED");
    println!("      Decode a packed multi-language field value");
    println!();
    println!("Environment:");
    println!("  ZLS_DATABASE_PATH   SQLite database built by build-registry (default data/zls.sqlite)");
}

fn parse_validate_args(args: &[String]) -> Result<ValidateArgs> {
    let mut parsed = ValidateArgs {
        sample_text: None,
        json: false,
        tags: Vec::new(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => parsed.json = true,
            "--text" => {
                let text = iter.next().context("--text needs a sample string")?;
                parsed.sample_text = Some(text.clone());
            }
            _ => parsed.tags.push(arg.clone()),
        }
    }

    if parsed.tags.is_empty() {
        bail!("No language tags given");
    }
    Ok(parsed)
}

fn run_validate(config: &Config, args: ValidateArgs) -> Result<()> {
    let db = Database::new(&config.database_path)?;
    if db.subtag_count()? == 0 {
        warn!(
            "Subtag database at {} is empty, run build-registry first",
            config.database_path
        );
    }

    let validator = TagValidator::new(db);
    let mut invalid = 0;

    for tag in &args.tags {
        let result = validator.validate(tag, args.sample_text.as_deref());
        if result.is_err() {
            invalid += 1;
        }

        match (&result, args.json) {
            (Ok(validated), true) => {
                let line = json!({ "tag": tag, "valid": true, "subtags": validated.subtags() });
                println!("{}", line);
            }
            (Err(e), true) => {
                let line = json!({ "tag": tag, "valid": false, "error": e.to_string() });
                println!("{}", line);
            }
            (Ok(validated), false) => {
                println!("✓ {} -> {}", tag, validated);
                for subtag in validated.subtags() {
                    println!(
                        "    {:<8} {:<10} {}",
                        subtag.kind.to_string(),
                        subtag.value,
                        subtag.description
                    );
                }
            }
            (Err(e), false) => println!("✗ {}: {}", tag, e),
        }
    }

    info!("Validated {} tags, {} invalid", args.tags.len(), invalid);
    if invalid > 0 {
        bail!("{} of {} tags are invalid", invalid, args.tags.len());
    }
    Ok(())
}

fn run_unpack(packed: &str) -> Result<()> {
    let field = MultiField::decode(packed);
    if field.is_corrupt() {
        warn!("Packed value is corrupt, showing what could be recovered");
    }

    println!("{}", serde_json::to_string_pretty(&field)?);
    Ok(())
}

fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multilingual_metadata=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "validate" => {
            let config = Config::from_env()?;
            let validate_args = parse_validate_args(&args[2..])?;
            run_validate(&config, validate_args)
        }
        "unpack" => {
            let packed = args.get(2).context("unpack needs a packed value")?;
            run_unpack(packed)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            bail!("Unknown command: {}", other)
        }
    }
}
