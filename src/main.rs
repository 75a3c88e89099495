//! Stellari - AI persona builder
//!
//! This is the main entry point for the Stellari binary. Personas are built
//! from an industry template and a short questionnaire, their system
//! instructions are generated by a language model (or an offline template),
//! and every saved edit is kept as a new version in the persona store.

mod app;
mod catalog;
mod cli;
mod config;
mod error;
mod form;
mod generator;
mod logging;
mod persona;
mod store;
#[cfg(test)]
mod testing;
mod types;
mod version;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, info};

use crate::app::{App, BuilderSession};
use crate::catalog::IndustryCatalog;
use crate::cli::{Cli, Commands, FormArgs, PersonaSubcommand};
use crate::config::StellariConfig;
use crate::error::{Error, Result};
use crate::form::{DynamicForm, NAME_FIELD};
use crate::generator::{create_generator, InstructionGenerator};
use crate::persona::{export_file_name, persona_markdown};
use crate::store::{PersonaRepository, RestStore, Table};
use crate::types::{display_value, is_answered, Industry, Persona};

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // For commands that don't need full logging, use simple setup
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN)?;
            if let Err(e) = handle_config_command(subcommand.clone(), cli.config.as_deref()) {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
            return Ok(());
        }
        _ => {}
    }

    let config = match StellariConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    };

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting Stellari"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    if let Err(e) = runtime.block_on(run_command(cli.command, config)) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Dispatch the commands that need configuration and a runtime
async fn run_command(command: Commands, config: StellariConfig) -> Result<()> {
    let catalog = IndustryCatalog::builtin();

    match command {
        Commands::Industries => {
            print_industries(&catalog);
            Ok(())
        }
        Commands::Questions { industry, set } => {
            let industry = resolve_industry(&catalog, &industry)?;
            let generator = create_generator(config.generator_config())?;
            run_questions(industry, &set, generator.as_ref()).await
        }
        Commands::Draft {
            industry,
            form,
            output,
        } => {
            let industry = resolve_industry(&catalog, &industry)?;
            let generator = create_generator(config.generator_config())?;
            run_draft(industry, &form, output.as_deref(), generator.as_ref()).await
        }
        Commands::Persona { subcommand } => handle_persona_command(subcommand, &config, catalog).await,
        Commands::Version | Commands::Config { .. } => {
            // Already handled in main
            unreachable!();
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Catalog & Drafting
// ─────────────────────────────────────────────────────────────────

fn resolve_industry<'a>(catalog: &'a IndustryCatalog, id_or_name: &str) -> Result<&'a Industry> {
    catalog.find(id_or_name).ok_or_else(|| Error::UnknownIndustry {
        id: id_or_name.to_string(),
    })
}

fn print_industries(catalog: &IndustryCatalog) {
    for industry in catalog.all() {
        println!(
            "{} {:<12} {:<12} {}",
            industry.icon, industry.id, industry.name, industry.description
        );
    }
}

async fn run_questions(
    industry: &Industry,
    answers: &[(String, String)],
    generator: &dyn InstructionGenerator,
) -> Result<()> {
    let mut form = DynamicForm::new(industry, &Default::default());
    apply_answers(&mut form, answers);
    let added = form.add_generated_questions(generator).await;
    // Answers aimed at the new questions are coerced by their field types
    apply_answers(&mut form, answers);

    println!("{} {} ({} questions, {} generated)", industry.icon, industry.name, form.fields().len(), added);
    print_fields(&form);
    Ok(())
}

async fn run_draft(
    industry: &Industry,
    args: &FormArgs,
    output: Option<&str>,
    generator: &dyn InstructionGenerator,
) -> Result<()> {
    let mut session = BuilderSession::create();
    session.select_industry(industry);
    fill_form(&mut session, args, generator).await?;
    session.submit(generator).await?;

    match output {
        Some(path) => {
            let path = export_target(path, &session.export_file_name());
            write_file(&path, &session.export_markdown())?;
            println!("Exported to {}", path.display());
        }
        None => println!("{}", session.instructions()),
    }
    Ok(())
}

/// Apply `--set` answers and, if asked, fetch follow-up questions
async fn fill_form(
    session: &mut BuilderSession,
    args: &FormArgs,
    generator: &dyn InstructionGenerator,
) -> Result<()> {
    let form = session.form_mut().ok_or_else(|| {
        Error::form_validation("industry", "the persona's industry is unavailable; pass --industry")
    })?;

    apply_answers(form, &args.set);
    if !form.can_submit() {
        return Err(Error::form_validation(
            NAME_FIELD,
            "a persona name is required; pass --set name=<name>",
        ));
    }
    if args.more_questions {
        let before = form.fields().len();
        let added = form.add_generated_questions(generator).await;
        if added > 0 {
            apply_answers(form, &args.set);
            eprintln!("Follow-up questions (answer with --set <id>=<value>):");
            for field in &form.fields()[before..] {
                eprintln!("  {:<28} {}", field.id, field.label);
            }
        }
    }
    Ok(())
}

fn apply_answers(form: &mut DynamicForm, answers: &[(String, String)]) {
    for (field, value) in answers {
        form.set_raw(field, value);
    }
}

fn print_fields(form: &DynamicForm) {
    for field in form.fields() {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.ai_generated {
            flags.push("generated");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };

        println!("  {:<28} {:<11} {}{}", field.id, field.field_type.slug(), field.label, flags);
        if field.options.is_empty() {
            println!("  {:<28} {}", "", field.field_type.widget());
        } else {
            let options: Vec<&str> = field.options.iter().map(|o| o.value.as_str()).collect();
            println!("  {:<28} {}: {}", "", field.field_type.widget(), options.join(", "));
        }
        if let Some(value) = form.value(&field.id).filter(|v| is_answered(v)) {
            println!("  {:<28} answer: {}", "", display_value(value));
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Commands
// ─────────────────────────────────────────────────────────────────

async fn handle_persona_command(
    subcommand: PersonaSubcommand,
    config: &StellariConfig,
    catalog: IndustryCatalog,
) -> Result<()> {
    let store = RestStore::new(config.rest_store_config()?)?;
    let mut app = App::new(PersonaRepository::new(store), catalog);

    match subcommand {
        PersonaSubcommand::List => {
            if app.load().await == 0 {
                println!("No personas found.");
            }
            for persona in app.personas() {
                print_persona_line(persona);
            }
        }
        PersonaSubcommand::Show { id } => {
            let persona = fetch(&app, &id).await?;
            print_persona(&persona, app.catalog());
        }
        PersonaSubcommand::Shared { token } => {
            let persona = app
                .repository()
                .fetch_by_share_token(&token)
                .await
                .ok_or_else(|| Error::persona_not_found(token.as_str()))?;
            print_persona(&persona, app.catalog());
        }
        PersonaSubcommand::Create {
            industry,
            form,
            instructions_file,
        } => {
            let industry = resolve_industry(app.catalog(), &industry)?.clone();
            let generator = create_generator(config.generator_config())?;

            let mut session = app.create_new();
            session.select_industry(&industry);
            fill_form(&mut session, &form, generator.as_ref()).await?;
            session.submit(generator.as_ref()).await?;
            if let Some(path) = instructions_file {
                session.edit_instructions(read_file(&path)?);
            }

            let saved = save(&mut app, &session).await?;
            println!("Created persona {} ({})", saved.name, saved.id);
        }
        PersonaSubcommand::Edit {
            id,
            industry,
            form,
            instructions_file,
        } => {
            let industry = industry
                .map(|i| resolve_industry(app.catalog(), &i).cloned())
                .transpose()?;
            let generator = create_generator(config.generator_config())?;

            let mut session = app.select(&id).await?;
            if let Some(industry) = industry {
                session.select_industry(&industry);
            }
            fill_form(&mut session, &form, generator.as_ref()).await?;
            session.submit(generator.as_ref()).await?;
            if let Some(path) = instructions_file {
                session.edit_instructions(read_file(&path)?);
            }

            let saved = save(&mut app, &session).await?;
            println!("Saved {} as version {}", saved.name, saved.current_version);
        }
        PersonaSubcommand::Delete { id, yes } => {
            let persona = fetch(&app, &id).await?;
            if !yes {
                return Err(Error::ConfirmationRequired {
                    action: format!("delete \"{}\" and all of its versions", persona.name),
                });
            }
            if !app.delete(&id).await {
                return Err(Error::store_request(
                    Table::Personas.name(),
                    "persona was not deleted; see the log for details",
                ));
            }
            println!("Deleted {}", persona.name);
        }
        PersonaSubcommand::Share { id } => {
            let token = app
                .share(&id)
                .await
                .ok_or_else(|| Error::persona_not_found(id.as_str()))?;
            println!("{}", token);
        }
        PersonaSubcommand::Rollback { id, version } => {
            let persona = fetch(&app, &id).await?;
            if persona.version(version).is_none() {
                return Err(Error::VersionNotFound {
                    persona_id: id,
                    version,
                });
            }
            let rolled = app.rollback(&id, version).await.ok_or_else(|| {
                Error::store_request(
                    Table::PersonaVersions.name(),
                    "rollback was not saved; see the log for details",
                )
            })?;
            rolled
                .check_invariants()
                .map_err(|reason| Error::PersonaInconsistent {
                    id: rolled.id.clone(),
                    reason,
                })?;
            println!(
                "Restored version {} of {} as version {}",
                version, rolled.name, rolled.current_version
            );
        }
        PersonaSubcommand::Export { id, output } => {
            let persona = fetch(&app, &id).await?;
            let markdown = persona_markdown(&persona);
            match output {
                Some(path) => {
                    let path = export_target(&path, &export_file_name(&persona.current_form_data()));
                    write_file(&path, &markdown)?;
                    println!("Exported to {}", path.display());
                }
                None => print!("{}", markdown),
            }
        }
        PersonaSubcommand::History { id } => {
            let persona = fetch(&app, &id).await?;
            println!("{} ({})", persona.name, persona.id);
            for version in persona.versions_newest_first() {
                let marker = if version.version == persona.current_version {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} v{:<4} {}  {}",
                    marker,
                    version.version,
                    version.created_at.format("%Y-%m-%d %H:%M"),
                    first_line(&version.system_instructions)
                );
            }
        }
    }

    Ok(())
}

async fn fetch(app: &App<RestStore>, id: &str) -> Result<Persona> {
    app.repository()
        .fetch_by_id(id)
        .await
        .ok_or_else(|| Error::persona_not_found(id))
}

async fn save(app: &mut App<RestStore>, session: &BuilderSession) -> Result<Persona> {
    let saved = app.save(session).await?.ok_or_else(|| {
        Error::store_request(
            Table::Personas.name(),
            "persona was not saved; see the log for details",
        )
    })?;
    info!(
        persona_id = %saved.id,
        version = saved.current_version,
        "Persona saved"
    );
    Ok(saved)
}

fn print_persona_line(persona: &Persona) {
    let shared = persona
        .share_id
        .as_deref()
        .map(|t| format!("  shared:{}", t))
        .unwrap_or_default();
    println!(
        "{}  {:<24} {:<12} v{:<4} {}{}",
        persona.id,
        persona.name,
        persona.industry,
        persona.current_version,
        persona.updated_at.format("%Y-%m-%d %H:%M"),
        shared
    );
}

fn print_persona(persona: &Persona, catalog: &IndustryCatalog) {
    let industry = catalog
        .get(&persona.industry)
        .map(|i| format!("{} {}", i.icon, i.name))
        .unwrap_or_else(|| persona.industry.clone());

    println!("Name:        {}", persona.name);
    println!("ID:          {}", persona.id);
    println!("Industry:    {}", industry);
    if !persona.description.is_empty() {
        println!("Description: {}", persona.description);
    }
    println!(
        "Version:     {} of {}",
        persona.current_version,
        persona.versions.len()
    );
    println!("Created:     {}", persona.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Updated:     {}", persona.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(token) = &persona.share_id {
        println!("Share token: {}", token);
    }
    if !persona.knowledge_sources.is_empty() || !persona.tools.is_empty() {
        println!(
            "Attached:    {} knowledge sources, {} tools",
            persona.knowledge_sources.len(),
            persona.tools.len()
        );
    }
    println!();
    println!("{}", persona.system_instructions);
}

fn first_line(text: &str) -> &str {
    text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

// ─────────────────────────────────────────────────────────────────
// Files
// ─────────────────────────────────────────────────────────────────

fn read_file(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::IoRead {
        path: PathBuf::from(path),
        source: e,
    })
}

/// `--output` path, or `<dir>/<file_name>` when it names an existing directory
fn export_target(output: &str, file_name: &str) -> PathBuf {
    let path = PathBuf::from(shellexpand::tilde(output).into_owned());
    if path.is_dir() {
        path.join(file_name)
    } else {
        path
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).map_err(|e| Error::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| Error::IoWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;
        debug!(path = %dir.display(), "Created directory");
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Configuration Commands
// ─────────────────────────────────────────────────────────────────

/// Handle configuration subcommands
fn handle_config_command(subcommand: cli::ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    use cli::ConfigSubcommand;

    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = StellariConfig::load(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg.redacted())?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Wrote default configuration to {}", written.display());
        }
        ConfigSubcommand::Validate => match StellariConfig::load(config_path) {
            Ok(cfg) => {
                println!("Configuration is valid.");
                if !cfg.generator_config().is_configured() {
                    println!("No API key set: instructions use the offline template.");
                }
                if cfg.rest_store_config().is_err() {
                    println!("No store URL set: persona commands are unavailable.");
                }
            }
            Err(e) => {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
        },
    }

    Ok(())
}
