use anyhow::{Context, Result};
use kestrel_copilot::cli::{ApplyArgs, CliCommand};
use kestrel_copilot::components::ComponentRegistry;
use kestrel_copilot::config::CopilotConfig;
use kestrel_copilot::material_registry::MaterialRegistry;
use kestrel_copilot::prefab::AssetLibrary;
use kestrel_copilot::project::DiskProject;
use kestrel_copilot::scene::SceneDocument;
use kestrel_copilot::scene_summary::{render_spatial, render_summary};
use kestrel_copilot::{AutoApprove, Copilot, DenyAll, DirectiveExtractor};
use std::fs;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    match CliCommand::parse_from_env()? {
        CliCommand::Extract { reply } => cmd_extract(&reply),
        CliCommand::Apply(args) => cmd_apply(args),
        CliCommand::Summary { scene } => cmd_summary(&scene),
        CliCommand::Create { scene, request } => cmd_create(&scene, &request),
        CliCommand::Help => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    eprintln!(
        "Copilot Tool

Usage:
  copilot_tool extract <reply>                     List the edit directives in an assistant reply
  copilot_tool apply <project> <scene> <reply>     Apply a reply to a project and scene, then save the scene
      --config <file>         Copilot config (JSON)
      --out <file>            Write the edited scene here instead of over <scene>
      --approve on|off        Answer for entity-creation and attach prompts (default on)
      --autowire on|off       Fill references on attached scripts
      --partial-merge on|off  Splice edits that elide code with 'existing code' markers
      --asset-root <dir>      Project directory scanned for prefabs
  copilot_tool summary <scene>                     Print the scene structure and spatial summary
  copilot_tool create <scene> \"<request>\"          Add a primitive described in plain words, then save
  copilot_tool help                                Show this message
"
    );
}

fn read_reply(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Reading reply file {}", path.display()))
}

fn cmd_extract(reply: &Path) -> Result<()> {
    let text = read_reply(reply)?;
    let config = CopilotConfig::default();
    let extractor = DirectiveExtractor::new(&config.file_edit_languages)?;
    let directives = extractor.extract(&text);
    if directives.is_empty() {
        println!("No directives found.");
    }
    for (index, directive) in directives.iter().enumerate() {
        match directive {
            Ok(directive) => println!("{index:>3}: {directive}"),
            Err(err) => println!("{index:>3}: invalid ({err})"),
        }
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => CopilotConfig::load(path)?,
        None => CopilotConfig::default(),
    };
    let overrides = args.overrides.clone().into_config_overrides();
    if !overrides.is_empty() {
        tracing::info!(target: "copilot::config", fields = ?overrides.applied_fields(), "applying CLI overrides");
        config.apply_overrides(&overrides);
    }

    let mut assets = AssetLibrary::new(args.project_root.join(&config.asset_root));
    assets.refresh()?;
    let approval: Box<dyn kestrel_copilot::ApprovalGate> =
        if args.approve { Box::new(AutoApprove) } else { Box::new(DenyAll) };
    let mut copilot = Copilot::new(config, Box::new(DiskProject::new(&args.project_root)))?
        .with_assets(assets)
        .with_approval(approval);
    copilot.load_scene(&args.scene)?;

    let text = read_reply(&args.reply)?;
    let messages = copilot.apply_response(&text);
    if messages.is_empty() {
        println!("No directives found.");
    }
    for message in &messages {
        println!("{message}");
    }

    let output = args.output.as_deref().unwrap_or(&args.scene);
    copilot.save_scene(output)?;
    println!("Saved scene to {}", output.display());
    Ok(())
}

fn cmd_summary(scene: &Path) -> Result<()> {
    let doc = SceneDocument::load_from_path(scene)?;
    let mut registry = ComponentRegistry::with_builtins();
    let mut materials = MaterialRegistry::new();
    let world = doc.instantiate(&mut registry, &mut materials)?;
    print!("{}", render_summary(&world, &registry));
    println!();
    print!("{}", render_spatial(&world, &registry));
    Ok(())
}

fn cmd_create(scene: &Path, request: &str) -> Result<()> {
    let project_root = scene.parent().unwrap_or_else(|| Path::new("."));
    let mut copilot = Copilot::new(CopilotConfig::default(), Box::new(DiskProject::new(project_root)))?;
    copilot.load_scene(scene)?;
    let Some(messages) = copilot.create_from_query(request) else {
        println!("Nothing to create in '{request}'.");
        return Ok(());
    };
    for message in &messages {
        println!("{message}");
    }
    if !copilot.ledger().is_empty() {
        copilot.save_scene(scene)?;
        println!("Saved scene to {}", scene.display());
    }
    Ok(())
}
