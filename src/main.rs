use std::{env, fs, path::PathBuf, process};

use anyhow::Context;

use rig2fbx::asset::FileAssetSource;
use rig2fbx::export::{ExportOptions, export_rig};

/// Built-in placeholder meshes ship next to the binary.
const BUILTIN_ASSET_DIR: &str = "./built-in";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: rig2fbx <description.json> <output.fbx>");
        process::exit(2);
    }

    let input = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);

    let description = fs::read_to_string(&input)
        .with_context(|| format!("failed to read description: {}", input.display()))?;

    let source = FileAssetSource::new(BUILTIN_ASSET_DIR);
    let result = export_rig(&description, &source, ExportOptions::default())?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    fs::write(&output, &result.document)
        .with_context(|| format!("failed to write output: {}", output.display()))?;

    // Referenced textures land beside the document.
    let texture_dir = output.parent().map(PathBuf::from).unwrap_or_default();
    for texture in &result.textures {
        let path = texture_dir.join(&texture.file_name);
        fs::write(&path, &texture.asset.payload)
            .with_context(|| format!("failed to write texture: {}", path.display()))?;
    }

    let report = &result.report;
    println!("Model: {}", report.model_name);
    println!(
        "Bones: {}, Meshes: {}, Locators: {}",
        report.bone_count, report.mesh_count, report.locator_count
    );
    println!(
        "Attachments: {}, Accessories: {}, Textures: {}",
        report.attachment_count, report.accessory_count, report.texture_count
    );
    for issue in &report.issues {
        println!("[{:?}] {}", issue.severity, issue.message);
    }
    println!("Saved: {}", output.display());

    Ok(())
}
