use anyhow::{Context, Result, bail};
use circosgen::generator::generate_artifacts;
use circosgen::genome_store::GenomeCatalog;
use std::collections::HashMap;
use std::path::Path;
use std::{env, fs};

const DEFAULT_CATALOG_PATH: &str = "genomes.json";
const DEFAULT_OUTPUT_DIR: &str = "images";

fn usage() {
    eprintln!(
        "Usage:\n  \
  circosgen_cli [--db PATH] [--out PATH] generate '<params-json>'\n  \
  circosgen_cli [--db PATH] list-genomes\n\n  \
  The params JSON is a flat map of form parameters, e.g.\n  \
  {{\"gid\": \"83332.12\", \"cds_forward\": \"on\", \"gc_content_plot_type\": \"line\"}}\n  \
  file_N values name local files whose contents become the uploaded track.\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn load_json_arg(value: &str) -> Result<String> {
    if let Some(path) = value.strip_prefix('@') {
        fs::read_to_string(path).with_context(|| format!("Could not read JSON file '{path}'"))
    } else {
        Ok(value.to_string())
    }
}

/// Replaces each `file_N` path value with the named file's contents.
fn resolve_upload_paths(parameters: &mut HashMap<String, String>) -> Result<()> {
    let upload_keys: Vec<String> = parameters
        .keys()
        .filter(|key| {
            key.strip_prefix("file_")
                .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        })
        .cloned()
        .collect();
    for key in upload_keys {
        let path = parameters[&key].clone();
        if path.is_empty() {
            continue;
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read upload file '{path}' for '{key}'"))?;
        parameters.insert(key, content);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut catalog_path = DEFAULT_CATALOG_PATH.to_string();
    let mut out_dir = DEFAULT_OUTPUT_DIR.to_string();

    let mut idx = 1;
    while idx < args.len() {
        match args[idx].as_str() {
            "--db" if idx + 1 < args.len() => {
                catalog_path = args[idx + 1].clone();
                idx += 2;
            }
            "--out" if idx + 1 < args.len() => {
                out_dir = args[idx + 1].clone();
                idx += 2;
            }
            _ => break,
        }
    }
    if idx >= args.len() {
        usage();
        bail!("Missing command");
    }

    let command = &args[idx];
    match command.as_str() {
        "list-genomes" => {
            let store = GenomeCatalog::from_json_file(&catalog_path)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            for genome in store.list_genomes() {
                println!("{genome}");
            }
            Ok(())
        }
        "generate" => {
            if idx + 1 >= args.len() {
                usage();
                bail!("Missing parameters JSON for generate");
            }
            let json = load_json_arg(&args[idx + 1])?;
            let mut parameters: HashMap<String, String> =
                serde_json::from_str(&json).context("Invalid parameters JSON")?;
            resolve_upload_paths(&mut parameters)?;

            let store = GenomeCatalog::from_json_file(&catalog_path)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            let summary = generate_artifacts(&store, &parameters, Path::new(&out_dir))
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            let text = serde_json::to_string_pretty(&summary)
                .context("Could not serialize job summary")?;
            println!("{text}");
            Ok(())
        }
        _ => {
            usage();
            bail!("Unknown command '{command}'");
        }
    }
}
