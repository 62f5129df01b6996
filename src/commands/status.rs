use anyhow::Result;
use std::path::PathBuf;
use w2m::{import::MappingCheckpoint, types::EntityType};

pub fn show_mapping_status(mapping_path: PathBuf) -> Result<()> {
    if !mapping_path.exists() {
        anyhow::bail!("Mapping checkpoint not found: {}", mapping_path.display());
    }

    let checkpoint = MappingCheckpoint::load(&mapping_path)
        .map_err(|e| anyhow::anyhow!("Failed to load mapping checkpoint: {}", e))?;

    println!("\nMapping Checkpoint Status");
    println!("=========================");
    println!("Source file:  {}", checkpoint.source_path.display());
    println!("Timestamp:    {}", checkpoint.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    for entity_type in EntityType::PASS_ORDER {
        println!("{:<13} {}", format!("{}s:", entity_type), checkpoint.count(entity_type));
    }
    println!("Pending:      {}", checkpoint.pending.len());
    for relation in &checkpoint.pending {
        println!("  {}", relation);
    }
    println!("\nTo resume the import, run:");
    println!(
        "  w2m import {} --mapping {}",
        checkpoint.source_path.display(),
        mapping_path.display()
    );

    Ok(())
}
