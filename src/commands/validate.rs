use crate::error::Result;
use crate::manifest::Manifest;
use crate::orderer::DependencyOrderer;
use std::path::Path;

pub fn execute(path: &Path) -> Result<()> {
    println!("Validating manifest {}...", path.display());

    let manifest = match Manifest::load(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            println!("✗ Manifest is invalid!");
            return Err(e);
        }
    };

    let order = DependencyOrderer::new(manifest.resources()).creation_order()?;
    println!("✓ Manifest is valid ({} resources)", manifest.len());
    if !order.is_empty() {
        let names: Vec<&str> = order.iter().map(|r| r.name.as_str()).collect();
        println!("  Creation order: {}", names.join(" -> "));
    }

    Ok(())
}
