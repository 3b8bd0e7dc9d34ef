use anyhow::{bail, Result};
use quiver::schema::{ConfigStore, DocumentTypeLoader};
use std::path::Path;

/// Lint every document type under `dir`; fails if any config has issues.
pub fn run_lint(dir: &Path) -> Result<()> {
    let configs = DocumentTypeLoader::new(dir).load_all()?;
    let mut failed = 0;

    for config in &configs {
        let issues = DocumentTypeLoader::lint(config);
        if issues.is_empty() {
            println!("ok    {}/{}", config.project, config.name);
        } else {
            failed += 1;
            println!("FAIL  {}/{}", config.project, config.name);
            for issue in issues {
                println!("        - {}", issue);
            }
        }
    }

    // Cross-config checks, e.g. a document type declared twice in a project
    if let Err(e) = ConfigStore::from_configs(configs.clone()) {
        failed += 1;
        println!("FAIL  {}", e);
    }

    println!();
    println!("{} document types checked, {} with issues", configs.len(), failed);
    if failed > 0 {
        bail!("{} document type(s) failed lint", failed);
    }
    Ok(())
}
