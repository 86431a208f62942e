//! Example: Load and display the filter code tables from the code-tables directory.

use trawl_codes::{CodeLoader, CodeRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading code tables from code-tables/...\n");

    let loader = match CodeLoader::with_default_dir() {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("\nMake sure you're running this from the workspace root!");
            return Err(Box::new(e));
        }
    };

    let registry = CodeRegistry::load_from(&loader)?;

    println!("✓ Loaded {} code tables:\n", registry.count());

    for field in registry.fields() {
        let Some(table) = registry.table(field) else {
            continue;
        };
        println!("  • {field} (param `{}`): {} entries", field.param_name(), table.len());
        for (name, code) in table.iter().take(5) {
            println!("      {name} => {code}");
        }
        if table.len() > 5 {
            println!("      ...");
        }
        println!();
    }

    Ok(())
}
