//! List the registered tool adapters

use anyhow::Result;
use benchplan_core::ToolRegistry;

/// List registered tool adapters
pub fn cmd_tools() -> Result<()> {
  let registry = ToolRegistry::builtin();

  println!("Registered Tool Adapters");
  println!("========================\n");
  for module in registry.modules() {
    println!("  {module}");
  }
  println!("\nA benchmark definition selects an adapter with its 'tool' entry,");
  println!("either by short name or by full module name.");

  Ok(())
}
