use anyhow::Result;

use crate::exit;
use crate::router::Workspace;

pub fn run(ws: &Workspace, check: bool) -> Result<i32> {
    let width = ws.registry.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, regex) in ws.registry.iter() {
        println!("{name:<width$}  {regex}");
    }

    for warning in &ws.pattern_warnings {
        eprintln!("warning: {warning}");
    }

    Ok(if check && !ws.pattern_warnings.is_empty() {
        exit::FAILURE
    } else {
        exit::SUCCESS
    })
}
