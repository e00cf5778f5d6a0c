use std::path::Path;

use anyhow::{Context, Result};
use rewind_core::format::{load_flattened, parse, serialize, FsSource};

use crate::exit;

pub fn run(session: &Path, flatten: bool, json: bool) -> Result<i32> {
    let document = if flatten {
        load_flattened(session, &FsSource)?.to_document()
    } else {
        let text = std::fs::read_to_string(session)
            .map_err(|e| rewind_core::Error::io(session, e))?;
        parse(&text, session).map_err(rewind_core::Error::from)?
    };

    if json {
        let out = serde_json::to_string_pretty(&document).context("Failed to encode document")?;
        println!("{out}");
    } else {
        print!("{}", serialize(&document));
    }
    Ok(exit::SUCCESS)
}
