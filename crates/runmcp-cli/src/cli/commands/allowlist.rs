use tracing::debug;

use runmcp_store::Storage;

use crate::cli::args::{AllowlistArgs, AllowlistCommand, Cli};
use crate::cli::commands::EXIT_SUCCESS;

pub fn run(cli: &Cli, args: &AllowlistArgs) -> anyhow::Result<i32> {
    let mut storage = Storage::open(&cli.storage_file)?;

    match &args.cmd {
        None => {
            view_allowlist(&storage);
        }
        Some(AllowlistCommand::Add {
            entity_type,
            name,
            hash,
        }) => {
            debug!(entity_type = %entity_type, name = %name, hash = %hash, "adding to allowlist");
            storage.allowlist_add(entity_type, hash)?;
        }
        Some(AllowlistCommand::Reset) => {
            debug!("resetting allowlist");
            storage.allowlist_reset()?;
        }
    }
    Ok(EXIT_SUCCESS)
}

/// Print the persisted allowlist grouped by entity type.
fn view_allowlist(storage: &Storage) {
    if storage.data.allowlist.is_empty() {
        println!("Allowlist is empty.");
        return;
    }
    for (entity_type, hashes) in &storage.data.allowlist {
        println!("{entity_type}:");
        for hash in hashes {
            println!("  - {hash}");
        }
    }
}
