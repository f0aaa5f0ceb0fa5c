use anyhow::bail;

use runmcp_store::{is_rfc4122_uuid, Storage};

use crate::cli::args::{Cli, OrgArgs, OrgCommand};
use crate::cli::commands::EXIT_SUCCESS;

pub fn run(cli: &Cli, args: &OrgArgs) -> anyhow::Result<i32> {
    let mut storage = Storage::open_or_create(&cli.storage_file)?;

    match &args.cmd {
        OrgCommand::Show => {
            if storage.data.org_uuid.is_empty() {
                println!("No organization UUID set");
            } else {
                println!("{}", storage.data.org_uuid);
            }
        }
        OrgCommand::Register { uuid } => {
            if !is_rfc4122_uuid(uuid) {
                bail!(
                    "Invalid organization UUID: {uuid:?}. Expected an RFC 4122 UUID \
(example: 123e4567-e89b-12d3-a456-426614174000)."
                );
            }
            storage.data.org_uuid = uuid.clone();
            storage.save()?;
            println!("Organization UUID set to {}", storage.data.org_uuid);
        }
        OrgCommand::Clear => {
            storage.data.org_uuid.clear();
            storage.save()?;
            println!("Organization UUID cleared");
        }
    }
    Ok(EXIT_SUCCESS)
}
