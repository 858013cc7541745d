use pestpro_core::store::{PresetError, PresetStore};
use serde_json::json;

use crate::commands::{load_config, open_store, runtime, CommandResult, EXIT_IO, EXIT_REJECTED};

const COMMAND: &str = "presets";

#[derive(Clone, Debug)]
pub enum PresetAction {
    List,
    Add(String),
    Remove(String),
}

pub fn run(action: PresetAction) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let presets = PresetStore::new(open_store(&config));

    let outcome = runtime.block_on(async {
        match &action {
            PresetAction::List => presets.list().await.map_err(PresetError::from),
            PresetAction::Add(label) => presets.add(label).await,
            PresetAction::Remove(label) => presets.remove(label).await,
        }
    });

    match outcome {
        Ok(list) => CommandResult::success_with_details(
            COMMAND,
            format!("{} presets", list.len()),
            Some(json!({ "presets": list })),
        ),
        Err(PresetError::Store(error)) => {
            CommandResult::failure(COMMAND, "store", error.to_string(), EXIT_IO)
        }
        Err(error) => {
            CommandResult::failure(COMMAND, "preset_rejected", error.to_string(), EXIT_REJECTED)
        }
    }
}
