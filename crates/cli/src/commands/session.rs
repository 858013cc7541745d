use pestpro_api::{HttpBackend, LoginError};
use pestpro_core::store::SessionStore;
use serde_json::json;

use crate::commands::{
    load_config, open_store, runtime, CommandResult, EXIT_IO, EXIT_REJECTED, EXIT_RUNTIME,
    EXIT_SUBMISSION,
};

pub fn login(email: &str) -> CommandResult {
    const COMMAND: &str = "login";
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let backend = match HttpBackend::from_config(&config.api) {
        Ok(backend) => backend,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "client_init",
                format!("failed to build backend client: {error}"),
                EXIT_RUNTIME,
            );
        }
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let session = SessionStore::new(open_store(&config));

    runtime.block_on(async {
        let user = match backend.login(email.trim()).await {
            Ok(user) => user,
            Err(error @ LoginError::UnknownUser(_)) => {
                return CommandResult::failure(
                    COMMAND,
                    "unknown_user",
                    error.to_string(),
                    EXIT_REJECTED,
                );
            }
            Err(LoginError::Gateway(error)) => {
                return CommandResult::failure(
                    COMMAND,
                    "backend_unavailable",
                    format!("login request failed: {error}"),
                    EXIT_SUBMISSION,
                );
            }
        };

        match session.sign_in(&user).await {
            Ok(()) => CommandResult::success_with_details(
                COMMAND,
                format!("signed in as {}", user.email),
                Some(json!({ "email": user.email, "role": user.role })),
            ),
            Err(error) => CommandResult::failure(COMMAND, "store", error.to_string(), EXIT_IO),
        }
    })
}

pub fn logout() -> CommandResult {
    const COMMAND: &str = "logout";
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let session = SessionStore::new(open_store(&config));

    match runtime.block_on(session.sign_out()) {
        Ok(()) => CommandResult::success(COMMAND, "signed out"),
        Err(error) => CommandResult::failure(COMMAND, "store", error.to_string(), EXIT_IO),
    }
}

pub fn whoami() -> CommandResult {
    const COMMAND: &str = "whoami";
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let session = SessionStore::new(open_store(&config));

    match runtime.block_on(session.current_user()) {
        Ok(Some(user)) => CommandResult::success_with_details(
            COMMAND,
            format!("signed in as {}", user.email),
            Some(json!({ "email": user.email, "role": user.role })),
        ),
        Ok(None) => {
            CommandResult::failure(COMMAND, "not_signed_in", "no user is signed in", EXIT_REJECTED)
        }
        Err(error) => CommandResult::failure(COMMAND, "store", error.to_string(), EXIT_IO),
    }
}
