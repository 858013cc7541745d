use std::process::ExitCode;

fn main() -> ExitCode {
    pestpro_cli::run()
}
