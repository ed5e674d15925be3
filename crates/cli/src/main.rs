use std::process::ExitCode;

fn main() -> ExitCode {
    coverdesk_cli::run()
}
