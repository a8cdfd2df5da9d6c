use std::process::ExitCode;

fn main() -> ExitCode {
    scopewise_cli::run()
}
