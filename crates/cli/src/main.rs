use std::process::ExitCode;

fn main() -> ExitCode {
    bookmatch_cli::run()
}
