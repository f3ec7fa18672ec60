use std::process::ExitCode;

fn main() -> ExitCode {
    cartmatch_cli::run()
}
