use std::process::ExitCode;

fn main() -> ExitCode {
    browsetrail_cli::run()
}
