use std::process::ExitCode;

fn main() -> ExitCode {
    answer_cli::run()
}
