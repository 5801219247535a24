use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    dunbar::cli::run()
}
