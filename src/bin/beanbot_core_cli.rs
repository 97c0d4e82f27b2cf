use std::process::ExitCode;

fn main() -> ExitCode {
    beanbot_core::init();
    if let Err(err) = beanbot_core::cli::run_cli() {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
