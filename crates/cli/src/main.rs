use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    krishimitr_cli::run()
}
