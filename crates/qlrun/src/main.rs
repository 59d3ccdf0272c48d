//! qlrun - acquire the CodeQL bundle and drive its analysis pipeline.

use qlrun::cli::{EXIT_CLI, EXIT_OK, exit_code_for, parse, render_error};
use qlrun::{commands, logging};

#[tokio::main]
async fn main() {
    let cli = parse();

    if let Err(e) = logging::init_tracing(cli.level) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_CLI);
    }

    let code = match commands::execute(cli.command, cli.codeql).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}
