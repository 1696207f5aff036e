use consul_fetch::cli::{output, resolve};
use consul_fetch::errors::FetchError;

fn main() {
    let config = match resolve(std::env::args_os()) {
        Ok(config) => config,
        // Clap prints usage, help or version and picks the exit code.
        Err(FetchError::Usage(e)) => e.exit(),
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    consul_fetch::logging::install_tracing(config.verbose);

    output::info(&format!("Trying to fetch: {}", config.request.key));

    match consul_fetch::materialize::run(&config) {
        Ok(path) => output::success(&format!("Wrote {}", path.display())),
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    }
}
