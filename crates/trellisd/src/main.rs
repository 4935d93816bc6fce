use std::process::ExitCode;

use trellis_plugins::PluginRegistry;

fn main() -> ExitCode {
    // Plugins register before serving; the stock binary starts empty and
    // answers `init` with an empty manifest.
    match trellisd::run(PluginRegistry::new()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "daemon exited");
            ExitCode::FAILURE
        }
    }
}
