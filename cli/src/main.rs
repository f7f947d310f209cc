use std::path::PathBuf;
use std::process::ExitCode;

use plover::{BuildContext, BuildMode, Failure};
use tracing_subscriber::EnvFilter;

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        cmd plover {
            /// Build the site in the project directory.
            cmd build {
                /// Project root. Defaults to the current directory.
                optional -r, --root root: PathBuf
                /// Keep the staging directory instead of replacing the live output.
                optional --dev
                /// Log build progress.
                optional -v, --verbose
            }
        }
    }
}

fn main() -> ExitCode {
    let flags = flags::Plover::from_env_or_exit();
    let flags::PloverCmd::Build(args) = flags.subcommand;

    let filter = match args.verbose {
        true => EnvFilter::new("info"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let root = args.root.unwrap_or_else(|| PathBuf::from("."));
    let mode = args.dev.then_some(BuildMode::Development);
    let result = BuildContext::load(&root, mode)
        .map_err(Failure::from)
        .and_then(|ctx| plover::pipeline::build(&ctx));

    match result {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(failure @ Failure::Aborted(_)) => {
            eprintln!("error: {failure}");
            ExitCode::from(1)
        }
        Err(failure @ Failure::SiteDown { .. }) => {
            eprintln!("!!! CRITICAL: THE LIVE SITE MAY BE DOWN !!!");
            eprintln!("{failure}");
            ExitCode::from(2)
        }
    }
}
