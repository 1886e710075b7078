use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

use adg::cli::{Cli, Commands};

/// Environment variable holding a tracing filter, e.g. `ADG_LOG=adg=debug`
const LOG_ENV: &str = "ADG_LOG";

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "adg=debug",
        _ => "adg=trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(global.verbose);

    match cli.command {
        Commands::Corpus(cmd) => adg::cli::commands::corpus::run(cmd, &global),
        Commands::Design(cmd) => adg::cli::commands::design::run(cmd, &global),
        Commands::Query(args) => adg::cli::commands::query::run(args, &global),
        Commands::Study(args) => adg::cli::commands::study::run(args, &global),
    }
}
