use clap::Parser;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = fzgate_cli::Args::parse();
    fzgate_cli::run(args)
}
