use lull::app::{AppStartupOptions, run_with_startup};
use lull::catalog::Catalog;
use lull::tray::FrontEnd;

#[derive(Debug, Default)]
struct CliArgs {
    console: bool,
    list: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    if args.list {
        print_catalog(&Catalog::builtin());
        return Ok(());
    }

    let settings = lull::config::load_settings()?;
    lull::logging::init(&settings.log_filter);

    let front_end = if args.console {
        FrontEnd::Console
    } else {
        FrontEnd::Auto
    };
    run_with_startup(AppStartupOptions { front_end }, settings)
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    for arg in &args {
        match arg.as_str() {
            "--console" => out.console = true,
            "--list" => out.list = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
    }
    Ok(out)
}

fn print_catalog(catalog: &Catalog) {
    for category in catalog.categories() {
        println!("{}", category.name);
        for track in &category.tracks {
            println!("  {:<28} {}", track.display_name, track.id);
        }
    }
}

fn print_help() {
    println!("lull - sleep sounds in the system tray");
    println!("  --console         Use the console front-end instead of the tray");
    println!("  --list            Print the sound catalog and exit");
}
