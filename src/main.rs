use anyhow::Result;
use logtally::report::{fmt, OutputFormat};
use logtally::{cli, dispatch};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if cli::has_flag(&args, "--help")
        || cli::has_flag(&args, "-h")
        || args.first().map(|s| s.as_str()) == Some("help")
    {
        cli::print_help();
        return Ok(());
    }
    if cli::has_flag(&args, "--version") || cli::has_flag(&args, "-V") {
        println!("logtally {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let plan = cli::parse_args(&args)?.into_plan()?;
    if plan.no_color {
        fmt::disable_color();
    }
    if plan.config.verbose {
        cli::print_plan(&plan);
    }

    let report = dispatch::run(plan.paths, &plan.config).await;
    if plan.config.verbose {
        cli::print_file_summary(&report);
    }

    let color = plan.format == OutputFormat::Text && fmt::use_color();
    let rendered = plan.config.kind.render(&report.table, plan.format, color)?;
    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
    Ok(())
}
