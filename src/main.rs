fn main() -> anyhow::Result<()> {
    objrouter::cli::run_cli()
}
