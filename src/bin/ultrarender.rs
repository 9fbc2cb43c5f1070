fn main() -> anyhow::Result<()> {
    ultrarender::cli::run_cli()
}
