fn main() -> anyhow::Result<()> {
    tabql_engine::cli::main()
}
