fn main() -> anyhow::Result<()> {
    kafuffle::cli::run()
}
