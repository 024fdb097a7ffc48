fn main() -> anyhow::Result<()> {
    jobwatch_lib::run()
}
