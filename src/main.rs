fn main() -> anyhow::Result<()> {
    snakebind::run()
}
