fn main() -> anyhow::Result<()> {
    autopattern_lib::run()
}
