fn main() -> anyhow::Result<()> {
    wellsense_lib::run()
}
