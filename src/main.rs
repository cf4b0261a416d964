use glass_bloom::config::DemoConfig;

fn main() -> anyhow::Result<()> {
    glass_bloom::run_demo(DemoConfig::default())
}
