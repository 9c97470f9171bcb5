use anyhow::Context;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    bookshelf_app::app::run(settings).await
}
