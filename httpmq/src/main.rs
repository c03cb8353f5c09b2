use clap::Parser;
use env_logger::{Builder, Env};
use httpmq::{config, queue, Context, Result};
use log::{error, info};
use std::io::Write;
use tokio::signal;

fn setup_logger() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder
        .format(|buf, record| {
            let lvl = buf.default_level_style(record.level()).bold();

            writeln!(
                buf,
                "{} - [{lvl}{:5}{lvl:#}] {}:{} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .init();
}

#[tokio::main]
pub async fn main() -> Result<()> {
    setup_logger();

    #[cfg(feature = "tracing")]
    console_subscriber::init();

    let cli = config::Cli::parse();
    let config = config::resolve(&cli)?;

    let context = Context {
        queue_manager: queue::manager::start(),
    };

    let http_listen = config.http_listen()?;

    if let Err(e) = httpmq::start_http(context.clone(), http_listen).await {
        error!("Error listening on {}: {}", http_listen, e);

        return Err(e);
    }

    if let Some(admin_listen) = &config.network.admin_listen {
        if let Err(e) = httpmq::start_admin(context, admin_listen).await {
            error!("Error listening on {}: {}", admin_listen, e);

            return Err(e);
        }
    }

    signal::ctrl_c().await?;

    info!("Shutting down");

    Ok(())
}
