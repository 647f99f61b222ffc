mod actuator;
mod command;
mod config;
mod link;
mod maintenance;
mod session;
mod system;

use actuator::{ActuatorDriver, SysfsLine};
use command::CommandInterpreter;
use config::GateConfig;
use link::{EthernetMonitor, LinkSupervisor};
use maintenance::{Maintenance, UpdateService};
use session::{MqttSession, SessionSupervisor};
use std::sync::Arc;
use system::{ProcessRestart, Restart};

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = GateConfig::default();
    info!("Booting GateKeeper, version {}", env!("CARGO_PKG_VERSION"));

    let restart: Arc<dyn Restart> = Arc::new(ProcessRestart);

    // Network link first: nothing below runs until an address is acquired
    let monitor = EthernetMonitor::new(&config.link.interface, config.link.tick);
    let mut link = LinkSupervisor::new(
        config.link.clone(),
        &config.identity,
        monitor,
        restart.clone(),
    );
    link.establish().await?;

    // Broker session: bound once, reused for the whole process lifetime
    let mqtt = MqttSession::new(&config.identity, &config.session.host, config.session.port);
    let mut session = SessionSupervisor::new(config.session.clone(), mqtt);
    session.setup().await;

    let line = SysfsLine::open(config.gate_line)?;
    let mut interpreter =
        CommandInterpreter::new(ActuatorDriver::new(line), restart.clone(), config.pulse);

    let mut maintenance = UpdateService::new(&config.identity, config.update_port);

    info!("READY");
    tokio::time::sleep(config.ready_delay).await;

    loop {
        if !session.ensure_session().await {
            warn!("Broker session still down, retrying next iteration");
        }
        if let Some(message) = session.poll().await {
            interpreter
                .on_message(&message.topic, &message.payload)
                .await;
        }
        maintenance.tick().await;
    }
}
