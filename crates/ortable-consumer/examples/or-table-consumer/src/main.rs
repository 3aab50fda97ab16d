use std::io::Write;
use std::time::Duration;

use clap::Parser;

use ortable::report::Report;

use ortable_consumer::controller::{Controller, DeviceSender};
use ortable_consumer::discovery::Discovery;
use ortable_consumer::menu::MenuAction;
use ortable_consumer::reports::ReportPayload;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Receiver;

use tracing::{error, info, warn};

use tracing_subscriber::EnvFilter;

// Endpoint reference of the demo provider.
const TARGET_EPR: &str = "urn:uuid:sdcx-ORTableProvider-1234-12345";

#[derive(Debug, thiserror::Error)]
enum ConsumerError {
    #[error(transparent)]
    Consumer(#[from] ortable_consumer::error::Error),
    #[error("Invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("Console error: {0}")]
    Console(#[from] std::io::Error),
    #[error("No provider with endpoint reference `{0}` found")]
    NotFound(String),
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Provider address, i.e. `http://192.168.1.10:10000`.
    ///
    /// When missing, the provider is searched on the network.
    #[arg(short, long)]
    address: Option<String>,

    /// Endpoint reference of the provider.
    #[arg(long, default_value_t = String::from(TARGET_EPR))]
    epr: String,

    /// Discovery timeout, in milliseconds.
    #[arg(short, long, default_value_t = 3000)]
    timeout: u64,

    /// Number of reports buffered before the provider stream is paused.
    #[arg(long, default_value_t = 64)]
    buffer: usize,

    /// Log filter, i.e. `info` or `ortable_consumer=debug`.
    #[arg(short, long, default_value = "info")]
    log: String,
}

async fn print_reports(mut receiver: Receiver<ReportPayload>) {
    while let Some(ReportPayload { id, report }) = receiver.recv().await {
        match report {
            Report::Metrics(snapshot) => {
                let values = snapshot
                    .state
                    .iter()
                    .map(|(axis, value)| format!("{axis} {value:.1}{}", axis.unit()))
                    .collect::<Vec<_>>();
                info!("Device {id} metrics: {}", values.join(", "));
            }
            Report::Alert(changes) => {
                for change in changes {
                    let presence = if change.presence { "present" } else { "absent" };
                    warn!("Device {id} alert: {} alarm {presence}", change.axis);
                }
            }
            Report::OperationInvoked(invocation) => info!(
                "Device {id} operation invoked: `{}` transaction {} state {}",
                invocation.operation, invocation.transaction_id, invocation.invocation_state,
            ),
        }
    }
}

async fn run_action(sender: &DeviceSender<'_>, action: MenuAction) {
    match action {
        MenuAction::Execute(command) => match sender.execute(command).await {
            Ok(invocation) => println!(
                "`{command}` finished with state {} (transaction {})",
                invocation.invocation_state, invocation.transaction_id
            ),
            Err(e) => error!("`{command}` failed: {e}"),
        },
        MenuAction::Status => match sender.status().await {
            Ok(snapshot) => {
                for (axis, value) in snapshot.state.iter() {
                    let alarm = if snapshot.alarms.get(axis) { " [ALARM]" } else { "" };
                    println!("{axis}: {value:.1}{}{alarm}", axis.unit());
                }
                println!("Selected preset: {}", snapshot.selected_preset);
            }
            Err(e) => error!("Unable to retrieve the status: {e}"),
        },
        MenuAction::Exit => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), ConsumerError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log)?)
        .init();

    let discovery = Discovery::default()
        .timeout(Duration::from_millis(cli.timeout))
        .target_epr(cli.epr.clone())
        .disable_ipv6()
        .disable_network_interface("docker0");

    let mut controller = Controller::new(discovery);

    let id = if let Some(address) = cli.address {
        controller.resolve(&address).await?
    } else {
        info!("Searching for provider `{}`...", cli.epr);
        controller.discover().await?;
        controller
            .devices()
            .find_by_epr(&cli.epr)
            .map(|(id, _)| id)
            .ok_or(ConsumerError::NotFound(cli.epr))?
    };

    let printer = match controller.start_report_receiver(id, cli.buffer).await {
        Ok(receiver) => Some(tokio::spawn(print_reports(receiver))),
        Err(e) => {
            warn!("Reports are not available: {e}");
            None
        }
    };

    let sender = controller.device(id)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", MenuAction::menu());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match MenuAction::from_input(&line) {
            Some(MenuAction::Exit) => break,
            Some(action) => run_action(&sender, action).await,
            None => {}
        }
    }

    info!("Shutting down");
    controller.shutdown().await;

    if let Some(printer) = printer
        && let Err(e) = printer.await
    {
        error!("Failed to await the report printer: {e}");
    }

    Ok(())
}
