use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ctrlwire_client::ClientError;

use crate::cmd::{parse_duration, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_notification, OutputFormat};

/// How often the wait wakes up to check for Ctrl-C and the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let stop_at = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|limit| Instant::now() + limit);

    let config = args.conn.client_config(Some(POLL_INTERVAL))?;
    let peer = args.conn.peer();
    let mut client = args.conn.connect(&config)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        if stop_at.is_some_and(|stop_at| Instant::now() >= stop_at) {
            break;
        }

        let message = match client.recv_notification() {
            Ok(message) => message,
            Err(ClientError::Timeout(_)) => continue,
            Err(err) => return Err(client_error("watch failed", err)),
        };

        print_notification(&message, &peer, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    client.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
