use tracing::debug;

use crate::cmd::GetArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_notification, print_reply, OutputFormat};

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.conn.client_config(args.reply.reply_timeout()?)?;
    let peer = args.conn.peer();
    let sink = peer.clone();
    let mut client = args
        .conn
        .connect(&config)?
        .with_notification_handler(move |msg| print_notification(msg, &sink, format));

    debug!(variable = %args.variable, peer = %peer, "sending GET");
    let reply = client
        .get(&args.variable)
        .map_err(|err| client_error("get failed", err))?;
    print_reply(&reply, &peer, format);

    client.close();
    Ok(SUCCESS)
}
