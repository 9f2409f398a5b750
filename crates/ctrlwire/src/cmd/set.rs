use tracing::debug;

use crate::cmd::SetArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_notification, print_reply, OutputFormat};

pub fn run(args: SetArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.conn.client_config(args.reply.reply_timeout()?)?;
    let peer = args.conn.peer();
    let sink = peer.clone();
    let mut client = args
        .conn
        .connect(&config)?
        .with_notification_handler(move |msg| print_notification(msg, &sink, format));

    debug!(variable = %args.variable, value = %args.value, peer = %peer, "sending SET");
    let reply = client
        .set(&args.variable, &args.value)
        .map_err(|err| client_error("set failed", err))?;
    print_reply(&reply, &peer, format);

    client.close();
    Ok(SUCCESS)
}
