//! Create a subscriber and assign its MSISDN over one control connection.
//!
//! Run against the stub server (or a real HLR control port) with:
//!   cargo run --example query -- 127.0.0.1 4259 001010000000001 1234

use ctrlwire::client::connect;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(4259);
    let imsi = args
        .next()
        .unwrap_or_else(|| "001010000000001".to_string());
    let msisdn = args.next().unwrap_or_else(|| "1234".to_string());

    let mut client = connect(&host, port)?
        .with_notification_handler(|msg| eprintln!("Notification: {msg}"));
    eprintln!("Connected to {host}:{port}");

    let created = client.set("subscriber.create", &imsi)?;
    println!("{}", created.message);

    let variable = format!("subscriber.by-imsi-{imsi}.msisdn");
    let assigned = client.set(&variable, msisdn.trim_start_matches('+'))?;
    println!("{}", assigned.message);

    let readback = client.get(&variable)?;
    println!("{}", readback.message);

    client.close();
    Ok(())
}
