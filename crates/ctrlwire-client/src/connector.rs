use ctrlwire_transport::TcpSession;

use crate::client::CtrlClient;
use crate::config::ClientConfig;
use crate::error::Result;

/// Connect to a control endpoint with default configuration.
pub fn connect(host: &str, port: u16) -> Result<CtrlClient<TcpSession>> {
    connect_with_config(host, port, &ClientConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(
    host: &str,
    port: u16,
    config: &ClientConfig,
) -> Result<CtrlClient<TcpSession>> {
    let mut session = TcpSession::connect_timeout(host, port, config.connect_timeout)?;
    session.set_write_timeout(config.write_timeout)?;
    Ok(CtrlClient::new(session, config.clone()))
}
