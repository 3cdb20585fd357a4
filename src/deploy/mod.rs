// Registry deployment: the bootstrap step behind `allowlist deploy`.

use tracing::info;

use crate::chain::Address;
use crate::errors::Result;
use crate::gateway::TransactionGateway;
use crate::guard::NetworkGuard;
use crate::session::Connector;

/// Deploy a registry holding at most `capacity` members and wait until the
/// deployment is confirmed. Returns the registry address.
pub async fn deploy_registry(
    connector: &dyn Connector,
    guard: &NetworkGuard,
    gateway: &TransactionGateway,
    capacity: u64,
) -> Result<Address> {
    let context = connector.connect().await?;
    guard.check(context.provider().as_ref()).await?;
    let signer = context.signer()?;

    info!(capacity, deployer = %signer.account(), "Deploying registry");
    let address = gateway.deploy(&signer, capacity).await?;
    info!(%address, capacity, "Registry deployment confirmed");
    Ok(address)
}
