use tracing::{info, instrument};

use crate::api::PrepApi;
use crate::error::ClientError;
use crate::notify::{Notice, Notifier};
use crate::session::Session;
use crate::usage::UsageGate;

/// Redeem a promo code and pick up the new allowance.
#[instrument(skip_all)]
pub async fn redeem(
    api: &dyn PrepApi,
    notifier: &dyn Notifier,
    session: &Session,
    code: &str,
    usage: &mut UsageGate,
) -> Result<String, ClientError> {
    let code = code.trim();
    if code.is_empty() {
        let err = ClientError::MissingField("code");
        notifier.notify(Notice::Error(err.user_message()));
        return Err(err);
    }
    match api.redeem_promo(session, code).await {
        Ok(message) => {
            info!("promo code redeemed");
            notifier.notify(Notice::Success(message.clone()));
            usage.refresh(api, session).await;
            Ok(message)
        }
        Err(err) => {
            notifier.notify(Notice::Error(err.user_message()));
            Err(err)
        }
    }
}
