use async_trait::async_trait;

/// Out-of-band delivery port for invite tokens. The raw token passes
/// through here exactly once and must never be persisted or logged.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invite(
        &self,
        recipient: Option<&str>,
        company_name: &str,
        raw_token: &str,
    ) -> anyhow::Result<()>;
}

/// Default mailer: records the delivery intent without the secret.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invite(
        &self,
        recipient: Option<&str>,
        company_name: &str,
        _raw_token: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(
            recipient = recipient.unwrap_or("<unbound>"),
            company = company_name,
            "invite issued; token delivered out of band"
        );
        Ok(())
    }
}
