//! SMTP email provider implementation.

use super::{EmailError, EmailProvider, InvitationEmailContent};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::MultiPart,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};

/// SMTP email provider.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    /// Create a new SMTP provider.
    pub fn new(
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    ) -> Result<Self, EmailError> {
        let mut builder = if use_tls {
            let tls_params = TlsParameters::new(host.clone()).map_err(|e| {
                EmailError::InvalidConfig(format!("TLS configuration error: {}", e))
            })?;

            // Port 465 uses implicit TLS (SMTPS), other ports use STARTTLS
            if port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
                    .map_err(|e| EmailError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(port)
                    .tls(Tls::Wrapper(tls_params))
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                    .map_err(|e| EmailError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(port)
                    .tls(Tls::Required(tls_params))
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host).port(port)
        };

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        let transport = builder.build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send_invitation(
        &self,
        to: &str,
        content: &InvitationEmailContent,
        from_address: &str,
        from_name: Option<&str>,
    ) -> Result<(), EmailError> {
        let from = match from_name {
            Some(name) => format!("{} <{}>", name, from_address),
            None => from_address.to_string(),
        };

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidConfig(format!("Invalid from: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| EmailError::SendFailed(format!("Invalid recipient: {}", e)))?)
            .subject(content.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                content.text.clone(),
                content.html.clone(),
            ))
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(())
    }
}
